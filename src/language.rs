//! Languages the product can teach.
//!
//! A closed set: anything outside it is rejected at the boundary with a
//! `Validation` error. Which of these are actually offered is decided by
//! `learning.supported_languages` and checked at startup.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Es,
    En,
    Fr,
    De,
    It,
    Pt,
    Ru,
}

impl Language {
    pub const ALL: [Language; 7] = [
        Language::Es,
        Language::En,
        Language::Fr,
        Language::De,
        Language::It,
        Language::Pt,
        Language::Ru,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            Language::Es => "es",
            Language::En => "en",
            Language::Fr => "fr",
            Language::De => "de",
            Language::It => "it",
            Language::Pt => "pt",
            Language::Ru => "ru",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Language::Es => "Spanish",
            Language::En => "English",
            Language::Fr => "French",
            Language::De => "German",
            Language::It => "Italian",
            Language::Pt => "Portuguese",
            Language::Ru => "Russian",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim().to_ascii_lowercase();
        Language::ALL
            .into_iter()
            .find(|lang| lang.code() == code)
            .ok_or_else(|| AppError::validation(format!("unsupported language: {s:?}")))
    }
}
