//! Content Generator Module
//!
//! The seam to whatever writes exercises and vocabulary. The core only depends
//! on [`ContentGenerator`]; every answer it gives may be wrong or malformed and
//! is validated by the caller before use.
//!
//! ## Implementations
//! - [`HttpContentGenerator`]: JSON over HTTP to an external generation service.
//! - [`DisabledContentGenerator`]: used when no service is configured. Cached
//!   exercises keep being served; anything that needs new content fails.

pub mod http;
pub mod types;

#[cfg(test)]
pub mod fake;

pub use http::HttpContentGenerator;
pub use types::{ExerciseRequest, GeneratedExercise};

use crate::language::Language;

use anyhow::{Result, bail};
use async_trait::async_trait;
use std::collections::HashMap;

#[async_trait]
pub trait ContentGenerator: Send + Sync {
    async fn generate_exercise(&self, request: &ExerciseRequest) -> Result<GeneratedExercise>;

    /// Raw level guess; callers map it onto `Level` and reject out-of-range values.
    async fn estimate_word_level(&self, word: &str, language: Language) -> Result<i64>;

    async fn suggest_new_word(&self, language: Language, existing: &[String]) -> Result<String>;

    /// Starter words keyed by level label (`"A1"` or `"0"` style).
    async fn bootstrap_vocabulary(&self, language: Language) -> Result<HashMap<String, Vec<String>>>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledContentGenerator;

#[async_trait]
impl ContentGenerator for DisabledContentGenerator {
    async fn generate_exercise(&self, _request: &ExerciseRequest) -> Result<GeneratedExercise> {
        bail!("no content generator configured")
    }

    async fn estimate_word_level(&self, _word: &str, _language: Language) -> Result<i64> {
        bail!("no content generator configured")
    }

    async fn suggest_new_word(&self, _language: Language, _existing: &[String]) -> Result<String> {
        bail!("no content generator configured")
    }

    async fn bootstrap_vocabulary(&self, _language: Language) -> Result<HashMap<String, Vec<String>>> {
        bail!("no content generator configured")
    }
}
