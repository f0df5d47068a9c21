use crate::language::Language;

use serde::{Deserialize, Serialize};

/// Per-language settings flags, keyed by language code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaintenanceState {
    pub language: Language,
    #[serde(default)]
    pub vocabulary_populated: bool,
    #[serde(default)]
    pub last_revision_ms: Option<u64>,
}

impl MaintenanceState {
    pub fn new(language: Language) -> Self {
        Self {
            language,
            vocabulary_populated: false,
            last_revision_ms: None,
        }
    }
}

/// What one maintenance pass did for one language.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaintenanceReport {
    pub language: Option<Language>,
    /// Words inserted by the initial population.
    pub populated: usize,
    /// The initial population was attempted and failed; it runs again next pass.
    pub population_failed: bool,
    /// Words whose level was re-estimated.
    pub revised: usize,
    /// Revised words whose level actually changed.
    pub relevelled: usize,
    pub minted: usize,
    /// The revision interval had not elapsed yet.
    pub revision_skipped: bool,
}

impl MaintenanceReport {
    pub fn new(language: Language) -> Self {
        Self {
            language: Some(language),
            ..Self::default()
        }
    }
}
