use crate::exercise::types::ExerciseFields;
use crate::language::Language;
use crate::vocabulary::types::Level;

use serde::{Deserialize, Serialize};

/// Everything the generator needs to write one exercise.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExerciseRequest {
    /// One value per blank, in blank order.
    pub word_values: Vec<String>,
    pub language: Language,
    pub level: Level,
    /// Existing variants under the same key, for tone and format.
    #[serde(default)]
    pub style_examples: Vec<ExerciseFields>,
}

/// Exercise exactly as the generator returns it. Nothing here is trusted until
/// it passes `exercise::validation::validate_generated`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneratedExercise {
    #[serde(default)]
    pub word_values: Vec<String>,
    #[serde(default)]
    pub initial_strings: Vec<String>,
    #[serde(default)]
    pub middle_strings: Vec<String>,
    #[serde(default)]
    pub final_strings: Vec<String>,
    /// Integer index, option letter, or list of option letters.
    #[serde(default)]
    pub criteria: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WordLevelRequest {
    pub word: String,
    pub language: Language,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WordLevelResponse {
    pub level: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewWordRequest {
    pub language: Language,
    pub existing_vocabulary: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewWordResponse {
    pub word: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapRequest {
    pub language: Language,
}
