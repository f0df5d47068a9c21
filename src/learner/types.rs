use crate::language::Language;
use crate::vocabulary::types::Level;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageProgress {
    pub current_level: Level,
}

impl Default for LanguageProgress {
    fn default() -> Self {
        Self {
            current_level: Level::A1,
        }
    }
}

/// Where the learner's next exercise stands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ExercisePointer {
    /// Nothing was ever requested.
    #[default]
    Empty,
    /// A background job is building the exercise.
    Processing { since_ms: u64 },
    /// The exercise was issued to the learner.
    Ready {
        exercise_id: String,
        created_at_ms: u64,
        #[serde(default)]
        answered_at_ms: Option<u64>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Learner {
    pub id: String,
    pub xp: u64,
    #[serde(default)]
    pub is_subscribed: bool,
    pub progress: BTreeMap<Language, LanguageProgress>,
    pub learning_language: Language,
    /// Language the app's own text is shown in. Starts as the first
    /// language learned.
    pub ui_language: Language,
    #[serde(default)]
    pub exercise: ExercisePointer,
    pub created_at_ms: u64,
}

impl Learner {
    pub fn new(id: &str, language: Language, now_ms: u64) -> Self {
        let mut progress = BTreeMap::new();
        progress.insert(language, LanguageProgress::default());
        Self {
            id: id.to_string(),
            xp: 0,
            is_subscribed: false,
            progress,
            learning_language: language,
            ui_language: language,
            exercise: ExercisePointer::Empty,
            created_at_ms: now_ms,
        }
    }

    pub fn current_level(&self, language: Language) -> Option<Level> {
        self.progress.get(&language).map(|p| p.current_level)
    }
}
