use crate::language::Language;
use crate::vocabulary::types::Level;

use serde::{Deserialize, Serialize};
use std::fmt;

/// The learner-facing part of an exercise, already validated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExerciseFields {
    /// Sentence with one `___` blank per target word.
    pub lead_in: String,
    pub instruction: String,
    /// Options as generated, letter prefix included (`"a) vamos"`).
    pub options: Vec<String>,
    /// Zero-based index into `options`.
    pub correct_index: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exercise {
    pub id: String,
    /// One entry per blank; the same word may appear twice.
    pub word_ids: Vec<String>,
    pub word_values: Vec<String>,
    pub language: Language,
    pub level: Level,
    pub variant_key: String,
    #[serde(flatten)]
    pub content: ExerciseFields,
    pub created_at_ms: u64,
}

impl Exercise {
    pub fn correct_option(&self) -> Option<&str> {
        self.content
            .options
            .get(self.content.correct_index)
            .map(String::as_str)
    }

    pub fn blank_count(&self) -> usize {
        self.word_ids.len()
    }
}

/// Identity of a variant set: blank count, language, level and the word ids
/// sorted case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VariantKey(String);

impl VariantKey {
    pub fn new(word_ids: &[String], language: Language, level: Level) -> Self {
        let mut ids: Vec<&str> = word_ids.iter().map(String::as_str).collect();
        ids.sort_by_key(|id| id.to_lowercase());
        VariantKey(format!(
            "{}:{}:{}:{}",
            word_ids.len(),
            language.code(),
            level.index(),
            ids.join(",")
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VariantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ordered ids of the alternative exercises cached under one key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExerciseVariantSet {
    pub key: String,
    pub exercise_ids: Vec<String>,
}

impl ExerciseVariantSet {
    pub fn empty(key: &VariantKey) -> Self {
        Self {
            key: key.to_string(),
            exercise_ids: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThumbVote {
    pub learner_id: String,
    pub exercise_id: String,
    pub is_positive: bool,
    pub voted_at_ms: u64,
}

pub fn vote_key(learner_id: &str, exercise_id: &str) -> String {
    format!("{learner_id}:{exercise_id}")
}

/// Aggregated thumbs for one exercise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VoteTally {
    pub up: u64,
    pub down: u64,
}

impl VoteTally {
    pub fn volume(&self) -> u64 {
        self.up + self.down
    }

    /// Share of positive votes, or a neutral 1.0 until `min_volume` votes
    /// have been cast so new variants are not evicted on a few early votes.
    pub fn quality(&self, min_volume: u64) -> f64 {
        let volume = self.volume();
        if volume == 0 || volume < min_volume {
            return 1.0;
        }
        self.up as f64 / volume as f64
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum VoteOutcome {
    Recorded { tally: VoteTally },
    AlreadyVoted,
}
