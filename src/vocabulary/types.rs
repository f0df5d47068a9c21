use crate::error::AppError;
use crate::language::Language;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::fmt;

/// Coarse difficulty tier shared by learners and words.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Level {
    A1,
    A2,
    B1,
}

impl Level {
    pub const MAX: Level = Level::B1;
    pub const ALL: [Level; 3] = [Level::A1, Level::A2, Level::B1];

    pub fn index(self) -> u8 {
        match self {
            Level::A1 => 0,
            Level::A2 => 1,
            Level::B1 => 2,
        }
    }

    pub fn next(self) -> Option<Level> {
        match self {
            Level::A1 => Some(Level::A2),
            Level::A2 => Some(Level::B1),
            Level::B1 => None,
        }
    }

    /// Accepts both the numeric tier (`"1"`) and the CEFR label (`"A2"`).
    pub fn from_label(label: &str) -> Option<Level> {
        match label.trim().to_ascii_uppercase().as_str() {
            "0" | "A1" => Some(Level::A1),
            "1" | "A2" => Some(Level::A2),
            "2" | "B1" => Some(Level::B1),
            _ => None,
        }
    }
}

impl TryFrom<u8> for Level {
    type Error = AppError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Level::A1),
            1 => Ok(Level::A2),
            2 => Ok(Level::B1),
            other => Err(AppError::validation(format!("unsupported level: {other}"))),
        }
    }
}

impl TryFrom<i64> for Level {
    type Error = AppError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        u8::try_from(value)
            .map_err(|_| AppError::validation(format!("unsupported level: {value}")))
            .and_then(Level::try_from)
    }
}

impl From<Level> for u8 {
    fn from(level: Level) -> Self {
        level.index()
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Level::A1 => "A1",
            Level::A2 => "A2",
            Level::B1 => "B1",
        };
        f.write_str(label)
    }
}

/// A word of the shared vocabulary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VocabularyWord {
    pub id: String,
    pub value: String,
    pub language: Language,
    pub level: Level,
    #[serde(default)]
    pub translations: BTreeMap<String, String>,
    pub created_at_ms: u64,
    /// Last time maintenance re-estimated the level.
    #[serde(default)]
    pub level_revised_at_ms: Option<u64>,
}

impl VocabularyWord {
    pub fn new(language: Language, value: &str, level: Level, now_ms: u64) -> Self {
        let value = value.trim().to_string();
        Self {
            id: word_id_for(language, &value),
            value,
            language,
            level,
            translations: BTreeMap::new(),
            created_at_ms: now_ms,
            level_revised_at_ms: None,
        }
    }
}

/// Deterministic id so the same word minted twice lands on the same document.
pub fn word_id_for(language: Language, value: &str) -> String {
    let name = format!("{}:{}", language.code(), value.trim().to_lowercase());
    uuid::Uuid::new_v5(&uuid::Uuid::NAMESPACE_OID, name.as_bytes()).to_string()
}

pub fn learner_word_key(learner_id: &str, word_id: &str) -> String {
    format!("{learner_id}:{word_id}")
}

/// A word assigned to one learner, with its practice history.
///
/// `last_visited_times` and `last_scores` are parallel: entry `i` of one belongs
/// to entry `i` of the other. Only `record_practice` appends to them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearnerWord {
    pub learner_id: String,
    pub word_id: String,
    pub language: Language,
    pub assigned_at_ms: u64,
    pub is_locked: bool,
    #[serde(default)]
    pub unlocked_at_ms: Option<u64>,
    #[serde(default)]
    pub last_visited_times: VecDeque<u64>,
    #[serde(default)]
    pub last_scores: VecDeque<u8>,
}

impl LearnerWord {
    pub fn new_locked(learner_id: &str, word_id: &str, language: Language, now_ms: u64) -> Self {
        Self {
            learner_id: learner_id.to_string(),
            word_id: word_id.to_string(),
            language,
            assigned_at_ms: now_ms,
            is_locked: true,
            unlocked_at_ms: None,
            last_visited_times: VecDeque::new(),
            last_scores: VecDeque::new(),
        }
    }

    pub fn key(&self) -> String {
        learner_word_key(&self.learner_id, &self.word_id)
    }

    pub fn latest_score(&self) -> Option<u8> {
        self.last_scores.back().copied()
    }

    pub fn latest_visit_ms(&self) -> Option<u64> {
        self.last_visited_times.back().copied()
    }

    /// Appends one practice result, dropping the oldest beyond `capacity`.
    pub fn record_practice(&mut self, now_ms: u64, score: u8, capacity: usize) {
        self.last_visited_times.push_back(now_ms);
        self.last_scores.push_back(score);
        while self.last_scores.len() > capacity {
            self.last_scores.pop_front();
            self.last_visited_times.pop_front();
        }
    }

    /// Returns false if the word was already unlocked.
    pub fn unlock(&mut self, now_ms: u64) -> bool {
        if !self.is_locked {
            return false;
        }
        self.is_locked = false;
        self.unlocked_at_ms = Some(now_ms);
        true
    }
}

/// Outcome of one pass of the unlock state machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UnlockStatus {
    /// The learner is at the top level; no more words are assigned.
    MaxLevel,
    LevelUp { from: Level, to: Level },
    FirstUnlock { word_id: String },
    SupportUnlock { word_id: String },
    NoChange,
}

/// What `select_next_word` needs to know about one unlocked word.
#[derive(Debug, Clone, PartialEq)]
pub struct WordCandidate {
    pub word_id: String,
    /// Most recent score in `[0, 1]`.
    pub last_score: Option<f64>,
    pub last_visited_ms: Option<u64>,
}

impl From<&LearnerWord> for WordCandidate {
    fn from(word: &LearnerWord) -> Self {
        Self {
            word_id: word.word_id.clone(),
            last_score: word.latest_score().map(f64::from),
            last_visited_ms: word.latest_visit_ms(),
        }
    }
}

/// A learner word joined with its vocabulary entry, as listed to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearnerWordView {
    pub word_id: String,
    pub value: String,
    pub level: Level,
    pub is_locked: bool,
    pub last_visited_times: Vec<u64>,
    pub last_scores: Vec<u8>,
}
