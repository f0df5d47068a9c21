//! HTTP Protocol
//!
//! Endpoints and Data Transfer Objects for the learner-facing surface.
//! Documents that hold something the learner must not see (the correct
//! option) get their own view type here instead of being serialized as stored.

use crate::coordinator::ReplicaStatus;
use crate::exercise::Exercise;
use crate::language::Language;
use crate::pipeline::{CreatedExercise, PipelineStats};
use crate::vocabulary::Level;

use serde::{Deserialize, Serialize};

// --- API Endpoints ---

pub const ENDPOINT_LANGUAGES: &str = "/languages";
pub const ENDPOINT_LEARNERS: &str = "/learners";
pub const ENDPOINT_LEARNER: &str = "/learners/:learner_id";
pub const ENDPOINT_LEARNING_LANGUAGE: &str = "/learners/:learner_id/language";
pub const ENDPOINT_UI_LANGUAGE: &str = "/learners/:learner_id/ui_language";
pub const ENDPOINT_NEXT_WORD: &str = "/learners/:learner_id/next_word";
pub const ENDPOINT_UNLOCK: &str = "/learners/:learner_id/unlock";
pub const ENDPOINT_WORDS: &str = "/learners/:learner_id/words";
pub const ENDPOINT_EXERCISE: &str = "/learners/:learner_id/exercise";
pub const ENDPOINT_ANSWER: &str = "/learners/:learner_id/answer";
pub const ENDPOINT_VOTE: &str = "/learners/:learner_id/vote";
pub const ENDPOINT_REPLICA_STATUS: &str = "/replica/status";

// --- Data Transfer Objects ---

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateLearnerRequest {
    pub learner_id: String,
    pub language: Language,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SetLanguageRequest {
    pub language: Language,
}

/// Query for `GET /learners/:id/words`. Defaults to the learner's current
/// language and to unlocked words.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct WordsQuery {
    pub language: Option<Language>,
    #[serde(default)]
    pub locked: bool,
}

/// Clients send either an option number or a letter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerInput {
    Index(u64),
    Text(String),
}

impl AnswerInput {
    pub fn as_text(&self) -> String {
        match self {
            AnswerInput::Index(i) => i.to_string(),
            AnswerInput::Text(s) => s.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AnswerRequest {
    pub exercise_id: String,
    pub answer: AnswerInput,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VoteRequest {
    pub exercise_id: String,
    pub is_positive: bool,
}

/// An exercise as shown to the learner: no correct index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExerciseView {
    pub id: String,
    pub word_values: Vec<String>,
    pub language: Language,
    pub level: Level,
    pub lead_in: String,
    pub instruction: String,
    pub options: Vec<String>,
    pub created_at_ms: u64,
}

impl From<Exercise> for ExerciseView {
    fn from(exercise: Exercise) -> Self {
        Self {
            id: exercise.id,
            word_values: exercise.word_values,
            language: exercise.language,
            level: exercise.level,
            lead_in: exercise.content.lead_in,
            instruction: exercise.content.instruction,
            options: exercise.content.options,
            created_at_ms: exercise.created_at_ms,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExercisePollResponse {
    NotRequested,
    Processing { since_ms: u64 },
    Expired { since_ms: u64 },
    Ready { exercise: ExerciseView, answered: bool },
}

impl From<CreatedExercise> for ExercisePollResponse {
    fn from(created: CreatedExercise) -> Self {
        match created {
            CreatedExercise::NotRequested => Self::NotRequested,
            CreatedExercise::Processing { since_ms } => Self::Processing { since_ms },
            CreatedExercise::Expired { since_ms } => Self::Expired { since_ms },
            CreatedExercise::Ready { exercise, answered } => Self::Ready {
                exercise: exercise.into(),
                answered,
            },
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReplicaStatusResponse {
    #[serde(flatten)]
    pub replica: ReplicaStatus,
    pub pipeline: PipelineStats,
}

/// Body of every non-2xx response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
