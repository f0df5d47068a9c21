//! Error taxonomy shared by every subsystem.
//!
//! Failures are values: callers match on the variant to decide what the
//! learner sees. `NotFound` and `Validation` never mutate state, and
//! `Generation` is only surfaced after the bounded retry budget is spent.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("{collection}/{key} not found")]
    NotFound {
        collection: &'static str,
        key: String,
    },

    #[error("{collection}/{key} already exists")]
    AlreadyExists {
        collection: &'static str,
        key: String,
    },

    #[error("{collection}/{key} kept changing underneath us ({attempts} attempts)")]
    VersionConflict {
        collection: &'static str,
        key: String,
        attempts: usize,
    },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AppError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("invalid input: {0}")]
    Validation(String),

    #[error("content generation failed: {0}")]
    Generation(String),

    #[error("no word available for practice")]
    NoWordAvailable,

    #[error("learner {learner_id} points at missing exercise {exercise_id}")]
    BrokenPointer {
        learner_id: String,
        exercise_id: String,
    },

    #[error("service is shutting down")]
    ShuttingDown,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AppError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Turns a store-level miss into a domain `NotFound` for `entity`.
    pub fn store_miss_as(self, entity: &'static str, id: &str) -> Self {
        match self {
            AppError::Store(StoreError::NotFound { .. }) => Self::not_found(entity, id),
            other => other,
        }
    }
}

pub type AppResult<T> = std::result::Result<T, AppError>;
