use crate::exercise::types::Exercise;

use serde::{Deserialize, Serialize};

/// Unique identifier for one creation job.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct JobId(pub String);

impl JobId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

/// A queued request to build a learner's next exercise.
#[derive(Debug, Clone)]
pub struct CreationJob {
    pub id: JobId,
    pub learner_id: String,
    pub requested_at_ms: u64,
}

/// Answer to `create_new_exercise`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CreationRequest {
    Enqueued { job_id: JobId },
    /// A job for this learner is already running; nothing was queued.
    AlreadyProcessing { since_ms: u64 },
}

/// Answer to `get_created_exercise`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreatedExercise {
    NotRequested,
    Processing { since_ms: u64 },
    /// The job never finished; a new request will be accepted.
    Expired { since_ms: u64 },
    Ready { exercise: Exercise, answered: bool },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineStats {
    pub enqueued: u64,
    pub in_flight: usize,
    pub completed: u64,
    pub failed: u64,
    /// Jobs that finished after a newer request took over the pointer.
    pub superseded: u64,
    pub queued: usize,
}
