use serde::{Deserialize, Serialize};

/// Why an answer was not scored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// Not the exercise currently issued to the learner.
    Mismatch,
    /// The issued exercise was already answered.
    AlreadyAnswered,
    MalformedExerciseId,
    MalformedAnswer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AnswerStatus {
    Accepted,
    Rejected { reason: RejectReason },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerOutcome {
    #[serde(flatten)]
    pub status: AnswerStatus,
    pub message: String,
    pub correct: bool,
    /// Revealed once the answer is scored.
    pub correct_option: Option<String>,
    pub xp_awarded: u64,
}

impl AnswerOutcome {
    pub fn rejected(reason: RejectReason, message: impl Into<String>) -> Self {
        Self {
            status: AnswerStatus::Rejected { reason },
            message: message.into(),
            correct: false,
            correct_option: None,
            xp_awarded: 0,
        }
    }

    pub fn is_accepted(&self) -> bool {
        self.status == AnswerStatus::Accepted
    }

    pub fn reject_reason(&self) -> Option<RejectReason> {
        match self.status {
            AnswerStatus::Accepted => None,
            AnswerStatus::Rejected { reason } => Some(reason),
        }
    }
}
