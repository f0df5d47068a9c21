//! Answer Validation Module
//!
//! Scores a learner's answer against the exercise that was actually issued to
//! them. A stale or replayed submission is rejected with its own reason, so a
//! client can tell "you answered the wrong exercise" apart from "wrong answer".
//! Accepted answers append to the practice history the scheduler reads.

pub mod types;
pub mod validator;

pub use types::{AnswerOutcome, AnswerStatus, RejectReason};
pub use validator::AnswerValidator;
