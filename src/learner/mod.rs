//! Learner Module
//!
//! Learner documents and their lifecycle: creation on first visit, switching the
//! language being learned, and the experience-point counter.
//!
//! The exercise pointer on the learner is a tagged state rather than an id
//! field with a magic value, so "being created" can never be mistaken for a
//! real exercise id.

pub mod service;
pub mod types;

pub use service::LearnerService;
pub use types::{ExercisePointer, LanguageProgress, Learner};
