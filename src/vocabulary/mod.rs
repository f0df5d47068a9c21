//! Vocabulary & Word Scheduling Module
//!
//! Decides which word a learner practises next and when new words become
//! eligible for practice.
//!
//! ## Core Mechanisms
//! - **Progression**: Each (learner, language) walks levels 0 -> 1 -> 2. Words
//!   are assigned locked and unlocked one at a time; a level is finished once
//!   every word of it has been assigned and unlocked.
//! - **Selection**: Among unlocked words, the one with the weakest recent score
//!   and the longest time since its last visit wins, with a little Gaussian noise
//!   so one word cannot monopolise every session.
//! - **History**: Each learner word keeps bounded, parallel buffers of visit
//!   times and scores; the oldest entry falls off on overflow.

pub mod scheduler;
pub mod types;

pub use scheduler::{WordScheduler, select_next_word};
pub use types::{Level, LearnerWord, UnlockStatus, VocabularyWord, WordCandidate};
