//! Vocabulary Maintenance Module
//!
//! Periodic upkeep of the shared vocabulary, run only by the elected leader.
//! Every step is safe to repeat: word ids are derived from the word itself, so
//! a pass interrupted by a leadership change can simply run again elsewhere.
//!
//! ## Steps per language
//! - **Initial population**: once, load the generator's starter vocabulary.
//! - **Level revision**: re-estimate the level of the least recently revised
//!   words, at most once per revision interval.
//! - **Minting**: ask for a few words the language does not have yet.

pub mod runner;
pub mod types;

pub use runner::MaintenanceRunner;
pub use types::{MaintenanceReport, MaintenanceState};

#[cfg(test)]
mod tests;
