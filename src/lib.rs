//! Vocabulary Trainer Core Library
//!
//! This library crate defines the modules behind the replica binary (`main.rs`).
//! Every replica runs the same code against a shared document store; one of
//! them is elected to run background maintenance.
//!
//! ## Architecture Modules
//!
//! - **`vocabulary`**: Word scheduling. Decides which word a learner practises
//!   next and when locked words are unlocked or the learner levels up.
//! - **`exercise`**: The per-word-set cache of generated exercise variants,
//!   quality-driven eviction, thumb votes and generator output validation.
//! - **`pipeline`**: Bounded background creation of a learner's next exercise,
//!   coalescing duplicate requests.
//! - **`answer`**: Scores answers against the exercise actually issued and
//!   records practice history.
//! - **`coordinator`**: Heartbeats and deterministic leader election among
//!   replicas.
//! - **`maintenance`**: Leader-only vocabulary population, level revision and
//!   new-word minting.
//! - **`generator`**: The seam to the external content generator.
//! - **`learner`**: Learner documents and their lifecycle.
//! - **`storage`**: The versioned document store the rest runs against.
//! - **`api`**: HTTP surface over the services.

pub mod answer;
pub mod api;
pub mod clock;
pub mod config;
pub mod context;
pub mod coordinator;
pub mod error;
pub mod exercise;
pub mod generator;
pub mod language;
pub mod learner;
pub mod maintenance;
pub mod pipeline;
pub mod storage;
pub mod vocabulary;
