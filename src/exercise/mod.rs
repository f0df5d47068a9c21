//! Exercise Module
//!
//! Generated exercises, the bounded per-key variant cache, and the thumb votes
//! that drive cache quality.
//!
//! ## Core Mechanisms
//! - **Variant sets**: Exercises are cached per (blank count, language, level,
//!   word set). A set fills up to the configured capacity; after that, requests
//!   are served from it.
//! - **Self-pruning**: Once full, each resolution may evict the single worst
//!   variant if enough learners disliked it. Variants with too few votes are
//!   treated as good.
//! - **Validation**: Generator output is shape-checked and its answer key
//!   normalised to an option index before anything is stored.

pub mod cache;
pub mod types;
pub mod validation;
pub mod votes;

pub use cache::ExerciseCache;
pub use types::{Exercise, ExerciseFields, ExerciseVariantSet, VariantKey, VoteOutcome, VoteTally};
pub use votes::VoteService;
