//! Exercise Creation Pipeline Module
//!
//! Pre-builds a learner's next exercise in the background so the request that
//! asks for it never waits on content generation.
//!
//! ## Flow
//! 1. **Request**: `create_new_exercise` flips the learner's pointer to
//!    `Processing` (unless a fresh job is already running) and queues a job.
//! 2. **Work**: a worker picks one or two words through the scheduler and
//!    resolves an exercise for them through the cache.
//! 3. **Publish**: the pointer becomes `Ready` with the exercise id.
//! 4. **Poll**: `get_created_exercise` reports the pointer, including jobs that
//!    exceeded the processing timeout.

pub mod service;
pub mod types;

pub use service::ExerciseCreationPipeline;
pub use types::{CreatedExercise, CreationRequest, JobId, PipelineStats};

#[cfg(test)]
mod tests;
