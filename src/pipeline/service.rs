//! Worker Pool Implementation
//!
//! Requests are gated per learner on the exercise pointer, then pushed onto a
//! bounded queue drained by a fixed number of workers.
//!
//! ## Responsibilities
//! - **Single-flight**: the `Processing` pointer is set in the same atomic update
//!   that checks it, so concurrent requests for one learner queue one job.
//! - **Concurrency ceiling**: `max_concurrent` workers; enqueueing waits while
//!   the queue is full.
//! - **Publishing**: a finished job swaps its own `Processing` marker for
//!   `Ready`. A job whose marker was replaced by a newer request is dropped. A
//!   failed job leaves `Processing` in place to expire.

use super::types::{CreatedExercise, CreationJob, CreationRequest, JobId, PipelineStats};
use crate::clock::Clock;
use crate::config::PipelineConfig;
use crate::error::{AppError, AppResult};
use crate::exercise::ExerciseCache;
use crate::learner::types::ExercisePointer;
use crate::storage::Store;
use crate::vocabulary::WordScheduler;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Builds learners' next exercises in the background.
pub struct ExerciseCreationPipeline {
    store: Arc<Store>,
    clock: Arc<dyn Clock>,
    /// Picks the words each job practises.
    scheduler: Arc<WordScheduler>,
    /// Serves or generates the exercise for the picked words.
    cache: Arc<ExerciseCache>,
    config: PipelineConfig,
    /// Bounded to `max_concurrent` pending jobs.
    sender: mpsc::Sender<CreationJob>,
    /// Shared by all workers; whoever holds the lock waits for the next job.
    receiver: Arc<Mutex<mpsc::Receiver<CreationJob>>>,
    /// Counters reported by `stats()`.
    enqueued: AtomicU64,
    in_flight: AtomicUsize,
    completed: AtomicU64,
    failed: AtomicU64,
    superseded: AtomicU64,
}

impl ExerciseCreationPipeline {
    pub fn new(
        store: Arc<Store>,
        clock: Arc<dyn Clock>,
        scheduler: Arc<WordScheduler>,
        cache: Arc<ExerciseCache>,
        config: PipelineConfig,
    ) -> Arc<Self> {
        let (sender, receiver) = mpsc::channel(config.max_concurrent.max(1));
        Arc::new(Self {
            store,
            clock,
            scheduler,
            cache,
            config,
            sender,
            receiver: Arc::new(Mutex::new(receiver)),
            enqueued: AtomicU64::new(0),
            in_flight: AtomicUsize::new(0),
            completed: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            superseded: AtomicU64::new(0),
        })
    }

    fn timeout_ms(&self) -> u64 {
        self.config.processing_timeout().as_millis() as u64
    }

    /// Queues a job to build the learner's next exercise, unless one is
    /// already in progress and has not timed out.
    pub async fn create_new_exercise(&self, learner_id: &str) -> AppResult<CreationRequest> {
        let now = self.clock.now_ms();
        let timeout_ms = self.timeout_ms();

        let running_since = self
            .store
            .learners
            .update(learner_id, |learner| -> AppResult<Option<u64>> {
                if let ExercisePointer::Processing { since_ms } = learner.exercise
                    && now.saturating_sub(since_ms) < timeout_ms
                {
                    return Ok(Some(since_ms));
                }
                learner.exercise = ExercisePointer::Processing { since_ms: now };
                Ok(None)
            })
            .map_err(|e| e.store_miss_as("learner", learner_id))?;

        if let Some(since_ms) = running_since {
            tracing::debug!(
                "Exercise for {} already processing since {}, request coalesced",
                learner_id,
                since_ms
            );
            return Ok(CreationRequest::AlreadyProcessing { since_ms });
        }

        let job = CreationJob {
            id: JobId::new(),
            learner_id: learner_id.to_string(),
            requested_at_ms: now,
        };
        let job_id = job.id.clone();

        if self.sender.send(job).await.is_err() {
            tracing::warn!("Creation queue closed, dropping request for {}", learner_id);
            return Err(AppError::ShuttingDown);
        }

        self.enqueued.fetch_add(1, Ordering::SeqCst);
        tracing::info!("Queued exercise job {} for {}", job_id.0, learner_id);
        Ok(CreationRequest::Enqueued { job_id })
    }

    /// Reports the state of the learner's most recently requested exercise.
    pub fn get_created_exercise(&self, learner_id: &str) -> AppResult<CreatedExercise> {
        let learner = self
            .store
            .learners
            .get(learner_id)
            .ok_or_else(|| AppError::not_found("learner", learner_id))?;

        match learner.exercise {
            ExercisePointer::Empty => Ok(CreatedExercise::NotRequested),
            ExercisePointer::Processing { since_ms } => {
                if self.clock.now_ms().saturating_sub(since_ms) >= self.timeout_ms() {
                    Ok(CreatedExercise::Expired { since_ms })
                } else {
                    Ok(CreatedExercise::Processing { since_ms })
                }
            }
            ExercisePointer::Ready {
                exercise_id,
                answered_at_ms,
                ..
            } => match self.store.exercises.get(&exercise_id) {
                Some(exercise) => Ok(CreatedExercise::Ready {
                    exercise,
                    answered: answered_at_ms.is_some(),
                }),
                None => {
                    tracing::error!(
                        "Learner {} points at missing exercise {}",
                        learner_id,
                        exercise_id
                    );
                    Err(AppError::BrokenPointer {
                        learner_id: learner_id.to_string(),
                        exercise_id,
                    })
                }
            },
        }
    }

    /// Spawns the workers and returns their handles.
    pub fn start(self: &Arc<Self>, token: CancellationToken) -> Vec<JoinHandle<()>> {
        let worker_count = self.config.max_concurrent.max(1);
        tracing::info!("Starting {} exercise workers", worker_count);

        (0..worker_count)
            .map(|worker_id| {
                let pipeline = self.clone();
                let token = token.clone();
                tokio::spawn(async move {
                    pipeline.worker_loop(worker_id, token).await;
                })
            })
            .collect()
    }

    async fn worker_loop(&self, worker_id: usize, token: CancellationToken) {
        tracing::debug!("Exercise worker {} started", worker_id);

        loop {
            let job = {
                let mut receiver = self.receiver.lock().await;
                tokio::select! {
                    _ = token.cancelled() => None,
                    job = receiver.recv() => job,
                }
            };
            let Some(job) = job else {
                break;
            };

            self.in_flight.fetch_add(1, Ordering::SeqCst);
            let result = self.run_job(&job).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            match result {
                Ok(None) => {
                    self.superseded.fetch_add(1, Ordering::SeqCst);
                    tracing::info!(
                        "Worker {} dropped late job {} for {}: a newer request owns the pointer",
                        worker_id,
                        job.id.0,
                        job.learner_id
                    );
                }
                Ok(Some(exercise_id)) => {
                    self.completed.fetch_add(1, Ordering::SeqCst);
                    tracing::info!(
                        "Worker {} finished job {}: learner {} -> exercise {}",
                        worker_id,
                        job.id.0,
                        job.learner_id,
                        exercise_id
                    );
                }
                Err(e) => {
                    self.failed.fetch_add(1, Ordering::SeqCst);
                    tracing::warn!(
                        "Worker {} failed job {} for {}: {} (left to expire)",
                        worker_id,
                        job.id.0,
                        job.learner_id,
                        e
                    );
                }
            }
        }

        tracing::debug!("Exercise worker {} stopped", worker_id);
    }

    async fn run_job(&self, job: &CreationJob) -> AppResult<Option<String>> {
        let word_count = if rand::random::<bool>() { 2 } else { 1 };

        let mut words = Vec::with_capacity(word_count);
        for _ in 0..word_count {
            words.push(self.scheduler.get_next_word(&job.learner_id)?);
        }

        // Unlocking may have moved the learner up a level.
        let learner = self
            .store
            .learners
            .get(&job.learner_id)
            .ok_or_else(|| AppError::not_found("learner", &job.learner_id))?;
        let language = learner.learning_language;
        let level = learner.current_level(language).ok_or_else(|| {
            AppError::not_found("language progress", format!("{}/{}", job.learner_id, language))
        })?;

        let exercise = self.cache.resolve(&words, language, level).await?;

        // Only the job that set the current Processing marker may publish; a
        // late job must not replace a newer or already answered exercise.
        let expected = ExercisePointer::Processing {
            since_ms: job.requested_at_ms,
        };
        let created_at_ms = self.clock.now_ms();
        let published = self
            .store
            .learners
            .update(&job.learner_id, |learner| -> AppResult<bool> {
                if learner.exercise != expected {
                    return Ok(false);
                }
                learner.exercise = ExercisePointer::Ready {
                    exercise_id: exercise.id.clone(),
                    created_at_ms,
                    answered_at_ms: None,
                };
                Ok(true)
            })
            .map_err(|e| e.store_miss_as("learner", &job.learner_id))?;

        Ok(published.then_some(exercise.id))
    }

    pub fn stats(&self) -> PipelineStats {
        PipelineStats {
            enqueued: self.enqueued.load(Ordering::SeqCst),
            in_flight: self.in_flight.load(Ordering::SeqCst),
            completed: self.completed.load(Ordering::SeqCst),
            failed: self.failed.load(Ordering::SeqCst),
            superseded: self.superseded.load(Ordering::SeqCst),
            queued: self.sender.max_capacity() - self.sender.capacity(),
        }
    }
}
