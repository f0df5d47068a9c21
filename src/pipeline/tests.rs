//! Pipeline Module Tests
//!
//! ## Test Scopes
//! - **Single-flight**: repeated requests within the timeout queue one job.
//! - **Expiry**: stuck jobs are reported as expired and become retryable.
//! - **Workers**: a job publishes a ready exercise; a late job never replaces
//!   a newer one; a failing job leaves the pointer to expire.
//! - **Polling**: empty pointers, broken pointers, unknown learners.

#[cfg(test)]
mod tests {
    use crate::clock::ManualClock;
    use crate::config::{CacheConfig, PipelineConfig, SchedulerConfig};
    use crate::error::AppError;
    use crate::exercise::ExerciseCache;
    use crate::generator::fake::FakeContentGenerator;
    use crate::language::Language;
    use crate::learner::types::{ExercisePointer, Learner};
    use crate::pipeline::service::ExerciseCreationPipeline;
    use crate::pipeline::types::{CreatedExercise, CreationRequest};
    use crate::storage::Store;
    use crate::vocabulary::WordScheduler;
    use crate::vocabulary::types::{Level, VocabularyWord};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    struct Fixture {
        store: Arc<Store>,
        clock: Arc<ManualClock>,
        pipeline: Arc<ExerciseCreationPipeline>,
    }

    fn fixture() -> Fixture {
        let store = Store::new();
        let clock = Arc::new(ManualClock::new(1_000_000));
        let scheduler = Arc::new(WordScheduler::new(
            store.clone(),
            clock.clone(),
            &SchedulerConfig::default(),
        ));
        let cache = Arc::new(ExerciseCache::new(
            store.clone(),
            Arc::new(FakeContentGenerator::new()),
            clock.clone(),
            CacheConfig::default(),
        ));
        let pipeline = ExerciseCreationPipeline::new(
            store.clone(),
            clock.clone(),
            scheduler,
            cache,
            PipelineConfig {
                max_concurrent: 2,
                processing_timeout_secs: 60,
            },
        );
        store
            .learners
            .put("ana", Learner::new("ana", Language::Es, 0));
        Fixture {
            store,
            clock,
            pipeline,
        }
    }

    /// Polls until `done` holds or about two seconds pass.
    async fn wait_for<F: Fn() -> bool>(done: F) -> bool {
        for _ in 0..200 {
            if done() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        done()
    }

    // ============================================================
    // SINGLE-FLIGHT
    // ============================================================

    #[tokio::test]
    async fn test_duplicate_request_is_coalesced() {
        let fx = fixture();

        let first = fx.pipeline.create_new_exercise("ana").await.unwrap();
        fx.clock.advance(Duration::from_secs(10));
        let second = fx.pipeline.create_new_exercise("ana").await.unwrap();

        assert!(matches!(first, CreationRequest::Enqueued { .. }));
        assert_eq!(
            second,
            CreationRequest::AlreadyProcessing {
                since_ms: 1_000_000
            }
        );
        assert_eq!(fx.pipeline.stats().enqueued, 1);
        assert_eq!(fx.pipeline.stats().queued, 1);
    }

    #[tokio::test]
    async fn test_concurrent_requests_queue_one_job() {
        let fx = fixture();

        let (a, b) = tokio::join!(
            fx.pipeline.create_new_exercise("ana"),
            fx.pipeline.create_new_exercise("ana")
        );

        let enqueued = [a.unwrap(), b.unwrap()]
            .iter()
            .filter(|r| matches!(r, CreationRequest::Enqueued { .. }))
            .count();
        assert_eq!(enqueued, 1);
        assert_eq!(fx.pipeline.stats().enqueued, 1);
    }

    // ============================================================
    // EXPIRY
    // ============================================================

    #[tokio::test]
    async fn test_stuck_job_expires_and_is_retryable() {
        let fx = fixture();
        fx.pipeline.create_new_exercise("ana").await.unwrap();

        fx.clock.advance(Duration::from_secs(61));

        assert_eq!(
            fx.pipeline.get_created_exercise("ana").unwrap(),
            CreatedExercise::Expired {
                since_ms: 1_000_000
            }
        );
        let retry = fx.pipeline.create_new_exercise("ana").await.unwrap();
        assert!(matches!(retry, CreationRequest::Enqueued { .. }));
        assert_eq!(fx.pipeline.stats().enqueued, 2);
    }

    // ============================================================
    // WORKERS
    // ============================================================

    #[tokio::test]
    async fn test_worker_publishes_ready_exercise() {
        let fx = fixture();
        let word = VocabularyWord::new(Language::Es, "casa", Level::A1, 0);
        fx.store.words.put(word.id.clone(), word.clone());
        let token = CancellationToken::new();
        let handles = fx.pipeline.start(token.clone());

        fx.pipeline.create_new_exercise("ana").await.unwrap();
        let published = wait_for(|| fx.pipeline.stats().completed == 1).await;

        assert!(published);
        match fx.pipeline.get_created_exercise("ana").unwrap() {
            CreatedExercise::Ready { exercise, answered } => {
                assert!(!answered);
                // One or two blanks, always the only word available.
                assert!(exercise.word_ids.iter().all(|id| id == &word.id));
            }
            other => panic!("expected ready exercise, got {other:?}"),
        }

        token.cancel();
        for handle in handles {
            handle.await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_late_job_does_not_replace_newer_request() {
        let fx = fixture();
        let word = VocabularyWord::new(Language::Es, "casa", Level::A1, 0);
        fx.store.words.put(word.id.clone(), word);

        // The first job stalls past the timeout and the learner asks again.
        fx.pipeline.create_new_exercise("ana").await.unwrap();
        fx.clock.advance(Duration::from_secs(61));
        fx.pipeline.create_new_exercise("ana").await.unwrap();

        let token = CancellationToken::new();
        let handles = fx.pipeline.start(token.clone());
        let settled = wait_for(|| {
            let stats = fx.pipeline.stats();
            stats.completed == 1 && stats.superseded == 1
        })
        .await;

        assert!(settled);
        let learner = fx.store.learners.get("ana").unwrap();
        assert!(matches!(
            learner.exercise,
            ExercisePointer::Ready {
                created_at_ms: 1_061_000,
                answered_at_ms: None,
                ..
            }
        ));

        token.cancel();
        for handle in handles {
            handle.await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_late_job_keeps_answered_exercise() {
        let fx = fixture();
        let word = VocabularyWord::new(Language::Es, "casa", Level::A1, 0);
        fx.store.words.put(word.id.clone(), word);
        fx.pipeline.create_new_exercise("ana").await.unwrap();

        // A newer exercise was issued and answered while the job was queued.
        let answered = ExercisePointer::Ready {
            exercise_id: "newer".into(),
            created_at_ms: 1_070_000,
            answered_at_ms: Some(1_080_000),
        };
        let pointer = answered.clone();
        fx.store
            .learners
            .update("ana", move |l| -> Result<(), AppError> {
                l.exercise = pointer.clone();
                Ok(())
            })
            .unwrap();

        let token = CancellationToken::new();
        let handles = fx.pipeline.start(token.clone());
        let dropped = wait_for(|| fx.pipeline.stats().superseded == 1).await;

        assert!(dropped);
        assert_eq!(fx.pipeline.stats().completed, 0);
        assert_eq!(fx.store.learners.get("ana").unwrap().exercise, answered);

        token.cancel();
        for handle in handles {
            handle.await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_failed_job_leaves_pointer_processing() {
        let fx = fixture();
        let token = CancellationToken::new();
        fx.pipeline.start(token.clone());

        // No vocabulary at all, so no word can be picked.
        fx.pipeline.create_new_exercise("ana").await.unwrap();
        let failed = wait_for(|| fx.pipeline.stats().failed == 1).await;

        assert!(failed);
        assert_eq!(
            fx.pipeline.get_created_exercise("ana").unwrap(),
            CreatedExercise::Processing {
                since_ms: 1_000_000
            }
        );
        token.cancel();
    }

    // ============================================================
    // POLLING
    // ============================================================

    #[test]
    fn test_poll_before_any_request() {
        let fx = fixture();
        assert_eq!(
            fx.pipeline.get_created_exercise("ana").unwrap(),
            CreatedExercise::NotRequested
        );
    }

    #[test]
    fn test_broken_pointer_is_reported() {
        let fx = fixture();
        fx.store
            .learners
            .update("ana", |l| -> Result<(), AppError> {
                l.exercise = ExercisePointer::Ready {
                    exercise_id: "gone".into(),
                    created_at_ms: 1,
                    answered_at_ms: None,
                };
                Ok(())
            })
            .unwrap();

        let err = fx.pipeline.get_created_exercise("ana").unwrap_err();

        assert_eq!(
            err,
            AppError::BrokenPointer {
                learner_id: "ana".into(),
                exercise_id: "gone".into()
            }
        );
    }

    #[tokio::test]
    async fn test_unknown_learner() {
        let fx = fixture();
        let err = fx.pipeline.create_new_exercise("ghost").await.unwrap_err();
        assert_eq!(err, AppError::not_found("learner", "ghost"));
        assert_eq!(fx.pipeline.stats().enqueued, 0);
    }
}
