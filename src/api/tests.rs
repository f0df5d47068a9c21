//! API Module Tests
//!
//! Handlers are called directly with their extractors; the router itself is
//! only built to check that every route pattern is accepted.

#[cfg(test)]
mod tests {
    use crate::api::handlers::*;
    use crate::api::protocol::*;
    use crate::api::{ApiError, router};
    use crate::clock::ManualClock;
    use crate::config::AppConfig;
    use crate::context::AppContext;
    use crate::coordinator::ReplicaId;
    use crate::error::{AppError, StoreError};
    use crate::exercise::types::{Exercise, ExerciseFields};
    use crate::generator::fake::FakeContentGenerator;
    use crate::language::Language;
    use crate::learner::ExercisePointer;
    use crate::storage::Store;
    use crate::vocabulary::types::{LearnerWord, Level, VocabularyWord};

    use axum::Json;
    use axum::extract::{Extension, Path, Query};
    use axum::http::StatusCode;
    use std::sync::Arc;

    const EXERCISE_ID: &str = "9a3e7b1c-1f0e-4b9a-8d5c-2e6f7a8b9c0d";

    fn context() -> Arc<AppContext> {
        AppContext::new(
            AppConfig::default(),
            Store::new(),
            Arc::new(FakeContentGenerator::new()),
            Arc::new(ManualClock::new(1_000)),
            ReplicaId::from("r1"),
        )
    }

    fn seed_issued_exercise(ctx: &AppContext) {
        ctx.store.exercises.put(
            EXERCISE_ID,
            Exercise {
                id: EXERCISE_ID.into(),
                word_ids: vec!["w1".into()],
                word_values: vec!["ir".into()],
                language: Language::Es,
                level: Level::A1,
                variant_key: "k".into(),
                content: ExerciseFields {
                    lead_in: "Nosotros ___ al parque.".into(),
                    instruction: "Choose the correct form:".into(),
                    options: vec!["a) vamos".into(), "b) van".into(), "c) voy".into()],
                    correct_index: 0,
                },
                created_at_ms: 500,
            },
        );
        ctx.store
            .learners
            .update("ana", |l| -> Result<(), AppError> {
                l.exercise = ExercisePointer::Ready {
                    exercise_id: EXERCISE_ID.into(),
                    created_at_ms: 500,
                    answered_at_ms: None,
                };
                Ok(())
            })
            .unwrap();
    }

    async fn create_ana(ctx: &Arc<AppContext>) {
        handle_create_learner(
            Extension(ctx.clone()),
            Json(CreateLearnerRequest {
                learner_id: "ana".into(),
                language: Language::Es,
            }),
        )
        .await
        .unwrap();
    }

    // ============================================================
    // ROUTING & STATUS MAPPING
    // ============================================================

    #[test]
    fn test_router_builds() {
        let _ = router(context());
    }

    #[test]
    fn test_error_status_mapping() {
        let cases = [
            (AppError::not_found("learner", "x"), StatusCode::NOT_FOUND),
            (AppError::NoWordAvailable, StatusCode::NOT_FOUND),
            (AppError::validation("bad"), StatusCode::BAD_REQUEST),
            (AppError::Generation("down".into()), StatusCode::BAD_GATEWAY),
            (AppError::ShuttingDown, StatusCode::SERVICE_UNAVAILABLE),
            (
                AppError::BrokenPointer {
                    learner_id: "a".into(),
                    exercise_id: "b".into(),
                },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                AppError::Store(StoreError::VersionConflict {
                    collection: "learners",
                    key: "a".into(),
                    attempts: 8,
                }),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(ApiError(err).status(), expected);
        }
    }

    // ============================================================
    // LEARNERS
    // ============================================================

    #[tokio::test]
    async fn test_create_then_get_learner() {
        let ctx = context();
        create_ana(&ctx).await;

        let Json(learner) = handle_get_learner(Extension(ctx.clone()), Path("ana".into()))
            .await
            .unwrap();

        assert_eq!(learner.id, "ana");
        assert_eq!(learner.learning_language, Language::Es);
    }

    #[tokio::test]
    async fn test_set_ui_language_route() {
        let ctx = context();
        create_ana(&ctx).await;

        let Json(learner) = handle_set_ui_language(
            Extension(ctx.clone()),
            Path("ana".into()),
            Json(SetLanguageRequest {
                language: Language::Es,
            }),
        )
        .await
        .unwrap();
        let err = handle_set_ui_language(
            Extension(ctx.clone()),
            Path("ana".into()),
            Json(SetLanguageRequest {
                language: Language::De,
            }),
        )
        .await
        .unwrap_err();

        assert_eq!(learner.ui_language, Language::Es);
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unknown_learner_is_404() {
        let ctx = context();

        let err = handle_get_learner(Extension(ctx), Path("ghost".into()))
            .await
            .unwrap_err();

        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_unsupported_language_is_400() {
        let ctx = context();

        let err = handle_create_learner(
            Extension(ctx),
            Json(CreateLearnerRequest {
                learner_id: "ana".into(),
                language: Language::Ru,
            }),
        )
        .await
        .unwrap_err();

        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_words_default_to_learning_language() {
        let ctx = context();
        create_ana(&ctx).await;
        let word = VocabularyWord::new(Language::Es, "casa", Level::A1, 0);
        let mut lw = LearnerWord::new_locked("ana", &word.id, Language::Es, 0);
        lw.unlock(0);
        ctx.store.learner_words.put(lw.key(), lw);
        ctx.store.words.put(word.id.clone(), word);

        let Json(words) = handle_learner_words(
            Extension(ctx.clone()),
            Path("ana".into()),
            Query(WordsQuery::default()),
        )
        .await
        .unwrap();

        assert_eq!(words.len(), 1);
        assert_eq!(words[0].value, "casa");
    }

    // ============================================================
    // EXERCISES
    // ============================================================

    #[tokio::test]
    async fn test_poll_hides_correct_index() {
        let ctx = context();
        create_ana(&ctx).await;
        seed_issued_exercise(&ctx);

        let Json(poll) = handle_poll_exercise(Extension(ctx.clone()), Path("ana".into()))
            .await
            .unwrap();
        let json = serde_json::to_value(&poll).unwrap();

        assert_eq!(json["status"], "ready");
        assert_eq!(json["exercise"]["id"], EXERCISE_ID);
        assert_eq!(json["exercise"]["options"][0], "a) vamos");
        assert!(!json.to_string().contains("correct_index"));
    }

    #[tokio::test]
    async fn test_request_exercise_coalesces() {
        let ctx = context();
        create_ana(&ctx).await;

        let Json(first) = handle_request_exercise(Extension(ctx.clone()), Path("ana".into()))
            .await
            .unwrap();
        let Json(second) = handle_request_exercise(Extension(ctx.clone()), Path("ana".into()))
            .await
            .unwrap();

        assert!(matches!(first, crate::pipeline::CreationRequest::Enqueued { .. }));
        assert_eq!(
            second,
            crate::pipeline::CreationRequest::AlreadyProcessing { since_ms: 1_000 }
        );
    }

    #[test]
    fn test_answer_body_accepts_number_or_letter() {
        let numeric: AnswerRequest =
            serde_json::from_str(r#"{"exercise_id":"x","answer":2}"#).unwrap();
        let letter: AnswerRequest =
            serde_json::from_str(r#"{"exercise_id":"x","answer":"c)"}"#).unwrap();

        assert_eq!(numeric.answer.as_text(), "2");
        assert_eq!(letter.answer.as_text(), "c)");
    }

    #[tokio::test]
    async fn test_submit_answer_and_vote() {
        let ctx = context();
        create_ana(&ctx).await;
        seed_issued_exercise(&ctx);

        let Json(outcome) = handle_submit_answer(
            Extension(ctx.clone()),
            Path("ana".into()),
            Json(AnswerRequest {
                exercise_id: EXERCISE_ID.into(),
                answer: AnswerInput::Index(0),
            }),
        )
        .await
        .unwrap();
        let Json(vote) = handle_vote(
            Extension(ctx.clone()),
            Path("ana".into()),
            Json(VoteRequest {
                exercise_id: EXERCISE_ID.into(),
                is_positive: true,
            }),
        )
        .await
        .unwrap();

        assert!(outcome.correct);
        assert_eq!(ctx.learners.get("ana").unwrap().xp, 10);
        assert!(matches!(
            vote,
            crate::exercise::VoteOutcome::Recorded { .. }
        ));
    }

    #[tokio::test]
    async fn test_replica_status_reports_local_id() {
        let ctx = context();

        let Json(status) = handle_replica_status(Extension(ctx)).await;

        assert_eq!(status.replica.replica_id, ReplicaId::from("r1"));
        assert!(!status.replica.is_leader);
        assert_eq!(status.pipeline.enqueued, 0);
    }
}
