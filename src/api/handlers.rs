use super::ApiError;
use super::protocol::*;
use crate::answer::AnswerOutcome;
use crate::context::AppContext;
use crate::exercise::VoteOutcome;
use crate::learner::Learner;
use crate::learner::service::LanguageInfo;
use crate::pipeline::CreationRequest;
use crate::vocabulary::types::LearnerWordView;
use crate::vocabulary::{UnlockStatus, VocabularyWord};

use axum::{
    Json,
    extract::{Extension, Path, Query},
};
use std::sync::Arc;

type ApiResult<T> = Result<Json<T>, ApiError>;

pub async fn handle_languages(
    Extension(ctx): Extension<Arc<AppContext>>,
) -> Json<Vec<LanguageInfo>> {
    Json(ctx.learners.supported_languages())
}

pub async fn handle_create_learner(
    Extension(ctx): Extension<Arc<AppContext>>,
    Json(req): Json<CreateLearnerRequest>,
) -> ApiResult<Learner> {
    let learner = ctx.learners.create_if_needed(&req.learner_id, req.language)?;
    Ok(Json(learner))
}

pub async fn handle_get_learner(
    Extension(ctx): Extension<Arc<AppContext>>,
    Path(learner_id): Path<String>,
) -> ApiResult<Learner> {
    Ok(Json(ctx.learners.get(&learner_id)?))
}

pub async fn handle_set_language(
    Extension(ctx): Extension<Arc<AppContext>>,
    Path(learner_id): Path<String>,
    Json(req): Json<SetLanguageRequest>,
) -> ApiResult<Learner> {
    let learner = ctx.learners.set_learning_language(&learner_id, req.language)?;
    Ok(Json(learner))
}

pub async fn handle_set_ui_language(
    Extension(ctx): Extension<Arc<AppContext>>,
    Path(learner_id): Path<String>,
    Json(req): Json<SetLanguageRequest>,
) -> ApiResult<Learner> {
    let learner = ctx.learners.set_ui_language(&learner_id, req.language)?;
    Ok(Json(learner))
}

pub async fn handle_next_word(
    Extension(ctx): Extension<Arc<AppContext>>,
    Path(learner_id): Path<String>,
) -> ApiResult<VocabularyWord> {
    Ok(Json(ctx.scheduler.get_next_word(&learner_id)?))
}

pub async fn handle_unlock(
    Extension(ctx): Extension<Arc<AppContext>>,
    Path(learner_id): Path<String>,
) -> ApiResult<UnlockStatus> {
    Ok(Json(ctx.scheduler.check_unlock_progress(&learner_id)?))
}

pub async fn handle_learner_words(
    Extension(ctx): Extension<Arc<AppContext>>,
    Path(learner_id): Path<String>,
    Query(query): Query<WordsQuery>,
) -> ApiResult<Vec<LearnerWordView>> {
    let language = match query.language {
        Some(language) => language,
        None => ctx.learners.get(&learner_id)?.learning_language,
    };
    let words = ctx
        .scheduler
        .get_learner_words(&learner_id, language, query.locked)?;
    Ok(Json(words))
}

pub async fn handle_request_exercise(
    Extension(ctx): Extension<Arc<AppContext>>,
    Path(learner_id): Path<String>,
) -> ApiResult<CreationRequest> {
    Ok(Json(ctx.pipeline.create_new_exercise(&learner_id).await?))
}

pub async fn handle_poll_exercise(
    Extension(ctx): Extension<Arc<AppContext>>,
    Path(learner_id): Path<String>,
) -> ApiResult<ExercisePollResponse> {
    let created = ctx.pipeline.get_created_exercise(&learner_id)?;
    Ok(Json(created.into()))
}

pub async fn handle_submit_answer(
    Extension(ctx): Extension<Arc<AppContext>>,
    Path(learner_id): Path<String>,
    Json(req): Json<AnswerRequest>,
) -> ApiResult<AnswerOutcome> {
    let outcome =
        ctx.validator
            .submit_answer(&learner_id, &req.exercise_id, &req.answer.as_text())?;
    if let Some(reason) = outcome.reject_reason() {
        tracing::debug!("Answer from {} rejected: {:?}", learner_id, reason);
    }
    Ok(Json(outcome))
}

pub async fn handle_vote(
    Extension(ctx): Extension<Arc<AppContext>>,
    Path(learner_id): Path<String>,
    Json(req): Json<VoteRequest>,
) -> ApiResult<VoteOutcome> {
    let outcome = ctx
        .votes
        .vote_exercise(&learner_id, &req.exercise_id, req.is_positive)?;
    Ok(Json(outcome))
}

pub async fn handle_replica_status(
    Extension(ctx): Extension<Arc<AppContext>>,
) -> Json<ReplicaStatusResponse> {
    Json(ReplicaStatusResponse {
        replica: ctx.coordinator.status(),
        pipeline: ctx.pipeline.stats(),
    })
}
