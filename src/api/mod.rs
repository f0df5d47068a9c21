//! HTTP API Module
//!
//! Thin `axum` handlers over the services in [`AppContext`]. Handlers parse,
//! delegate and map [`AppError`] onto a status code; no domain logic lives here.
//!
//! ## Status mapping
//! - `NotFound`, `NoWordAvailable` -> 404
//! - `Validation` -> 400
//! - `Generation` -> 502 (the content generator failed us)
//! - `ShuttingDown` -> 503
//! - `BrokenPointer`, `Store` -> 500

pub mod handlers;
pub mod protocol;

use crate::context::AppContext;
use crate::error::AppError;
use handlers::*;
use protocol::*;

use axum::{
    Json, Router,
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use std::sync::Arc;

pub fn router(ctx: Arc<AppContext>) -> Router {
    Router::new()
        .route(ENDPOINT_LANGUAGES, get(handle_languages))
        .route(ENDPOINT_LEARNERS, post(handle_create_learner))
        .route(ENDPOINT_LEARNER, get(handle_get_learner))
        .route(ENDPOINT_LEARNING_LANGUAGE, put(handle_set_language))
        .route(ENDPOINT_UI_LANGUAGE, put(handle_set_ui_language))
        .route(ENDPOINT_NEXT_WORD, get(handle_next_word))
        .route(ENDPOINT_UNLOCK, post(handle_unlock))
        .route(ENDPOINT_WORDS, get(handle_learner_words))
        .route(
            ENDPOINT_EXERCISE,
            post(handle_request_exercise).get(handle_poll_exercise),
        )
        .route(ENDPOINT_ANSWER, post(handle_submit_answer))
        .route(ENDPOINT_VOTE, post(handle_vote))
        .route(ENDPOINT_REPLICA_STATUS, get(handle_replica_status))
        .layer(Extension(ctx))
}

/// An [`AppError`] on its way out as an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            AppError::NotFound { .. } | AppError::NoWordAvailable => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Generation(_) => StatusCode::BAD_GATEWAY,
            AppError::ShuttingDown => StatusCode::SERVICE_UNAVAILABLE,
            AppError::BrokenPointer { .. } | AppError::Store(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self.0);
        } else {
            tracing::debug!("Request rejected: {}", self.0);
        }
        (
            status,
            Json(ErrorResponse {
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests;
