//! API error types.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use reelstack_models::{CompositionFailure, FailureClass, JobStage, ValidationError};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::config::ApiConfig;

/// Message returned in place of internal error details in production.
const REDACTED_INTERNAL: &str = "An internal error occurred";

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("{}", .0.message)]
    Composition(CompositionFailure),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    /// Internal error whose details are logged, and hidden from clients in production.
    pub fn internal(config: &ApiConfig, msg: impl Into<String>) -> Self {
        let msg = msg.into();
        error!(detail = %msg, "Internal API error");
        if config.is_production() {
            Self::Internal(REDACTED_INTERNAL.to_string())
        } else {
            Self::Internal(msg)
        }
    }

    fn diagnostics(&self) -> Option<String> {
        match self {
            ApiError::Composition(failure) => failure.diagnostics.clone(),
            _ => None,
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Composition(failure) => match failure.class {
                FailureClass::BadInput => StatusCode::BAD_REQUEST,
                FailureClass::Network => StatusCode::BAD_GATEWAY,
                FailureClass::Encode | FailureClass::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn stage_and_class(&self) -> (Option<JobStage>, FailureClass) {
        match self {
            ApiError::BadRequest(_) | ApiError::Validation(_) => {
                (Some(JobStage::Created), FailureClass::BadInput)
            }
            ApiError::Composition(failure) => (Some(failure.stage), failure.class),
            ApiError::Internal(_) => (None, FailureClass::Internal),
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    stage: Option<JobStage>,
    class: FailureClass,
    #[serde(skip_serializing_if = "Option::is_none")]
    diagnostics: Option<String>,
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let (stage, class) = self.stage_and_class();

        let body = ErrorResponse {
            error: self.to_string(),
            stage,
            class,
            diagnostics: self.diagnostics(),
        };

        (status, Json(body)).into_response()
    }
}
