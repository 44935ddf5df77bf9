//! Error type surfaced at the HTTP boundary

use crate::types::api::ErrorResponse;
use crate::types::classifier::ClassifierKind;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;
use tracing::{error, warn};

pub type ServiceResult<T> = std::result::Result<T, ServiceError>;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("No feature data available for training")]
    NoTrainingData,

    #[error("Missing labels in data")]
    MissingLabels,

    #[error("No {0} model has been trained")]
    ModelNotTrained(ClassifierKind),

    #[error("{0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ServiceError {
    pub fn invalid(message: impl Into<String>) -> Self {
        ServiceError::InvalidRequest(message.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            // Keep the whole context chain for internal failures
            ServiceError::Internal(e) => format!("{e:#}"),
            other => other.to_string(),
        };

        if status.is_server_error() {
            error!(status = status.as_u16(), error = %message, "Request failed");
        } else {
            warn!(status = status.as_u16(), error = %message, "Request rejected");
        }

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}
