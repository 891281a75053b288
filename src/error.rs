use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// AppError
///
/// The single error type crossing the request pipeline. Every variant except the gate's
/// own 403 denial ends up here, and `IntoResponse` acts as the global error boundary that
/// formats it for the client.
#[derive(Debug, Error)]
pub enum AppError {
    /// Caller input or caller identity could not be resolved (e.g. unknown user id).
    #[error("{0}")]
    InvalidRequest(String),

    /// No valid credentials were presented to the authentication stage.
    #[error("authentication required")]
    Unauthorized,

    #[error("{0}")]
    NotFound(String),

    /// A request or response payload could not be serialized for auditing.
    #[error("payload serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("{0}")]
    Internal(String),
}

/// ErrorBody
///
/// JSON body written for every error and denial response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub status: u16,
    pub message: String,
}

impl ErrorBody {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status: status.as_u16(),
            message: message.into(),
        }
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Serialization(_) | AppError::Database(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Internal causes are logged, never echoed to the client.
        let message = if status.is_server_error() {
            tracing::error!(error = %self, "request failed with an internal error");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        (status, Json(ErrorBody::new(status, message))).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
