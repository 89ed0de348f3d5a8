use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// ApiResult
///
/// Every handler returns this alias so failures flow through `AppError::into_response`.
pub type ApiResult<T> = Result<T, AppError>;

/// FieldError
///
/// One violated input field. Validation failures carry every violation found,
/// not just the first one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// AppError
///
/// The error taxonomy shared by the auth layer and the resource handlers.
/// Each variant maps to exactly one HTTP status and renders the
/// `{success: false, message, errors?}` envelope.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation failed: {}", summarize(.0))]
    Validation(Vec<FieldError>),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthenticated(String),

    #[error("{0}")]
    InvalidCredential(String),

    #[error("You do not have permission to perform this action")]
    Forbidden,

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Uploaded file exceeds the maximum allowed size")]
    PayloadTooLarge,

    #[error("Too many requests from this client, please try again later.")]
    RateLimited,

    #[error("Server configuration error: {0}")]
    Configuration(String),

    #[error("Upstream service error: {0}")]
    Upstream(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

fn summarize(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

impl AppError {
    /// Shorthand for a single-field validation failure.
    pub fn invalid(field: &str, message: impl Into<String>) -> Self {
        AppError::Validation(vec![FieldError::new(field, message)])
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthenticated(_) | AppError::InvalidCredential(_) => {
                StatusCode::UNAUTHORIZED
            }
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
            AppError::Configuration(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// The message placed in the response body. Server-side faults are
    /// reduced to a generic message; their detail only goes to the log.
    fn public_message(&self) -> String {
        match self {
            AppError::Validation(errors) => match errors.first() {
                Some(first) if errors.len() == 1 => first.message.clone(),
                _ => "Please correct the highlighted fields".to_string(),
            },
            AppError::Configuration(_) | AppError::Internal(_) => {
                "Internal server error".to_string()
            }
            other => other.to_string(),
        }
    }
}

/// ErrorBody
///
/// Wire shape of every failed response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FieldError>>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        match &self {
            AppError::Configuration(detail) => {
                tracing::error!(detail = %detail, "configuration error while serving request")
            }
            AppError::Internal(detail) => tracing::error!(detail = %detail, "internal error"),
            AppError::Upstream(detail) => tracing::error!(detail = %detail, "upstream failure"),
            _ => {}
        }

        let body = ErrorBody {
            success: false,
            message: self.public_message(),
            errors: match self {
                AppError::Validation(errors) => Some(errors),
                _ => None,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<crate::repository::RepositoryError> for AppError {
    fn from(err: crate::repository::RepositoryError) -> Self {
        use crate::repository::RepositoryError;
        match err {
            RepositoryError::Conflict(msg) => AppError::Conflict(msg),
            RepositoryError::Database(e) => AppError::Internal(e.to_string()),
            RepositoryError::Corrupt(msg) => AppError::Internal(msg),
        }
    }
}
