use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

pub type AppResult<T> = Result<T, AppError>;

const LOGIN_FAILED: &str = "invalid username or password";
const REPORT_NOT_FOUND: &str = "report not found";

#[derive(thiserror::Error, Debug)]
pub enum AppError {
    /// Wrong username or wrong password. Both cases carry the same message.
    #[error("invalid username or password")]
    InvalidCredentials,
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    /// The actor may not touch this report. Rendered exactly like `ReportNotFound`.
    #[error("permission denied on report {0}")]
    PermissionDenied(i64),
    #[error("a report for {date} already exists for user {user_id}")]
    DuplicateReport { user_id: i64, date: chrono::NaiveDate },
    #[error("report {0} not found")]
    ReportNotFound(i64),
    #[error("user {0} not found")]
    UnknownUser(i64),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("database error")]
    Database(#[from] sqlx::Error),
    #[error("internal server error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::Unauthenticated(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AppError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::PermissionDenied(_) => StatusCode::NOT_FOUND,
            AppError::DuplicateReport { .. } => StatusCode::CONFLICT,
            AppError::ReportNotFound(_) => StatusCode::NOT_FOUND,
            AppError::UnknownUser(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let (error, message) = match &self {
            AppError::InvalidCredentials => ("invalid_credentials", LOGIN_FAILED.to_string()),
            AppError::Unauthenticated(_) => ("unauthenticated", "authentication required".to_string()),
            AppError::Forbidden(_) => ("forbidden", self.to_string()),
            AppError::PermissionDenied(_) | AppError::ReportNotFound(_) => {
                ("not_found", REPORT_NOT_FOUND.to_string())
            }
            AppError::DuplicateReport { .. } => ("duplicate_report", self.to_string()),
            AppError::UnknownUser(_) => ("not_found", self.to_string()),
            AppError::Conflict(_) => ("conflict", self.to_string()),
            AppError::Validation(_) => ("validation", self.to_string()),
            AppError::Configuration(_) | AppError::Database(_) | AppError::Internal(_) => {
                tracing::error!(error = %self, "request failed");
                ("internal", "internal server error".to_string())
            }
        };

        let payload = ErrorResponse {
            error: error.to_string(),
            message,
        };

        (status, Json(payload)).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(value: anyhow::Error) -> Self {
        Self::Internal(value.to_string())
    }
}
