use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

use crate::security::password_policy::PasswordEvaluation;
use crate::services::auth_service::AuthError;

/// The single 401 body for credential failures. Unknown username and
/// wrong password must produce byte-identical responses.
pub const INVALID_CREDENTIALS_MESSAGE: &str = "Invalid username or password";

#[derive(Debug)]
pub enum ApiError {
    /// Field-level validation failures, surfaced as 400 `{message, errors[]}`.
    Validation(Vec<String>),

    DuplicateUsername,

    WeakPassword(PasswordEvaluation),

    InvalidCredentials,

    Unauthorized,

    Forbidden(String),

    CsrfRejected,

    RateLimited,

    TokenInvalid,

    TokenExpired,

    NotFound(String),

    DatabaseError(String),

    InternalError(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation(errors) => write!(f, "Validation failed: {}", errors.join(", ")),
            Self::DuplicateUsername => write!(f, "Duplicate username"),
            Self::WeakPassword(_) => write!(f, "Weak password"),
            Self::InvalidCredentials => write!(f, "{INVALID_CREDENTIALS_MESSAGE}"),
            Self::Unauthorized => write!(f, "Not authenticated"),
            Self::Forbidden(msg) => write!(f, "Forbidden: {msg}"),
            Self::CsrfRejected => write!(f, "CSRF rejected"),
            Self::RateLimited => write!(f, "Rate limited"),
            Self::TokenInvalid => write!(f, "Invalid token"),
            Self::TokenExpired => write!(f, "Expired token"),
            Self::NotFound(msg) => write!(f, "Not found: {msg}"),
            Self::DatabaseError(msg) => write!(f, "Database error: {msg}"),
            Self::InternalError(msg) => write!(f, "Internal error: {msg}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            Self::Validation(errors) => (
                StatusCode::BAD_REQUEST,
                json!({ "message": "Validation failed", "errors": errors }),
            ),
            Self::DuplicateUsername => (
                StatusCode::BAD_REQUEST,
                json!({ "message": "An account with this email already exists" }),
            ),
            Self::WeakPassword(evaluation) => (
                StatusCode::BAD_REQUEST,
                json!({
                    "message": "Password does not meet the security requirements",
                    "feedback": evaluation.missing,
                    "strength": evaluation.strength,
                }),
            ),
            Self::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                json!({ "message": INVALID_CREDENTIALS_MESSAGE }),
            ),
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                json!({ "message": "Not authenticated" }),
            ),
            Self::Forbidden(message) => (StatusCode::FORBIDDEN, json!({ "message": message })),
            Self::CsrfRejected => (
                StatusCode::FORBIDDEN,
                json!({ "message": "Invalid security token, please refresh and retry" }),
            ),
            Self::RateLimited => (
                StatusCode::TOO_MANY_REQUESTS,
                json!({ "message": "Too many attempts, please try again later" }),
            ),
            Self::TokenInvalid => (
                StatusCode::BAD_REQUEST,
                json!({ "message": "Invalid or already used token" }),
            ),
            Self::TokenExpired => (
                StatusCode::BAD_REQUEST,
                json!({ "message": "This reset link has expired, please request a new one" }),
            ),
            Self::NotFound(message) => (StatusCode::NOT_FOUND, json!({ "message": message })),
            Self::DatabaseError(msg) => {
                tracing::error!("Database error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "message": "A database error occurred" }),
                )
            }
            Self::InternalError(msg) => {
                tracing::error!("Internal error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "message": "An internal error occurred" }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::InternalError(err.to_string())
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials { .. } => Self::InvalidCredentials,
            AuthError::DuplicateUsername => Self::DuplicateUsername,
            AuthError::WeakPassword(evaluation) => Self::WeakPassword(evaluation),
            AuthError::TokenInvalid => Self::TokenInvalid,
            AuthError::TokenExpired => Self::TokenExpired,
            AuthError::Database(msg) => Self::DatabaseError(msg),
            AuthError::Internal(msg) => Self::InternalError(msg),
        }
    }
}

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(vec![msg.into()])
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::InternalError(msg.into())
    }

    pub fn not_found(resource: &str, id: impl fmt::Display) -> Self {
        Self::NotFound(format!("{resource} {id} not found"))
    }
}
