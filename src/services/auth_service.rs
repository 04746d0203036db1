//! Domain service for registration, credential checks, and the
//! password-reset token lifecycle.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::security::password_policy::PasswordEvaluation;

/// Why a credential check failed. Recorded in the audit trail only;
/// the user-facing message never distinguishes the two cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialFailure {
    UnknownUsername,
    WrongPassword,
}

impl CredentialFailure {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UnknownUsername => "unknown_username",
            Self::WrongPassword => "wrong_password",
        }
    }
}

/// Errors specific to authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid username or password")]
    InvalidCredentials {
        attempted_user_id: Option<i32>,
        reason: CredentialFailure,
    },

    #[error("An account with this email already exists")]
    DuplicateUsername,

    #[error("Password does not meet the security requirements")]
    WeakPassword(PasswordEvaluation),

    #[error("Invalid or already used token")]
    TokenInvalid,

    #[error("This reset link has expired, please request a new one")]
    TokenExpired,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for AuthError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// The minimal authenticated identity carried in a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Principal {
    pub id: i32,
    pub username: String,
    pub role: String,
}

impl Principal {
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == "admin"
    }
}

/// Registration input after shape validation.
#[derive(Debug, Clone)]
pub struct NewRegistration {
    pub username: String,
    pub password: String,
    pub consent_terms: bool,
    pub consent_privacy: bool,
    pub consent_marketing: bool,
}

/// Domain service trait for authentication and account security.
#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    /// Registers a new customer account.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::WeakPassword`] with itemized feedback when the
    /// password policy rejects the password, and
    /// [`AuthError::DuplicateUsername`] when the username is taken.
    async fn register(&self, registration: NewRegistration) -> Result<Principal, AuthError>;

    /// Verifies credentials and returns the principal.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] for both unknown usernames
    /// and wrong passwords; the variant carries the attempted user id (when
    /// the account exists) so the caller can audit the failure.
    async fn authenticate(&self, username: &str, password: &str) -> Result<Principal, AuthError>;

    /// Resolves a stored session principal back to a live user.
    ///
    /// Returns `None` when the user record has vanished; the caller must
    /// treat the request as unauthenticated.
    async fn resolve_principal(&self, user_id: i32) -> Result<Option<Principal>, AuthError>;

    /// Issues a password-reset token if the account exists.
    ///
    /// Returns the user id when a token was issued (for the audit trail)
    /// and `None` for unknown accounts; either way the HTTP response must
    /// stay generic. Prior outstanding tokens are superseded.
    async fn forgot_password(&self, email: &str) -> Result<Option<i32>, AuthError>;

    /// Checks a raw reset token without consuming it (reset-form preflight).
    async fn validate_reset_token(&self, raw_token: &str) -> Result<(), AuthError>;

    /// Consumes a reset token and updates the password.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::TokenInvalid`] when the token is unknown,
    /// already used, or lost the consume race, [`AuthError::TokenExpired`]
    /// past its expiry, and [`AuthError::WeakPassword`] when the new
    /// password fails policy. Returns the affected user id on success.
    async fn reset_password(&self, raw_token: &str, new_password: &str) -> Result<i32, AuthError>;

    /// Consumes an email-verification token and marks the account verified.
    async fn verify_email(&self, raw_token: &str) -> Result<(), AuthError>;
}
