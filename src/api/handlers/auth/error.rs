//! Error taxonomy for the auth endpoints.
//!
//! Handlers map every failure to one of these variants so the HTTP status and
//! message for a given condition are fixed in one place. Credential failures
//! and unknown accounts share a single generic message on purpose.

use axum::http::StatusCode;

#[derive(Debug, PartialEq, Eq)]
pub(super) enum AuthError {
    /// Wrong password or unknown email, indistinguishable by design.
    InvalidCredentials,
    /// The account is locked out from failed attempts.
    Locked { remaining_minutes: i64 },
    /// Refresh token is unknown, expired, revoked or malformed.
    InvalidRefreshToken,
    /// Registration hit an existing email.
    EmailTaken,
    /// Missing, malformed, expired or revoked bearer token.
    Unauthorized,
    /// Internal failure while producing a token pair.
    Issuance,
}

impl AuthError {
    pub(super) fn response(&self) -> (StatusCode, String) {
        match self {
            Self::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "Invalid email or password".to_string(),
            ),
            Self::Locked { remaining_minutes } => (
                StatusCode::UNAUTHORIZED,
                format!(
                    "Account is locked due to multiple failed login attempts. Try again in {remaining_minutes} minutes."
                ),
            ),
            Self::InvalidRefreshToken => (
                StatusCode::UNAUTHORIZED,
                "Invalid or expired refresh token".to_string(),
            ),
            Self::EmailTaken => (StatusCode::CONFLICT, "Email already in use".to_string()),
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
            Self::Issuance => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Could not complete login process".to_string(),
            ),
        }
    }
}
