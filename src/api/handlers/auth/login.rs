//! POST /auth/login

use crate::api::handlers::auth::{
    credentials::{self, CredentialOutcome},
    error::AuthError,
    state::AuthState,
    storage::UserRecord,
    tokens,
    types::{LoginRequest, TokenResponse},
    utils,
};
use anyhow::{Context, Result};
use axum::{Extension, Json, http::StatusCode, response::IntoResponse};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::error;

/// Issue a token pair for `user`: sign, persist the refresh hash, commit,
/// then index the access token for bulk revocation.
pub(super) async fn issue_session(
    pool: &PgPool,
    state: &AuthState,
    user: &UserRecord,
) -> Result<TokenResponse> {
    let mut tx = pool
        .begin()
        .await
        .context("failed to begin issuance transaction")?;

    let issued = tokens::issue(&mut tx, state.signer(), state.config(), user).await?;

    tx.commit()
        .await
        .context("failed to commit issuance transaction")?;

    // A degraded index write is logged inside; the session still stands.
    let _ = state
        .registry()
        .track_token(user.id, &issued.access_token)
        .await;

    Ok(TokenResponse::from(issued))
}

#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Credentials accepted, token pair issued", body = TokenResponse),
        (status = 400, description = "Missing or malformed payload"),
        (status = 401, description = "Invalid credentials or locked account"),
        (status = 500, description = "Token issuance failed"),
    ),
    tag = "auth"
)]
pub async fn login(
    Extension(pool): Extension<PgPool>,
    Extension(state): Extension<Arc<AuthState>>,
    payload: Option<Json<LoginRequest>>,
) -> impl IntoResponse {
    let Some(Json(request)) = payload else {
        return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response();
    };

    let email = utils::normalize_email(&request.email);
    if email.is_empty() || request.password.is_empty() {
        return AuthError::InvalidCredentials.response().into_response();
    }

    let outcome =
        match credentials::validate(&pool, state.config(), &email, &request.password).await {
            Ok(outcome) => outcome,
            Err(err) => {
                error!("credential validation failed: {err:#}");
                return AuthError::Issuance.response().into_response();
            }
        };

    let user = match outcome {
        CredentialOutcome::Valid(user) => user,
        CredentialOutcome::Invalid => {
            return AuthError::InvalidCredentials.response().into_response();
        }
        CredentialOutcome::Locked { remaining_minutes } => {
            return AuthError::Locked { remaining_minutes }
                .response()
                .into_response();
        }
    };

    match issue_session(&pool, &state, &user).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(err) => {
            error!("token issuance failed: {err:#}");
            AuthError::Issuance.response().into_response()
        }
    }
}
