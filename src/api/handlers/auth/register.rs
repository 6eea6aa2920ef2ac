//! POST /auth/register

use crate::api::handlers::auth::{
    credentials,
    error::AuthError,
    login::issue_session,
    state::AuthState,
    storage::{self, InsertUserOutcome},
    types::{RegisterRequest, TokenResponse},
    utils,
};
use axum::{Extension, Json, http::StatusCode, response::IntoResponse};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::error;

const MIN_PASSWORD_LENGTH: usize = 8;

#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created, token pair issued", body = TokenResponse),
        (status = 400, description = "Missing payload, invalid email or weak password"),
        (status = 409, description = "Email already in use"),
        (status = 500, description = "Registration failed"),
    ),
    tag = "auth"
)]
pub async fn register(
    Extension(pool): Extension<PgPool>,
    Extension(state): Extension<Arc<AuthState>>,
    payload: Option<Json<RegisterRequest>>,
) -> impl IntoResponse {
    let Some(Json(request)) = payload else {
        return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response();
    };

    let email = utils::normalize_email(&request.email);
    if !utils::valid_email(&email) {
        return (StatusCode::BAD_REQUEST, "Invalid email address".to_string()).into_response();
    }

    if request.password.chars().count() < MIN_PASSWORD_LENGTH {
        return (
            StatusCode::BAD_REQUEST,
            format!("Password must be at least {MIN_PASSWORD_LENGTH} characters long"),
        )
            .into_response();
    }

    let name = request
        .name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty());

    let password_hash = match credentials::hash_password(request.password).await {
        Ok(hash) => hash,
        Err(err) => {
            error!("password hashing failed: {err:#}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Registration failed".to_string(),
            )
                .into_response();
        }
    };

    let mut tx = match pool.begin().await {
        Ok(tx) => tx,
        Err(err) => {
            error!("failed to begin registration transaction: {err:#}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Registration failed".to_string(),
            )
                .into_response();
        }
    };

    let user = match storage::insert_user(&mut tx, &email, &password_hash, name).await {
        Ok(InsertUserOutcome::Created(user)) => user,
        Ok(InsertUserOutcome::EmailTaken) => {
            return AuthError::EmailTaken.response().into_response();
        }
        Err(err) => {
            error!("failed to insert user: {err:#}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Registration failed".to_string(),
            )
                .into_response();
        }
    };

    if let Err(err) = tx.commit().await {
        error!("failed to commit registration transaction: {err:#}");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Registration failed".to_string(),
        )
            .into_response();
    }

    // Auto-login: a fresh account walks away with a working session.
    match issue_session(&pool, &state, &user).await {
        Ok(response) => (StatusCode::CREATED, Json(response)).into_response(),
        Err(err) => {
            error!("token issuance failed: {err:#}");
            AuthError::Issuance.response().into_response()
        }
    }
}
