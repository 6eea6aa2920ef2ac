//! POST /auth/logout and POST /auth/logout-all

use crate::api::handlers::auth::{
    guard, state::AuthState, storage, types::MessageResponse,
};
use axum::{
    Extension, Json,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use chrono::Utc;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::error;

#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 200, description = "Presented access token revoked", body = MessageResponse),
        (status = 401, description = "Missing, invalid, expired or revoked token"),
        (status = 500, description = "Revocation failed"),
    ),
    security(("bearer" = [])),
    tag = "auth"
)]
pub async fn logout(
    Extension(state): Extension<Arc<AuthState>>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let principal = match guard::authenticate_bearer(&headers, &state).await {
        Ok(principal) => principal,
        Err(rejection) => return rejection.into_response(),
    };

    // Blacklist only for the token's remaining life, after that signature
    // verification rejects it anyway.
    let remaining_seconds = principal.expires_at - Utc::now().timestamp();
    if let Err(err) = state
        .registry()
        .revoke_token(&principal.token, remaining_seconds)
        .await
    {
        error!("failed to revoke access token: {err:#}");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Logout failed".to_string(),
        )
            .into_response();
    }

    // Index cleanup is advisory, a failure here is logged and absorbed.
    let _ = state
        .registry()
        .untrack_token(principal.user_id, &principal.token)
        .await;

    (
        StatusCode::OK,
        Json(MessageResponse::new("Logout successful")),
    )
        .into_response()
}

#[utoipa::path(
    post,
    path = "/auth/logout-all",
    responses(
        (status = 200, description = "Every session for the user revoked", body = MessageResponse),
        (status = 401, description = "Missing, invalid, expired or revoked token"),
        (status = 500, description = "Revocation failed"),
    ),
    security(("bearer" = [])),
    tag = "auth"
)]
pub async fn logout_all(
    Extension(pool): Extension<PgPool>,
    Extension(state): Extension<Arc<AuthState>>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let principal = match guard::authenticate_bearer(&headers, &state).await {
        Ok(principal) => principal,
        Err(rejection) => return rejection.into_response(),
    };

    if let Err(err) = state.registry().revoke_all_for_user(principal.user_id).await {
        error!("failed to revoke indexed access tokens: {err:#}");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Logout failed".to_string(),
        )
            .into_response();
    }

    // The index may have missed tokens issued while the cache was degraded;
    // make sure the one in hand is dead regardless.
    let remaining_seconds = principal.expires_at - Utc::now().timestamp();
    if let Err(err) = state
        .registry()
        .revoke_token(&principal.token, remaining_seconds)
        .await
    {
        error!("failed to revoke access token: {err:#}");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Logout failed".to_string(),
        )
            .into_response();
    }

    if let Err(err) = storage::revoke_all_refresh_tokens(&pool, principal.user_id).await {
        error!("failed to revoke refresh tokens: {err:#}");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Logout failed".to_string(),
        )
            .into_response();
    }

    (
        StatusCode::OK,
        Json(MessageResponse::new("Logged out from all devices")),
    )
        .into_response()
}
