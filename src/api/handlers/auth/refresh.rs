//! POST /auth/refresh

use crate::api::handlers::auth::{
    error::AuthError,
    rotation::{self, RotationOutcome},
    state::AuthState,
    types::{RefreshRequest, TokenResponse},
};
use axum::{Extension, Json, http::StatusCode, response::IntoResponse};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{error, warn};

#[utoipa::path(
    post,
    path = "/auth/refresh",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "Token rotated, new pair issued", body = TokenResponse),
        (status = 400, description = "Missing or malformed payload"),
        (status = 401, description = "Unknown, expired or already-used refresh token"),
        (status = 500, description = "Rotation failed"),
    ),
    tag = "auth"
)]
pub async fn refresh(
    Extension(pool): Extension<PgPool>,
    Extension(state): Extension<Arc<AuthState>>,
    payload: Option<Json<RefreshRequest>>,
) -> impl IntoResponse {
    let Some(Json(request)) = payload else {
        return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response();
    };

    let presented = request.refresh_token.trim();
    if presented.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            "Missing refresh token".to_string(),
        )
            .into_response();
    }

    match rotation::rotate(&pool, &state, presented).await {
        Ok(RotationOutcome::Rotated(issued)) => {
            // Index the replacement access token for bulk revocation.
            let _ = state
                .registry()
                .track_token(issued.user.id, &issued.access_token)
                .await;
            (StatusCode::OK, Json(TokenResponse::from(issued))).into_response()
        }

        // All rejection reasons collapse into one message, a caller probing
        // with stolen tokens learns nothing from the response.
        Ok(RotationOutcome::NotFound) | Ok(RotationOutcome::Expired) => {
            AuthError::InvalidRefreshToken.response().into_response()
        }
        Ok(RotationOutcome::ReusedAndPurged { user_id }) => {
            warn!(user_id = %user_id, "refresh token reuse rejected");
            AuthError::InvalidRefreshToken.response().into_response()
        }

        Err(err) => {
            error!("refresh rotation failed: {err:#}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Could not refresh session".to_string(),
            )
                .into_response()
        }
    }
}
