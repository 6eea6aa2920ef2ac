use crate::api::{GIT_COMMIT_HASH, handlers::auth::AuthState};
use axum::{Extension, Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::instrument::Instrument;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct Health {
    name: String,
    version: String,
    commit: String,
    database: bool,
    cache: bool,
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Database and token cache reachable", body = Health),
        (status = 503, description = "A dependency is unreachable", body = Health),
    ),
    tag = "sesamo"
)]
pub async fn health(
    Extension(pool): Extension<PgPool>,
    Extension(state): Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    let database = ping_database(&pool).await;
    // Any cache read doubles as a liveness probe.
    let cache = state.registry().is_revoked("health-probe").await.is_ok();

    let health = Health {
        name: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        commit: GIT_COMMIT_HASH.to_string(),
        database,
        cache,
    };

    let status = if database && cache {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(health))
}

async fn ping_database(pool: &PgPool) -> bool {
    let query = "SELECT 1";

    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );

    sqlx::query(query)
        .execute(pool)
        .instrument(span)
        .await
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_serializes_flat_fields() {
        let health = Health {
            name: "sesamo".to_string(),
            version: "0.1.0".to_string(),
            commit: "abc1234".to_string(),
            database: true,
            cache: false,
        };

        let value = serde_json::to_value(&health).expect("serialize");
        assert_eq!(value["name"], "sesamo");
        assert_eq!(value["database"], true);
        assert_eq!(value["cache"], false);
    }
}
