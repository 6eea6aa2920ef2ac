//! HTTP surface: router assembly, middleware and server startup.

pub mod handlers;
pub mod openapi;

use crate::api::handlers::auth::{AuthConfig, AuthState, RevocationRegistry, TokenCache};
use anyhow::{Context, Result};
use axum::{
    body::Body,
    http::{HeaderName, HeaderValue, Method, Request, header},
    routing::get,
};
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{Span, info};
use ulid::Ulid;
use url::Url;

#[allow(dead_code)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH_SHORT {
    Some(hash) => hash,
    None => "unknown",
};

const X_REQUEST_ID: &str = "x-request-id";

#[derive(Clone, Copy)]
struct MakeRequestUlid;

impl MakeRequestId for MakeRequestUlid {
    fn make_request_id<B>(&mut self, _: &Request<B>) -> Option<RequestId> {
        let id = Ulid::new().to_string().parse().ok()?;
        Some(RequestId::new(id))
    }
}

/// Start the server and block until shutdown.
pub async fn new(
    port: u16,
    dsn: String,
    redis_url: Option<String>,
    auth_config: AuthConfig,
) -> Result<()> {
    let pool = PgPoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(5))
        .connect(&dsn)
        .await
        .context("failed to connect to the database")?;

    let cache = match &redis_url {
        Some(url) => {
            let redis_pool = deadpool_redis::Config::from_url(url)
                .create_pool(Some(deadpool_redis::Runtime::Tokio1))
                .context("failed to create redis pool")?;
            info!("token cache: redis");
            TokenCache::new_redis(redis_pool)
        }
        None => {
            info!("token cache: in-process");
            TokenCache::new_local()
        }
    };

    let registry = RevocationRegistry::new(cache, auth_config.access_token_ttl_seconds());
    let state = Arc::new(AuthState::new(auth_config, registry));
    let cors = cors_layer(state.config().frontend_url())?;

    let request_id = HeaderName::from_static(X_REQUEST_ID);
    let (router, _spec) = openapi::router();

    let app = router
        .route("/", get(handlers::root::root))
        .layer(axum::Extension(pool))
        .layer(axum::Extension(state))
        .layer(cors)
        .layer(PropagateRequestIdLayer::new(request_id.clone()))
        .layer(TraceLayer::new_for_http().make_span_with(make_span))
        .layer(SetRequestIdLayer::new(request_id, MakeRequestUlid));

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!(
        "listening on {}",
        listener.local_addr().context("failed to get local address")?
    );

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    tracing::info_span!(
        "http.request",
        method = %request.method(),
        uri = %request.uri(),
        request_id = %request_id
    )
}

/// CORS restricted to the configured frontend origin. The URL is parsed
/// properly so a typo in the flag fails startup instead of allowing nothing.
fn cors_layer(frontend_url: &str) -> Result<CorsLayer> {
    let url = Url::parse(frontend_url)
        .with_context(|| format!("invalid frontend URL: {frontend_url}"))?;

    anyhow::ensure!(
        matches!(url.scheme(), "http" | "https"),
        "frontend URL must be http or https: {frontend_url}"
    );

    let origin = url
        .origin()
        .ascii_serialization()
        .parse::<HeaderValue>()
        .with_context(|| format!("invalid frontend URL: {frontend_url}"))?;

    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to install ctrl-c handler: {err}");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => tracing::error!("failed to install SIGTERM handler: {err}"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("shutting down");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commit_hash_is_never_empty() {
        assert!(!GIT_COMMIT_HASH.is_empty());
    }

    #[test]
    fn cors_layer_accepts_a_plain_origin() {
        assert!(cors_layer("http://localhost:3000").is_ok());
        assert!(cors_layer("https://app.example.com/").is_ok());
    }

    #[test]
    fn cors_layer_rejects_garbage() {
        assert!(cors_layer("http://exa mple.com").is_err());
        assert!(cors_layer("not a url").is_err());
        assert!(cors_layer("localhost:3000").is_err());
    }

    #[test]
    fn cors_layer_rejects_non_http_schemes() {
        assert!(cors_layer("ftp://example.com").is_err());
        assert!(cors_layer("file:///tmp").is_err());
    }

    #[test]
    fn request_id_header_parses() {
        let mut make = MakeRequestUlid;
        let request = Request::builder().body(()).expect("request");
        assert!(make.make_request_id(&request).is_some());
    }
}
