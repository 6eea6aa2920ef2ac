//! OpenAPI document and route registration.

use crate::api::handlers::{auth, health};
use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};
use utoipa_axum::{router::OpenApiRouter, routes};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "sesamo",
        description = "Authentication and session lifecycle service",
        contact(name = "Team Sesamo", email = "team@sesamo.dev"),
        license(name = "BSD-3-Clause")
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Login, registration, refresh and logout"),
        (name = "sesamo", description = "Service endpoints")
    )
)]
struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

/// All documented routes plus the assembled OpenAPI document.
pub(super) fn router() -> (axum::Router, utoipa::openapi::OpenApi) {
    OpenApiRouter::with_openapi(ApiDoc::openapi())
        .routes(routes!(health::health))
        .routes(routes!(auth::login::login))
        .routes(routes!(auth::register::register))
        .routes(routes!(auth::refresh::refresh))
        .routes(routes!(auth::logout::logout))
        .routes(routes!(auth::logout::logout_all))
        .split_for_parts()
}

/// The OpenAPI document on its own, for the `openapi` binary.
#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    router().1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_endpoint() {
        let spec = openapi();
        for path in [
            "/health",
            "/auth/login",
            "/auth/register",
            "/auth/refresh",
            "/auth/logout",
            "/auth/logout-all",
        ] {
            assert!(
                spec.paths.paths.contains_key(path),
                "missing path {path}"
            );
        }
    }

    #[test]
    fn document_declares_bearer_scheme() {
        let spec = openapi();
        let components = spec.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer"));
    }

    #[test]
    fn document_carries_service_metadata() {
        let spec = openapi();
        assert_eq!(spec.info.title, "sesamo");
        assert_eq!(spec.info.version, env!("CARGO_PKG_VERSION"));
    }
}
