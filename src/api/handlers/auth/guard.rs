//! Bearer-token guard for protected endpoints.

use crate::api::handlers::auth::{error::AuthError, state::AuthState, utils};
use axum::http::{HeaderMap, StatusCode};
use tracing::error;
use uuid::Uuid;

/// The authenticated caller of a protected endpoint.
#[derive(Debug)]
pub(super) struct Principal {
    pub user_id: Uuid,
    pub token: String,
    /// Expiry of the presented token, unix seconds.
    pub expires_at: i64,
}

/// Authenticate a request from its `Authorization` header.
///
/// Rejects missing/malformed headers, bad signatures, expired tokens and
/// blacklisted tokens with a uniform 401. A cache failure while checking the
/// blacklist fails closed with a 503, an unreachable registry must not let
/// revoked tokens back in.
pub(super) async fn authenticate_bearer(
    headers: &HeaderMap,
    state: &AuthState,
) -> Result<Principal, (StatusCode, String)> {
    let Some(token) = utils::extract_bearer_token(headers) else {
        return Err(AuthError::Unauthorized.response());
    };

    let claims = state
        .signer()
        .verify(&token)
        .map_err(|_| AuthError::Unauthorized.response())?;

    match state.registry().is_revoked(&token).await {
        Ok(false) => {}
        Ok(true) => return Err(AuthError::Unauthorized.response()),
        Err(err) => {
            error!("revocation check failed: {err:#}");
            return Err((
                StatusCode::SERVICE_UNAVAILABLE,
                "Authentication temporarily unavailable".to_string(),
            ));
        }
    }

    let user_id = claims
        .sub
        .parse::<Uuid>()
        .map_err(|_| AuthError::Unauthorized.response())?;

    Ok(Principal {
        user_id,
        token,
        expires_at: claims.exp,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::handlers::auth::{
        revocation::{RevocationRegistry, TokenCache},
        state::AuthConfig,
        storage::UserRecord,
    };
    use axum::http::HeaderValue;
    use axum::http::header::AUTHORIZATION;
    use secrecy::SecretString;

    fn state() -> AuthState {
        let config = AuthConfig::new(
            SecretString::from("guard-test-secret"),
            "http://localhost:3000".to_string(),
        );
        let registry = RevocationRegistry::new(TokenCache::new_local(), 900);
        AuthState::new(config, registry)
    }

    fn signed_token(state: &AuthState, user_id: Uuid) -> String {
        state
            .signer()
            .sign(&UserRecord {
                id: user_id,
                email: "alice@example.com".to_string(),
                role: "student".to_string(),
            })
            .expect("sign")
    }

    fn bearer(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).expect("header"),
        );
        headers
    }

    #[tokio::test]
    async fn valid_token_yields_principal() {
        let state = state();
        let user_id = Uuid::new_v4();
        let token = signed_token(&state, user_id);

        let principal = authenticate_bearer(&bearer(&token), &state)
            .await
            .expect("authenticated");
        assert_eq!(principal.user_id, user_id);
        assert_eq!(principal.token, token);
        assert!(principal.expires_at > 0);
    }

    #[tokio::test]
    async fn missing_header_is_401() {
        let state = state();
        let err = authenticate_bearer(&HeaderMap::new(), &state)
            .await
            .expect_err("rejected");
        assert_eq!(err.0, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn garbage_token_is_401() {
        let state = state();
        let err = authenticate_bearer(&bearer("garbage"), &state)
            .await
            .expect_err("rejected");
        assert_eq!(err.0, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn revoked_token_is_401() {
        let state = state();
        let token = signed_token(&state, Uuid::new_v4());
        state
            .registry()
            .revoke_token(&token, 900)
            .await
            .expect("revoke");

        let err = authenticate_bearer(&bearer(&token), &state)
            .await
            .expect_err("rejected");
        assert_eq!(err.0, StatusCode::UNAUTHORIZED);
    }
}
