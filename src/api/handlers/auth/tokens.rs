//! Access-token signing and token-pair issuance.
//!
//! Access tokens are short-lived HS256 JWTs carrying the user id, email and
//! role. Refresh tokens are opaque random secrets, stored hashed and handed
//! out exactly once per issuance.

use crate::api::handlers::auth::{
    state::AuthConfig,
    storage::{self, UserRecord},
    utils,
};
use anyhow::{Context, Result};
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sqlx::{Postgres, Transaction};

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct AccessClaims {
    /// User id as a string.
    pub sub: String,
    pub email: String,
    pub role: String,
    pub iat: i64,
    pub exp: i64,
}

/// Signs and verifies access tokens with a single symmetric key.
pub(crate) struct JwtSigner {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl_seconds: i64,
}

impl JwtSigner {
    pub(crate) fn new(secret: &SecretString, ttl_seconds: i64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // No leeway: a token that expires at second N is rejected at second N.
        validation.leeway = 0;
        Self {
            encoding: EncodingKey::from_secret(secret.expose_secret().as_bytes()),
            decoding: DecodingKey::from_secret(secret.expose_secret().as_bytes()),
            validation,
            ttl_seconds,
        }
    }

    pub(crate) fn sign(&self, user: &UserRecord) -> Result<String> {
        let now = Utc::now().timestamp();
        let claims = AccessClaims {
            sub: user.id.to_string(),
            email: user.email.clone(),
            role: user.role.clone(),
            iat: now,
            exp: now + self.ttl_seconds,
        };
        jsonwebtoken::encode(&Header::default(), &claims, &self.encoding)
            .context("failed to sign access token")
    }

    pub(crate) fn verify(&self, token: &str) -> Result<AccessClaims> {
        let data = jsonwebtoken::decode::<AccessClaims>(token, &self.decoding, &self.validation)
            .context("failed to verify access token")?;
        Ok(data.claims)
    }
}

/// A freshly issued token pair plus the user it belongs to.
pub(crate) struct IssuedTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub user: UserRecord,
}

/// Issue a new access/refresh pair for `user` inside `tx`.
///
/// The refresh-token row is written before the transaction commits, so a
/// refresh token is never returned to a client without a matching persisted
/// hash.
pub(super) async fn issue(
    tx: &mut Transaction<'_, Postgres>,
    signer: &JwtSigner,
    config: &AuthConfig,
    user: &UserRecord,
) -> Result<IssuedTokens> {
    let access_token = signer.sign(user)?;
    let refresh_token = utils::generate_refresh_secret()?;
    let token_hash = utils::hash_refresh_token(&refresh_token);

    storage::insert_refresh_token(tx, user.id, &token_hash, config.refresh_token_ttl_seconds())
        .await?;

    Ok(IssuedTokens {
        access_token,
        refresh_token,
        user: user.clone(),
    })
}
