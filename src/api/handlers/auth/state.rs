//! Auth configuration and shared per-request state.

use crate::api::handlers::auth::{revocation::RevocationRegistry, tokens::JwtSigner};
use secrecy::SecretString;

pub const DEFAULT_ACCESS_TOKEN_TTL_SECONDS: i64 = 15 * 60;
pub const DEFAULT_REFRESH_TOKEN_TTL_SECONDS: i64 = 7 * 24 * 60 * 60;
pub const DEFAULT_LOCKOUT_THRESHOLD: i32 = 5;
pub const DEFAULT_LOCKOUT_DURATION_SECONDS: i64 = 30 * 60;
pub const DEFAULT_MIN_VALIDATE_MS: u64 = 200;

/// Tunables for credential validation and token issuance.
///
/// The signing secret has no default, the server refuses to start without
/// one. Everything else falls back to sane production values.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    signing_secret: SecretString,
    frontend_url: String,
    access_token_ttl_seconds: i64,
    refresh_token_ttl_seconds: i64,
    lockout_threshold: i32,
    lockout_duration_seconds: i64,
    min_validate_ms: u64,
}

impl AuthConfig {
    pub fn new(signing_secret: SecretString, frontend_url: String) -> Self {
        Self {
            signing_secret,
            frontend_url,
            access_token_ttl_seconds: DEFAULT_ACCESS_TOKEN_TTL_SECONDS,
            refresh_token_ttl_seconds: DEFAULT_REFRESH_TOKEN_TTL_SECONDS,
            lockout_threshold: DEFAULT_LOCKOUT_THRESHOLD,
            lockout_duration_seconds: DEFAULT_LOCKOUT_DURATION_SECONDS,
            min_validate_ms: DEFAULT_MIN_VALIDATE_MS,
        }
    }

    #[must_use]
    pub fn with_access_token_ttl_seconds(mut self, seconds: i64) -> Self {
        self.access_token_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_refresh_token_ttl_seconds(mut self, seconds: i64) -> Self {
        self.refresh_token_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_lockout_threshold(mut self, attempts: i32) -> Self {
        self.lockout_threshold = attempts;
        self
    }

    #[must_use]
    pub fn with_lockout_duration_seconds(mut self, seconds: i64) -> Self {
        self.lockout_duration_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_min_validate_ms(mut self, millis: u64) -> Self {
        self.min_validate_ms = millis;
        self
    }

    pub(crate) fn signing_secret(&self) -> &SecretString {
        &self.signing_secret
    }

    pub(crate) fn frontend_url(&self) -> &str {
        &self.frontend_url
    }

    pub(crate) fn access_token_ttl_seconds(&self) -> i64 {
        self.access_token_ttl_seconds
    }

    pub(crate) fn refresh_token_ttl_seconds(&self) -> i64 {
        self.refresh_token_ttl_seconds
    }

    pub(crate) fn lockout_threshold(&self) -> i32 {
        self.lockout_threshold
    }

    pub(crate) fn lockout_duration_seconds(&self) -> i64 {
        self.lockout_duration_seconds
    }

    pub(crate) fn min_validate_ms(&self) -> u64 {
        self.min_validate_ms
    }
}

/// Shared auth state, one instance for the lifetime of the server.
pub struct AuthState {
    config: AuthConfig,
    signer: JwtSigner,
    registry: RevocationRegistry,
}

impl AuthState {
    pub(crate) fn new(config: AuthConfig, registry: RevocationRegistry) -> Self {
        let signer = JwtSigner::new(
            config.signing_secret(),
            config.access_token_ttl_seconds(),
        );
        Self {
            config,
            signer,
            registry,
        }
    }

    pub(crate) fn config(&self) -> &AuthConfig {
        &self.config
    }

    pub(crate) fn signer(&self) -> &JwtSigner {
        &self.signer
    }

    pub(crate) fn registry(&self) -> &RevocationRegistry {
        &self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AuthConfig {
        AuthConfig::new(
            SecretString::from("test-secret"),
            "http://localhost:3000".to_string(),
        )
    }

    #[test]
    fn defaults_match_documented_values() {
        let config = config();
        assert_eq!(config.access_token_ttl_seconds(), 900);
        assert_eq!(config.refresh_token_ttl_seconds(), 604_800);
        assert_eq!(config.lockout_threshold(), 5);
        assert_eq!(config.lockout_duration_seconds(), 1800);
        assert_eq!(config.min_validate_ms(), 200);
    }

    #[test]
    fn builders_override_defaults() {
        let config = config()
            .with_access_token_ttl_seconds(60)
            .with_refresh_token_ttl_seconds(120)
            .with_lockout_threshold(3)
            .with_lockout_duration_seconds(300)
            .with_min_validate_ms(0);
        assert_eq!(config.access_token_ttl_seconds(), 60);
        assert_eq!(config.refresh_token_ttl_seconds(), 120);
        assert_eq!(config.lockout_threshold(), 3);
        assert_eq!(config.lockout_duration_seconds(), 300);
        assert_eq!(config.min_validate_ms(), 0);
    }

    #[test]
    fn debug_does_not_leak_the_signing_secret() {
        let formatted = format!("{:?}", config());
        assert!(!formatted.contains("test-secret"));
    }
}
