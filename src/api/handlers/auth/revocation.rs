//! Access-token revocation registry.
//!
//! Revoked access tokens live in a TTL'd blacklist keyed by the raw token.
//! Next to it sits a per-user index of outstanding access tokens, which lets
//! logout-all blacklist every session at once. The index is advisory: if a
//! write to it fails the caller only loses bulk revocation for that token,
//! so index writes degrade instead of failing the request.
//!
//! The cache runs either in-process (DashMap) or on Redis, selected at
//! startup. Keys and values are identical in both so the choice is invisible
//! to callers.

use anyhow::{Context, Result};
use dashmap::DashMap;
use redis::AsyncCommands;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::warn;
use uuid::Uuid;

const REVOKED_KEY_PREFIX: &str = "revoked:";
const USER_TOKENS_KEY_PREFIX: &str = "user-tokens:";

#[derive(Debug, Clone)]
pub(crate) struct CachedEntry {
    value: String,
    stored_at: Instant,
    ttl: Duration,
}

impl CachedEntry {
    fn is_expired(&self) -> bool {
        self.stored_at.elapsed() >= self.ttl
    }
}

/// Key/value store with per-key TTLs, in-process or Redis-backed.
#[derive(Clone)]
pub(crate) enum TokenCache {
    Local(Arc<DashMap<String, CachedEntry>>),
    Redis(deadpool_redis::Pool),
}

impl TokenCache {
    pub(crate) fn new_local() -> Self {
        Self::Local(Arc::new(DashMap::new()))
    }

    pub(crate) fn new_redis(pool: deadpool_redis::Pool) -> Self {
        Self::Redis(pool)
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<()> {
        match self {
            Self::Local(map) => {
                map.insert(
                    key.to_string(),
                    CachedEntry {
                        value: value.to_string(),
                        stored_at: Instant::now(),
                        ttl: Duration::from_secs(ttl_seconds),
                    },
                );
                Ok(())
            }
            Self::Redis(pool) => {
                let mut conn = pool.get().await.context("failed to get redis connection")?;
                conn.set_ex::<_, _, ()>(key, value, ttl_seconds)
                    .await
                    .context("redis SETEX failed")?;
                Ok(())
            }
        }
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        match self {
            Self::Local(map) => {
                if let Some(entry) = map.get(key) {
                    if !entry.is_expired() {
                        return Ok(Some(entry.value.clone()));
                    }
                }
                // Expired entries are dropped lazily on read.
                map.remove_if(key, |_, entry| entry.is_expired());
                Ok(None)
            }
            Self::Redis(pool) => {
                let mut conn = pool.get().await.context("failed to get redis connection")?;
                conn.get::<_, Option<String>>(key)
                    .await
                    .context("redis GET failed")
            }
        }
    }

    async fn del(&self, key: &str) -> Result<()> {
        match self {
            Self::Local(map) => {
                map.remove(key);
                Ok(())
            }
            Self::Redis(pool) => {
                let mut conn = pool.get().await.context("failed to get redis connection")?;
                conn.del::<_, ()>(key).await.context("redis DEL failed")?;
                Ok(())
            }
        }
    }
}

/// Whether an advisory index write made it to the cache.
#[derive(Debug, PartialEq, Eq)]
pub(super) enum TrackingOutcome {
    Tracked,
    /// The cache write failed; bulk revocation will miss this token until it
    /// expires on its own.
    Degraded,
}

/// Blacklist plus per-user token index on top of a [`TokenCache`].
pub(crate) struct RevocationRegistry {
    cache: TokenCache,
    /// TTL for blacklist and index entries when the caller has no better
    /// bound, matches the access-token lifetime.
    default_ttl_seconds: i64,
}

impl RevocationRegistry {
    pub(crate) fn new(cache: TokenCache, default_ttl_seconds: i64) -> Self {
        Self {
            cache,
            default_ttl_seconds,
        }
    }

    /// Blacklist a single access token for `remaining_seconds`.
    ///
    /// Idempotent. A token with no remaining lifetime needs no entry, it is
    /// already rejected by signature verification.
    pub(super) async fn revoke_token(&self, token: &str, remaining_seconds: i64) -> Result<()> {
        if remaining_seconds <= 0 {
            return Ok(());
        }
        self.cache
            .set_ex(
                &format!("{REVOKED_KEY_PREFIX}{token}"),
                "revoked",
                remaining_seconds as u64,
            )
            .await
    }

    /// Check whether a token has been revoked. Errors propagate so callers
    /// can fail closed.
    pub(crate) async fn is_revoked(&self, token: &str) -> Result<bool> {
        let entry = self.cache.get(&format!("{REVOKED_KEY_PREFIX}{token}")).await?;
        Ok(entry.is_some())
    }

    /// Add a freshly issued access token to the user's index.
    pub(super) async fn track_token(&self, user_id: Uuid, token: &str) -> TrackingOutcome {
        let update = self
            .update_index(user_id, |tokens| {
                if !tokens.iter().any(|existing| existing == token) {
                    tokens.push(token.to_string());
                }
            })
            .await;

        match update {
            Ok(()) => TrackingOutcome::Tracked,
            Err(err) => {
                warn!(user_id = %user_id, "failed to track access token: {err:#}");
                TrackingOutcome::Degraded
            }
        }
    }

    /// Drop a token from the user's index after it was individually revoked.
    pub(super) async fn untrack_token(&self, user_id: Uuid, token: &str) -> TrackingOutcome {
        match self
            .update_index(user_id, |tokens| {
                tokens.retain(|existing| existing != token);
            })
            .await
        {
            Ok(()) => TrackingOutcome::Tracked,
            Err(err) => {
                warn!(user_id = %user_id, "failed to untrack access token: {err:#}");
                TrackingOutcome::Degraded
            }
        }
    }

    /// Blacklist every indexed access token for a user and clear the index.
    /// Returns how many tokens were blacklisted.
    pub(super) async fn revoke_all_for_user(&self, user_id: Uuid) -> Result<usize> {
        let index_key = format!("{USER_TOKENS_KEY_PREFIX}{user_id}");
        let tokens = match self.cache.get(&index_key).await? {
            Some(raw) => serde_json::from_str::<Vec<String>>(&raw)
                .context("user token index holds invalid JSON")?,
            None => Vec::new(),
        };

        for token in &tokens {
            self.revoke_token(token, self.default_ttl_seconds).await?;
        }

        self.cache.del(&index_key).await?;
        Ok(tokens.len())
    }

    async fn update_index(
        &self,
        user_id: Uuid,
        mutate: impl FnOnce(&mut Vec<String>),
    ) -> Result<()> {
        let index_key = format!("{USER_TOKENS_KEY_PREFIX}{user_id}");
        let mut tokens = match self.cache.get(&index_key).await? {
            Some(raw) => serde_json::from_str::<Vec<String>>(&raw).unwrap_or_default(),
            None => Vec::new(),
        };

        mutate(&mut tokens);

        if tokens.is_empty() {
            self.cache.del(&index_key).await
        } else {
            let raw = serde_json::to_string(&tokens).context("failed to encode token index")?;
            self.cache
                .set_ex(&index_key, &raw, self.default_ttl_seconds.max(1) as u64)
                .await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> RevocationRegistry {
        RevocationRegistry::new(TokenCache::new_local(), 900)
    }

    #[test]
    fn entry_with_zero_ttl_is_expired_immediately() {
        let entry = CachedEntry {
            value: "revoked".to_string(),
            stored_at: Instant::now(),
            ttl: Duration::ZERO,
        };
        assert!(entry.is_expired());
    }

    #[test]
    fn entry_within_ttl_is_live() {
        let entry = CachedEntry {
            value: "revoked".to_string(),
            stored_at: Instant::now(),
            ttl: Duration::from_secs(60),
        };
        assert!(!entry.is_expired());
    }

    #[tokio::test]
    async fn revoked_token_is_reported_revoked() {
        let registry = registry();
        registry.revoke_token("token-a", 60).await.expect("revoke");

        assert!(registry.is_revoked("token-a").await.expect("check"));
        assert!(!registry.is_revoked("token-b").await.expect("check"));
    }

    #[tokio::test]
    async fn revoking_twice_is_idempotent() {
        let registry = registry();
        registry.revoke_token("token-a", 60).await.expect("revoke");
        registry.revoke_token("token-a", 60).await.expect("revoke");
        assert!(registry.is_revoked("token-a").await.expect("check"));
    }

    #[tokio::test]
    async fn token_with_no_remaining_life_needs_no_entry() {
        let registry = registry();
        registry.revoke_token("token-a", 0).await.expect("revoke");
        assert!(!registry.is_revoked("token-a").await.expect("check"));
    }

    #[tokio::test]
    async fn expired_blacklist_entry_reads_as_not_revoked() {
        let registry = registry();
        registry.revoke_token("token-a", 1).await.expect("revoke");
        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert!(!registry.is_revoked("token-a").await.expect("check"));
    }

    #[tokio::test]
    async fn revoke_all_blacklists_every_tracked_token() {
        let registry = registry();
        let user_id = Uuid::new_v4();

        assert_eq!(
            registry.track_token(user_id, "token-a").await,
            TrackingOutcome::Tracked
        );
        assert_eq!(
            registry.track_token(user_id, "token-b").await,
            TrackingOutcome::Tracked
        );

        let revoked = registry.revoke_all_for_user(user_id).await.expect("revoke all");
        assert_eq!(revoked, 2);
        assert!(registry.is_revoked("token-a").await.expect("check"));
        assert!(registry.is_revoked("token-b").await.expect("check"));

        // Index is cleared, a second sweep finds nothing.
        assert_eq!(
            registry.revoke_all_for_user(user_id).await.expect("revoke all"),
            0
        );
    }

    #[tokio::test]
    async fn tracking_is_deduplicated() {
        let registry = registry();
        let user_id = Uuid::new_v4();

        registry.track_token(user_id, "token-a").await;
        registry.track_token(user_id, "token-a").await;

        assert_eq!(
            registry.revoke_all_for_user(user_id).await.expect("revoke all"),
            1
        );
    }

    #[tokio::test]
    async fn untrack_removes_only_the_named_token() {
        let registry = registry();
        let user_id = Uuid::new_v4();

        registry.track_token(user_id, "token-a").await;
        registry.track_token(user_id, "token-b").await;
        registry.untrack_token(user_id, "token-a").await;

        assert_eq!(
            registry.revoke_all_for_user(user_id).await.expect("revoke all"),
            1
        );
        assert!(!registry.is_revoked("token-a").await.expect("check"));
        assert!(registry.is_revoked("token-b").await.expect("check"));
    }

    #[tokio::test]
    async fn revoke_all_for_unknown_user_is_a_noop() {
        let registry = registry();
        assert_eq!(
            registry
                .revoke_all_for_user(Uuid::new_v4())
                .await
                .expect("revoke all"),
            0
        );
    }
}
