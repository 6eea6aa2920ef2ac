//! Credential validation with lockout and a minimum-duration floor.
//!
//! Every call to [`validate`] takes at least the configured floor (200ms by
//! default) regardless of outcome, so response timing does not reveal whether
//! an email exists, a password was close, or an account is locked.

use crate::api::handlers::auth::{
    state::AuthConfig,
    storage::{self, LoginRecord},
};
use anyhow::{Context, Result, anyhow};
use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use sqlx::PgPool;
use std::time::{Duration, Instant};
use tracing::warn;

#[derive(Debug)]
pub(super) enum CredentialOutcome {
    Valid(storage::UserRecord),
    /// Unknown email or wrong password, callers must not distinguish.
    Invalid,
    Locked {
        remaining_minutes: i64,
    },
}

/// Validate an email/password pair, maintaining the failure counter and
/// lockout window as a side effect.
pub(super) async fn validate(
    pool: &PgPool,
    config: &AuthConfig,
    email: &str,
    password: &str,
) -> Result<CredentialOutcome> {
    let started = Instant::now();
    let outcome = validate_inner(pool, config, email, password).await;
    pad_to_floor(started, Duration::from_millis(config.min_validate_ms())).await;
    outcome
}

async fn validate_inner(
    pool: &PgPool,
    config: &AuthConfig,
    email: &str,
    password: &str,
) -> Result<CredentialOutcome> {
    let Some(user) = storage::find_user_for_login(pool, email).await? else {
        // Burn a hash comparison anyway so the padded path does the same work.
        let _ = verify_password(password.to_string(), dummy_hash()).await;
        return Ok(CredentialOutcome::Invalid);
    };

    let now = Utc::now();
    let mut attempts = user.failed_login_attempts;

    if let Some(locked_until) = user.locked_until {
        if now < locked_until {
            return Ok(CredentialOutcome::Locked {
                remaining_minutes: remaining_lockout_minutes(locked_until, now),
            });
        }
        // Window elapsed, the slate is clean before this attempt is judged.
        storage::reset_failed_attempts(pool, user.id).await?;
        attempts = 0;
    }

    if verify_password(password.to_string(), user.password_hash.clone()).await? {
        if attempts > 0 {
            storage::reset_failed_attempts(pool, user.id).await?;
        }
        return Ok(CredentialOutcome::Valid(user.user()));
    }

    record_failure(pool, config, &user, attempts, now).await
}

async fn record_failure(
    pool: &PgPool,
    config: &AuthConfig,
    user: &LoginRecord,
    attempts: i32,
    now: DateTime<Utc>,
) -> Result<CredentialOutcome> {
    let (attempts, locked_until) = after_failed_attempt(
        attempts,
        config.lockout_threshold(),
        now,
        config.lockout_duration_seconds(),
    );

    storage::record_failed_attempt(pool, user.id, attempts, locked_until).await?;

    if let Some(locked_until) = locked_until {
        warn!(
            user_id = %user.id,
            attempts,
            "account locked after repeated failed logins"
        );
        return Ok(CredentialOutcome::Locked {
            remaining_minutes: remaining_lockout_minutes(locked_until, now),
        });
    }

    Ok(CredentialOutcome::Invalid)
}

/// Counter and lock state after one more failed attempt. The lock engages
/// exactly when the new count reaches the threshold, never before.
fn after_failed_attempt(
    attempts_before: i32,
    threshold: i32,
    now: DateTime<Utc>,
    lockout_seconds: i64,
) -> (i32, Option<DateTime<Utc>>) {
    let attempts = attempts_before + 1;
    if attempts >= threshold {
        (
            attempts,
            Some(now + ChronoDuration::seconds(lockout_seconds)),
        )
    } else {
        (attempts, None)
    }
}

/// Hash a password for storage. Runs on the blocking pool, Argon2 is CPU
/// bound.
pub(super) async fn hash_password(password: String) -> Result<String> {
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|err| anyhow!("failed to hash password: {err}"))
    })
    .await
    .context("password hashing task failed")?
}

async fn verify_password(password: String, stored_hash: String) -> Result<bool> {
    tokio::task::spawn_blocking(move || match PasswordHash::new(&stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(err) => {
            warn!("stored password hash is unparsable: {err}");
            false
        }
    })
    .await
    .context("password verification task failed")
}

/// A throwaway hash compared against when the email does not exist, so the
/// unknown-email path costs the same as a wrong password.
fn dummy_hash() -> String {
    "$argon2id$v=19$m=19456,t=2,p=1$YXV0aGR1bW15c2FsdA$\
     L7ZTanFPzfGPc2UQsV5H0dWkbL4GGlyUz1w0L8P0vXo"
        .to_string()
}

/// Minutes until `locked_until`, rounded up so "1 minute" never reads as 0.
fn remaining_lockout_minutes(locked_until: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let seconds = (locked_until - now).num_seconds().max(0);
    (seconds + 59) / 60
}

/// Sleep until at least `floor` has passed since `started`.
async fn pad_to_floor(started: Instant, floor: Duration) {
    let elapsed = started.elapsed();
    if elapsed < floor {
        tokio::time::sleep(floor - elapsed).await;
    }
}
