//! Persistence layer for users and refresh tokens.
//!
//! Every query runs under a `db.query` span so statements show up in traces.
//! Refresh-token rows are flagged `revoked` instead of deleted, a presented
//! hash therefore always resolves to a row with history, which is what makes
//! reuse detection possible.

use crate::api::handlers::auth::utils::is_unique_violation;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::instrument::Instrument;
use uuid::Uuid;

/// The public identity of a user, safe to embed in responses and claims.
#[derive(Debug, Clone)]
pub(crate) struct UserRecord {
    pub id: Uuid,
    pub email: String,
    pub role: String,
}

/// Everything credential validation needs about a user.
#[derive(Debug)]
pub(super) struct LoginRecord {
    pub id: Uuid,
    pub email: String,
    pub role: String,
    pub password_hash: String,
    pub failed_login_attempts: i32,
    pub locked_until: Option<DateTime<Utc>>,
}

impl LoginRecord {
    pub(super) fn user(&self) -> UserRecord {
        UserRecord {
            id: self.id,
            email: self.email.clone(),
            role: self.role.clone(),
        }
    }
}

/// A refresh-token row joined with its owner, locked for update.
#[derive(Debug)]
pub(super) struct RefreshRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
    pub revoked: bool,
    pub email: String,
    pub role: String,
}

impl RefreshRecord {
    pub(super) fn user(&self) -> UserRecord {
        UserRecord {
            id: self.user_id,
            email: self.email.clone(),
            role: self.role.clone(),
        }
    }
}

pub(super) enum InsertUserOutcome {
    Created(UserRecord),
    EmailTaken,
}

pub(super) async fn find_user_for_login(
    pool: &PgPool,
    email: &str,
) -> Result<Option<LoginRecord>> {
    let query = "SELECT id, email, role, password_hash, failed_login_attempts, locked_until \
                 FROM users WHERE email = $1";

    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );

    let row = sqlx::query(query)
        .bind(email)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to query user by email")?;

    row.map(|row| {
        Ok::<_, sqlx::Error>(LoginRecord {
            id: row.try_get("id")?,
            email: row.try_get("email")?,
            role: row.try_get("role")?,
            password_hash: row.try_get("password_hash")?,
            failed_login_attempts: row.try_get("failed_login_attempts")?,
            locked_until: row.try_get("locked_until")?,
        })
    })
    .transpose()
    .context("failed to decode user row")
}

pub(super) async fn insert_user(
    tx: &mut Transaction<'_, Postgres>,
    email: &str,
    password_hash: &str,
    name: Option<&str>,
) -> Result<InsertUserOutcome> {
    let query = "INSERT INTO users (email, password_hash, name) VALUES ($1, $2, $3) \
                 RETURNING id, email, role";

    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );

    let result = sqlx::query(query)
        .bind(email)
        .bind(password_hash)
        .bind(name)
        .fetch_one(&mut **tx)
        .instrument(span)
        .await;

    match result {
        Ok(row) => Ok(InsertUserOutcome::Created(UserRecord {
            id: row.try_get("id").context("failed to decode user row")?,
            email: row.try_get("email").context("failed to decode user row")?,
            role: row.try_get("role").context("failed to decode user row")?,
        })),
        Err(err) if is_unique_violation(&err) => Ok(InsertUserOutcome::EmailTaken),
        Err(err) => Err(err).context("failed to insert user"),
    }
}

pub(super) async fn reset_failed_attempts(pool: &PgPool, user_id: Uuid) -> Result<()> {
    let query = "UPDATE users SET failed_login_attempts = 0, locked_until = NULL, \
                 updated_at = now() WHERE id = $1";

    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );

    sqlx::query(query)
        .bind(user_id)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to reset failed login attempts")?;

    Ok(())
}

/// Record a failed attempt, optionally locking the account.
pub(super) async fn record_failed_attempt(
    pool: &PgPool,
    user_id: Uuid,
    attempts: i32,
    locked_until: Option<DateTime<Utc>>,
) -> Result<()> {
    let query = "UPDATE users SET failed_login_attempts = $2, locked_until = $3, \
                 updated_at = now() WHERE id = $1";

    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );

    sqlx::query(query)
        .bind(user_id)
        .bind(attempts)
        .bind(locked_until)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to record failed login attempt")?;

    Ok(())
}

pub(super) async fn insert_refresh_token(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    token_hash: &[u8],
    ttl_seconds: i64,
) -> Result<()> {
    let query = "INSERT INTO refresh_tokens (user_id, token_hash, expires_at) \
                 VALUES ($1, $2, now() + make_interval(secs => $3))";

    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );

    sqlx::query(query)
        .bind(user_id)
        .bind(token_hash)
        .bind(ttl_seconds as f64)
        .execute(&mut **tx)
        .instrument(span)
        .await
        .context("failed to insert refresh token")?;

    Ok(())
}

/// Find a refresh token by hash and lock the row for the rest of `tx`.
///
/// The row lock serializes concurrent presentations of the same token, only
/// one caller at a time can observe and flip its `revoked` flag.
pub(super) async fn find_refresh_token_for_update(
    tx: &mut Transaction<'_, Postgres>,
    token_hash: &[u8],
) -> Result<Option<RefreshRecord>> {
    let query = "SELECT refresh_tokens.id, refresh_tokens.user_id, refresh_tokens.expires_at, \
                 refresh_tokens.revoked, users.email, users.role \
                 FROM refresh_tokens JOIN users ON users.id = refresh_tokens.user_id \
                 WHERE refresh_tokens.token_hash = $1 FOR UPDATE OF refresh_tokens";

    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );

    let row = sqlx::query(query)
        .bind(token_hash)
        .fetch_optional(&mut **tx)
        .instrument(span)
        .await
        .context("failed to query refresh token")?;

    row.map(|row| {
        Ok::<_, sqlx::Error>(RefreshRecord {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            expires_at: row.try_get("expires_at")?,
            revoked: row.try_get("revoked")?,
            email: row.try_get("email")?,
            role: row.try_get("role")?,
        })
    })
    .transpose()
    .context("failed to decode refresh token row")
}

pub(super) async fn revoke_refresh_token(
    tx: &mut Transaction<'_, Postgres>,
    token_id: Uuid,
) -> Result<()> {
    let query = "UPDATE refresh_tokens SET revoked = TRUE WHERE id = $1";

    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );

    sqlx::query(query)
        .bind(token_id)
        .execute(&mut **tx)
        .instrument(span)
        .await
        .context("failed to revoke refresh token")?;

    Ok(())
}

/// Revoke every live refresh token a user holds. Returns the number of rows
/// touched. Works on a pool or inside a transaction.
pub(super) async fn revoke_all_refresh_tokens<'e>(
    executor: impl sqlx::PgExecutor<'e>,
    user_id: Uuid,
) -> Result<u64> {
    let query = "UPDATE refresh_tokens SET revoked = TRUE WHERE user_id = $1 AND revoked = FALSE";

    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );

    let result = sqlx::query(query)
        .bind(user_id)
        .execute(executor)
        .instrument(span)
        .await
        .context("failed to revoke user refresh tokens")?;

    Ok(result.rows_affected())
}
