//! Atomic refresh-token rotation with reuse detection.
//!
//! A presented refresh token is resolved and locked inside one transaction.
//! A live token is revoked and replaced. A token that was already revoked is
//! evidence of theft or replay, every live token the user holds is purged in
//! the same transaction.

use crate::api::handlers::auth::{
    state::AuthState,
    storage::{self, RefreshRecord},
    tokens::{self, IssuedTokens},
    utils,
};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::warn;

pub(super) enum RotationOutcome {
    Rotated(IssuedTokens),
    /// No row matches the presented token.
    NotFound,
    Expired,
    /// The token was already rotated once. All of the user's live tokens
    /// were revoked; the id of the affected user is returned for logging.
    ReusedAndPurged {
        user_id: uuid::Uuid,
    },
}

enum Disposition {
    Live,
    Expired,
    Reused,
}

/// Decide what a locked refresh-token row means at `now`.
///
/// Expiry is checked before the revoked flag: replaying an expired token is
/// inert and must not purge the user's other sessions. A token whose expiry
/// equals `now` exactly is already expired.
fn classify(record: &RefreshRecord, now: DateTime<Utc>) -> Disposition {
    if record.expires_at <= now {
        Disposition::Expired
    } else if record.revoked {
        Disposition::Reused
    } else {
        Disposition::Live
    }
}

pub(super) async fn rotate(
    pool: &PgPool,
    state: &AuthState,
    presented_token: &str,
) -> Result<RotationOutcome> {
    let token_hash = utils::hash_refresh_token(presented_token);

    let mut tx = pool
        .begin()
        .await
        .context("failed to begin rotation transaction")?;

    let Some(record) = storage::find_refresh_token_for_update(&mut tx, &token_hash).await? else {
        tx.rollback()
            .await
            .context("failed to roll back rotation transaction")?;
        return Ok(RotationOutcome::NotFound);
    };

    match classify(&record, Utc::now()) {
        Disposition::Expired => {
            tx.rollback()
                .await
                .context("failed to roll back rotation transaction")?;
            Ok(RotationOutcome::Expired)
        }

        Disposition::Reused => {
            let purged = storage::revoke_all_refresh_tokens(&mut *tx, record.user_id).await?;
            tx.commit()
                .await
                .context("failed to commit rotation transaction")?;
            warn!(
                user_id = %record.user_id,
                purged,
                "revoked refresh token presented again, purged all sessions"
            );
            Ok(RotationOutcome::ReusedAndPurged {
                user_id: record.user_id,
            })
        }

        Disposition::Live => {
            storage::revoke_refresh_token(&mut tx, record.id).await?;
            let issued =
                tokens::issue(&mut tx, state.signer(), state.config(), &record.user()).await?;
            tx.commit()
                .await
                .context("failed to commit rotation transaction")?;
            Ok(RotationOutcome::Rotated(issued))
        }
    }
}
