//! # Sesamo (Authentication & Session Lifecycle)
//!
//! `sesamo` is the authentication authority for the platform. It validates
//! credentials, issues short-lived signed access tokens alongside long-lived
//! opaque refresh tokens, rotates refresh tokens with reuse detection, and
//! tracks access-token revocation.
//!
//! ## Token model
//!
//! - **Access tokens** are stateless `HS256` JWTs (15 minutes by default).
//!   They are verified without a storage lookup, except for a blacklist
//!   check against the TTL cache on every authenticated request.
//! - **Refresh tokens** are opaque 64-byte secrets. Only a SHA-256 hash is
//!   persisted; the raw value is shown to the client exactly once.
//!
//! ## Rotation & reuse detection
//!
//! Exchanging a refresh token revokes it and mints a successor in a single
//! database transaction. Presenting an already-rotated token is treated as
//! evidence of compromise: every refresh token of the owning user is revoked,
//! forcing re-authentication on all devices.
//!
//! ## Lockout
//!
//! Five consecutive failed logins lock the account for 30 minutes. Lock
//! expiry is lazy (observed on the next login attempt); no background sweep
//! runs. Every `validate` branch is padded to a minimum wall-clock duration
//! to prevent user enumeration through timing.

pub mod api;
pub mod cli;
