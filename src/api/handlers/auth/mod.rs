//! Authentication and session lifecycle.
//!
//! Login, registration, refresh rotation and logout. Credentials are padded
//! to a constant minimum duration, refresh tokens rotate atomically with
//! reuse detection, and revoked access tokens sit in a TTL'd registry until
//! they would have expired anyway.

mod credentials;
mod error;
mod guard;
pub mod login;
pub mod logout;
pub mod refresh;
pub mod register;
mod revocation;
mod rotation;
pub mod state;
mod storage;
mod tokens;
pub mod types;
mod utils;

pub use state::{AuthConfig, AuthState};

pub(crate) use revocation::{RevocationRegistry, TokenCache};
