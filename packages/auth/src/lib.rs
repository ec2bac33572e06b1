#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Identity provider abstraction.
//!
//! Authentication is delegated to an external identity service; this crate
//! defines the [`IdentityProvider`] seam the HTTP layer depends on, the
//! [`GoogleIdentity`] implementation that calls the Identity Toolkit REST
//! API, and a [`StaticIdentity`] stub for tests. Nothing here knows about
//! actix or the document store.

pub mod google;
pub mod r#static;

pub use google::GoogleIdentity;
pub use r#static::StaticIdentity;

use async_trait::async_trait;
use thiserror::Error;

/// Error from an identity provider operation.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The bearer token is missing, malformed, expired, or revoked.
    #[error("invalid or expired token")]
    InvalidToken,
    /// Email/password pair did not match an account.
    #[error("invalid credentials")]
    InvalidCredentials,
    /// An account with this email already exists.
    #[error("email already registered")]
    EmailExists,
    /// The password does not meet the provider's minimum requirements.
    #[error("password too weak: {0}")]
    WeakPassword(String),
    /// The HTTP request to the provider failed.
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    /// The provider responded with an error this crate does not map.
    #[error("identity provider error: {0}")]
    Provider(String),
}

/// A verified identity attached to a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    /// Provider UID; doubles as the user document ID.
    pub uid: String,
    /// Email address on the account.
    pub email: String,
}

/// Result of a successful credential sign-in or sign-up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedInUser {
    /// Provider UID.
    pub uid: String,
    /// Email address on the account.
    pub email: String,
    /// Bearer token for subsequent requests.
    pub id_token: String,
    /// Token used to mint a fresh `id_token` when this one expires.
    pub refresh_token: String,
    /// Lifetime of `id_token` in seconds.
    pub expires_in: u64,
}

/// Token verification and credential flows against an identity service.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Verifies a bearer token and returns the identity it belongs to.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidToken`] if the token does not resolve
    /// to an account.
    async fn verify_token(&self, token: &str) -> Result<AuthUser, AuthError>;

    /// Exchanges an email/password pair for a session.
    async fn sign_in(&self, email: &str, password: &str) -> Result<SignedInUser, AuthError>;

    /// Creates an account and returns its first session.
    async fn sign_up(&self, email: &str, password: &str) -> Result<SignedInUser, AuthError>;
}

/// Extracts the token from an `Authorization: Bearer <token>` header value.
#[must_use]
pub fn parse_bearer(header: &str) -> Option<&str> {
    let token = header.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}
