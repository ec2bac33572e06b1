//! Fixed-token identity provider for tests and local development.

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::{AuthError, AuthUser, IdentityProvider, SignedInUser};

/// Resolves tokens against a fixed token-to-identity table. Credential
/// flows are not supported and always fail.
#[derive(Debug, Default)]
pub struct StaticIdentity {
    tokens: BTreeMap<String, AuthUser>,
}

impl StaticIdentity {
    /// Creates a provider that rejects every token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a token that resolves to the given identity.
    #[must_use]
    pub fn with_token(mut self, token: &str, uid: &str, email: &str) -> Self {
        self.tokens.insert(
            token.to_string(),
            AuthUser {
                uid: uid.to_string(),
                email: email.to_string(),
            },
        );
        self
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentity {
    async fn verify_token(&self, token: &str) -> Result<AuthUser, AuthError> {
        self.tokens
            .get(token)
            .cloned()
            .ok_or(AuthError::InvalidToken)
    }

    async fn sign_in(&self, _email: &str, _password: &str) -> Result<SignedInUser, AuthError> {
        Err(AuthError::InvalidCredentials)
    }

    async fn sign_up(&self, _email: &str, _password: &str) -> Result<SignedInUser, AuthError> {
        Err(AuthError::Provider(
            "sign-up is not available in the static provider".to_string(),
        ))
    }
}
