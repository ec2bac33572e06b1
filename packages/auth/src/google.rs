//! Identity Toolkit REST client.
//!
//! Uses the same three endpoints the Firebase SDKs call under the hood:
//! `accounts:lookup` for token verification, `accounts:signInWithPassword`,
//! and `accounts:signUp`. All three take the project's web API key as a
//! query parameter.
//!
//! See <https://cloud.google.com/identity-platform/docs/use-rest-api>

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{AuthError, AuthUser, IdentityProvider, SignedInUser};

const IDENTITY_HOST: &str = "https://identitytoolkit.googleapis.com/v1";

/// [`IdentityProvider`] backed by the Identity Toolkit REST API.
pub struct GoogleIdentity {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

#[derive(Deserialize)]
struct SessionResponse {
    #[serde(rename = "localId")]
    local_id: String,
    #[serde(default)]
    email: String,
    #[serde(rename = "idToken")]
    id_token: String,
    #[serde(rename = "refreshToken")]
    refresh_token: String,
    #[serde(rename = "expiresIn")]
    expires_in: String,
}

impl GoogleIdentity {
    /// Creates a provider for the project owning the given web API key.
    #[must_use]
    pub fn new(client: reqwest::Client, api_key: String) -> Self {
        Self {
            client,
            base_url: IDENTITY_HOST.to_string(),
            api_key,
        }
    }

    async fn post(&self, endpoint: &str, body: Value) -> Result<Value, AuthError> {
        let resp = self
            .client
            .post(format!("{}/{endpoint}", self.base_url))
            .query(&[("key", &self.api_key)])
            .json(&body)
            .send()
            .await?;

        if resp.status().is_success() {
            return Ok(resp.json().await?);
        }

        let body: Value = resp.json().await.unwrap_or(Value::Null);
        let code = body["error"]["message"].as_str().unwrap_or("");
        log::debug!("Identity Toolkit rejected {endpoint}: {code}");
        Err(map_error_code(code))
    }

    fn session(body: &Value) -> Result<SignedInUser, AuthError> {
        let session: SessionResponse = serde_json::from_value(body.clone())
            .map_err(|e| AuthError::Provider(format!("malformed session response: {e}")))?;
        let expires_in = session.expires_in.parse().unwrap_or(3600);
        Ok(SignedInUser {
            uid: session.local_id,
            email: session.email,
            id_token: session.id_token,
            refresh_token: session.refresh_token,
            expires_in,
        })
    }
}

/// Maps Identity Toolkit error codes onto [`AuthError`].
///
/// The service reports invalid email and invalid password separately;
/// both collapse into [`AuthError::InvalidCredentials`] so responses
/// don't reveal which half was wrong.
fn map_error_code(code: &str) -> AuthError {
    // Codes can carry a suffix, e.g. "WEAK_PASSWORD : Password should be
    // at least 6 characters".
    let (head, detail) = match code.split_once(':') {
        Some((head, detail)) => (head.trim(), detail.trim()),
        None => (code.trim(), ""),
    };

    match head {
        "INVALID_ID_TOKEN" | "TOKEN_EXPIRED" | "USER_DISABLED" | "USER_NOT_FOUND" => {
            AuthError::InvalidToken
        }
        "EMAIL_NOT_FOUND" | "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" | "INVALID_EMAIL" => {
            AuthError::InvalidCredentials
        }
        "EMAIL_EXISTS" => AuthError::EmailExists,
        "WEAK_PASSWORD" => AuthError::WeakPassword(detail.to_string()),
        other => AuthError::Provider(other.to_string()),
    }
}

#[async_trait]
impl IdentityProvider for GoogleIdentity {
    async fn verify_token(&self, token: &str) -> Result<AuthUser, AuthError> {
        let body = self
            .post("accounts:lookup", json!({ "idToken": token }))
            .await?;

        let user = body["users"]
            .as_array()
            .and_then(|users| users.first())
            .ok_or(AuthError::InvalidToken)?;
        let uid = user["localId"].as_str().ok_or(AuthError::InvalidToken)?;

        Ok(AuthUser {
            uid: uid.to_string(),
            email: user["email"].as_str().unwrap_or_default().to_string(),
        })
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<SignedInUser, AuthError> {
        let body = self
            .post(
                "accounts:signInWithPassword",
                json!({
                    "email": email,
                    "password": password,
                    "returnSecureToken": true
                }),
            )
            .await?;
        Self::session(&body)
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<SignedInUser, AuthError> {
        let body = self
            .post(
                "accounts:signUp",
                json!({
                    "email": email,
                    "password": password,
                    "returnSecureToken": true
                }),
            )
            .await?;
        Self::session(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_credential_errors_together() {
        assert!(matches!(
            map_error_code("EMAIL_NOT_FOUND"),
            AuthError::InvalidCredentials
        ));
        assert!(matches!(
            map_error_code("INVALID_PASSWORD"),
            AuthError::InvalidCredentials
        ));
    }

    #[test]
    fn maps_weak_password_with_detail() {
        let err = map_error_code("WEAK_PASSWORD : Password should be at least 6 characters");
        match err {
            AuthError::WeakPassword(detail) => {
                assert_eq!(detail, "Password should be at least 6 characters");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unknown_codes_surface_as_provider_errors() {
        assert!(matches!(
            map_error_code("QUOTA_EXCEEDED"),
            AuthError::Provider(_)
        ));
    }

    #[test]
    fn parses_session_response() {
        let session = GoogleIdentity::session(&json!({
            "localId": "u1",
            "email": "maria@example.com",
            "idToken": "tok",
            "refreshToken": "ref",
            "expiresIn": "3600"
        }))
        .unwrap();
        assert_eq!(session.uid, "u1");
        assert_eq!(session.expires_in, 3600);
    }
}
