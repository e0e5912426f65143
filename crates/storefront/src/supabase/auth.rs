//! GoTrue auth endpoints.
//!
//! The storefront treats the auth service as an opaque contract: email and
//! password in, an access token and a user record out.

use reqwest::Method;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use sundry_core::{Email, UserId};

use super::{SupabaseClient, SupabaseError, check_status, parse_json};

/// User record returned by the auth service.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthUser {
    /// User ID (UUID).
    pub id: UserId,
    /// Email address, absent for phone-only accounts.
    pub email: Option<String>,
}

/// A signed-in session.
#[derive(Clone, Deserialize)]
pub struct AuthSession {
    /// Bearer token for data API calls made on behalf of the user.
    #[serde(deserialize_with = "secret")]
    pub access_token: SecretString,
    /// Token used to mint a new access token.
    #[serde(deserialize_with = "secret")]
    pub refresh_token: SecretString,
    /// Lifetime of `access_token` in seconds.
    pub expires_in: u64,
    /// The signed-in user.
    pub user: AuthUser,
}

impl std::fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSession")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expires_in", &self.expires_in)
            .field("user", &self.user)
            .finish()
    }
}

/// Result of a sign-up.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SignUpOutcome {
    /// Auto-confirmed projects sign the user in immediately.
    Session(AuthSession),
    /// Otherwise the user must confirm their email first.
    ConfirmationRequired(AuthUser),
}

fn secret<'de, D>(deserializer: D) -> Result<SecretString, D::Error>
where
    D: serde::Deserializer<'de>,
{
    String::deserialize(deserializer).map(SecretString::from)
}

#[derive(Serialize)]
struct Credentials<'a> {
    email: &'a str,
    password: &'a str,
}

impl SupabaseClient {
    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// Returns `SupabaseError::Api` with status 400 for wrong credentials, or
    /// another error if the request fails.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn sign_in_with_password(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<AuthSession, SupabaseError> {
        let mut url = self.auth_endpoint("token")?;
        url.query_pairs_mut().append_pair("grant_type", "password");

        let response = self
            .request(Method::POST, url, None)
            .json(&Credentials {
                email: email.as_str(),
                password: password.expose_secret(),
            })
            .send()
            .await?;
        parse_json(response).await
    }

    /// Register a new account.
    ///
    /// # Errors
    ///
    /// Returns `SupabaseError::Api` with status 422 when the email is taken or
    /// the password is rejected, or another error if the request fails.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn sign_up(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<SignUpOutcome, SupabaseError> {
        let url = self.auth_endpoint("signup")?;
        let response = self
            .request(Method::POST, url, None)
            .json(&Credentials {
                email: email.as_str(),
                password: password.expose_secret(),
            })
            .send()
            .await?;
        parse_json(response).await
    }

    /// Fetch the user that owns `access_token`.
    ///
    /// # Errors
    ///
    /// Returns `SupabaseError::Api` with status 401 for an expired or invalid
    /// token, or another error if the request fails.
    pub async fn get_user(&self, access_token: &SecretString) -> Result<AuthUser, SupabaseError> {
        let url = self.auth_endpoint("user")?;
        let response = self
            .request(Method::GET, url, Some(access_token))
            .send()
            .await?;
        parse_json(response).await
    }

    /// Revoke the session behind `access_token`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn sign_out(&self, access_token: &SecretString) -> Result<(), SupabaseError> {
        let url = self.auth_endpoint("logout")?;
        let response = self
            .request(Method::POST, url, Some(access_token))
            .send()
            .await?;
        check_status(response).await.map(drop)
    }
}
