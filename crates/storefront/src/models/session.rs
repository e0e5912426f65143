//! Session-related types.
//!
//! Types stored in the session for authentication state and cart identity.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use sundry_core::{Email, UserId};

/// Session-stored user identity.
///
/// Carries the auth service's access token so data requests made for this
/// user run under their row-level security policies.
#[derive(Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    /// Auth service user ID.
    pub id: UserId,
    /// User's email address.
    pub email: Email,
    /// Bearer token for Supabase requests made on the user's behalf.
    #[serde(serialize_with = "expose", deserialize_with = "secret")]
    pub access_token: SecretString,
}

impl std::fmt::Debug for CurrentUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CurrentUser")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("access_token", &"[REDACTED]")
            .finish()
    }
}

/// Public view of the signed-in user (no token).
#[derive(Debug, Clone, Serialize)]
pub struct UserView {
    pub id: UserId,
    pub email: Email,
}

impl From<&CurrentUser> for UserView {
    fn from(user: &CurrentUser) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
        }
    }
}

fn expose<S>(token: &SecretString, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(token.expose_secret())
}

fn secret<'de, D>(deserializer: D) -> Result<SecretString, D::Error>
where
    D: serde::Deserializer<'de>,
{
    String::deserialize(deserializer).map(SecretString::from)
}

/// Session keys for authentication and cart data.
pub mod keys {
    /// Key for storing the current logged-in user.
    pub const CURRENT_USER: &str = "current_user";

    /// Key for the browser's cart key (names its cart directory).
    pub const CART_KEY: &str = "cart_key";
}
