//! Authentication service.
//!
//! Email and password accounts are held by the Supabase auth service; this
//! layer validates input, translates the service's error answers, and turns a
//! session into the [`CurrentUser`] stored in the browser session.

mod error;

pub use error::AuthError;

use secrecy::SecretString;
use tracing::instrument;

use sundry_core::Email;

use crate::models::CurrentUser;
use crate::supabase::{AuthSession, SignUpOutcome, SupabaseClient, SupabaseError};

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// What a successful sign-up produced.
#[derive(Debug, Clone)]
pub enum SignUpResult {
    /// The project auto-confirms accounts; the user is signed in.
    SignedIn(CurrentUser),
    /// A confirmation email was sent; the user must confirm before signing in.
    ConfirmationRequired { email: Email },
}

/// Authentication service.
pub struct AuthService<'a> {
    client: &'a SupabaseClient,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(client: &'a SupabaseClient) -> Self {
        Self { client }
    }

    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    /// Returns `AuthError::EmailNotConfirmed` if the account is unconfirmed.
    #[instrument(skip(self, password))]
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<CurrentUser, AuthError> {
        let email = Email::parse(email)?;
        let password = SecretString::from(password);

        let session = self
            .client
            .sign_in_with_password(&email, &password)
            .await
            .map_err(sign_in_error)?;

        Ok(current_user(session, email))
    }

    /// Register a new account.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::WeakPassword` if the password doesn't meet requirements.
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    #[instrument(skip(self, password))]
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpResult, AuthError> {
        let email = Email::parse(email)?;
        validate_password(password)?;
        let password = SecretString::from(password);

        let outcome = self
            .client
            .sign_up(&email, &password)
            .await
            .map_err(sign_up_error)?;

        Ok(match outcome {
            SignUpOutcome::Session(session) => SignUpResult::SignedIn(current_user(session, email)),
            SignUpOutcome::ConfirmationRequired(_) => SignUpResult::ConfirmationRequired { email },
        })
    }

    /// Revoke the user's session with the auth service.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Supabase` if the request fails.
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn sign_out(&self, user: &CurrentUser) -> Result<(), AuthError> {
        self.client.sign_out(&user.access_token).await?;
        Ok(())
    }
}

/// Build the session identity, preferring the email the service returned.
fn current_user(session: AuthSession, submitted: Email) -> CurrentUser {
    let email = session
        .user
        .email
        .as_deref()
        .and_then(|e| Email::parse(e).ok())
        .unwrap_or(submitted);

    CurrentUser {
        id: session.user.id,
        email,
        access_token: session.access_token,
    }
}

fn sign_in_error(err: SupabaseError) -> AuthError {
    match &err {
        SupabaseError::Api {
            status: 400 | 401,
            code,
            message,
        } => {
            if code.as_deref() == Some("email_not_confirmed")
                || message.to_lowercase().contains("not confirmed")
            {
                AuthError::EmailNotConfirmed
            } else {
                AuthError::InvalidCredentials
            }
        }
        _ => AuthError::Supabase(err),
    }
}

fn sign_up_error(err: SupabaseError) -> AuthError {
    match &err {
        SupabaseError::Api {
            status: 400 | 422,
            code,
            message,
        } => {
            if code.as_deref() == Some("user_already_exists")
                || message.to_lowercase().contains("already registered")
            {
                AuthError::UserAlreadyExists
            } else if code.as_deref() == Some("weak_password") {
                AuthError::WeakPassword(message.clone())
            } else {
                AuthError::Supabase(err)
            }
        }
        _ => AuthError::Supabase(err),
    }
}

fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}
