//! Authentication route handlers.
//!
//! Handles login, registration, and logout via the Supabase auth service.
//! Signing in merges the browser's cart with the one stored for the account.

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{Result, clear_sentry_user, set_sentry_user};
use crate::middleware::{OptionalAuth, RequireAuth, clear_current_user, set_current_user};
use crate::models::{CurrentUser, UserView};
use crate::routes::cart::{CartView, lock_cart, open_cart};
use crate::services::{AuthService, SignUpResult};
use crate::state::AppState;

/// Login and registration request body.
#[derive(Debug, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Response for a completed sign-in.
#[derive(Debug, Serialize)]
pub struct SignedInView {
    pub user: UserView,
    pub cart: CartView,
}

/// Response for a sign-up awaiting email confirmation.
#[derive(Debug, Serialize)]
pub struct ConfirmationView {
    pub confirmation_required: bool,
    pub email: String,
}

/// Store the user in the session and reconcile their cart.
///
/// A failed merge does not fail the sign-in, since the session id is already
/// cycled. The merge is retried on the next cart request.
async fn establish(
    state: &AppState,
    session: &Session,
    user: &CurrentUser,
) -> Result<SignedInView> {
    set_current_user(session, user).await?;
    set_sentry_user(&user.id, Some(user.email.as_str()));

    let cart = match open_cart(state, session).await {
        Ok(cart) => cart,
        Err(e) => {
            tracing::warn!(
                user_id = %user.id,
                error = %e,
                "Signed in without merging the stored cart"
            );
            lock_cart(state, session).await?
        }
    };
    Ok(SignedInView {
        user: UserView::from(user),
        cart: CartView::from(&*cart),
    })
}

/// Handle login.
#[instrument(skip(state, session, credentials), fields(email = %credentials.email))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(credentials): Json<Credentials>,
) -> Result<Json<SignedInView>> {
    let user = AuthService::new(state.supabase())
        .sign_in(&credentials.email, &credentials.password)
        .await?;
    tracing::info!(user_id = %user.id, "User signed in");

    Ok(Json(establish(&state, &session, &user).await?))
}

/// Handle registration.
///
/// Returns `202 Accepted` when the account must be confirmed by email first.
#[instrument(skip(state, session, credentials), fields(email = %credentials.email))]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Json(credentials): Json<Credentials>,
) -> Result<impl IntoResponse> {
    let result = AuthService::new(state.supabase())
        .sign_up(&credentials.email, &credentials.password)
        .await?;

    match result {
        SignUpResult::SignedIn(user) => {
            tracing::info!(user_id = %user.id, "User registered");
            let view = establish(&state, &session, &user).await?;
            Ok((StatusCode::CREATED, Json(view)).into_response())
        }
        SignUpResult::ConfirmationRequired { email } => {
            tracing::info!("Registration awaiting email confirmation");
            let view = ConfirmationView {
                confirmation_required: true,
                email: email.into_inner(),
            };
            Ok((StatusCode::ACCEPTED, Json(view)).into_response())
        }
    }
}

/// Handle logout.
///
/// The cart stays with the browser; only the identity is dropped.
#[instrument(skip(state, session, user))]
pub async fn logout(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
) -> Result<StatusCode> {
    if let Some(user) = user {
        if let Err(e) = AuthService::new(state.supabase()).sign_out(&user).await {
            tracing::warn!(user_id = %user.id, error = %e, "Failed to revoke auth session");
        }
        tracing::info!(user_id = %user.id, "User signed out");
    }

    clear_current_user(&session).await?;
    clear_sentry_user();
    Ok(StatusCode::NO_CONTENT)
}

/// Show the signed-in user.
pub async fn me(RequireAuth(user): RequireAuth) -> Json<UserView> {
    Json(UserView::from(&user))
}
