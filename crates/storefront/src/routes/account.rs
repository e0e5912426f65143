//! Account route handlers.
//!
//! These routes require authentication.

use axum::{Json, extract::State};
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::{Profile, ProfileUpdate};
use crate::services::ProfileService;
use crate::state::AppState;

/// Show the user's profile, creating an empty one on first visit.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn profile(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Profile>> {
    let profile = ProfileService::new(state.supabase())
        .ensure_profile(&user)
        .await?;
    Ok(Json(profile))
}

/// Update the user's profile with the fields provided.
#[instrument(skip(state, user, update), fields(user_id = %user.id))]
pub async fn update_profile(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<Profile>> {
    if update.is_empty() {
        return Err(AppError::BadRequest("no profile fields to update".to_string()));
    }

    let profiles = ProfileService::new(state.supabase());
    profiles.ensure_profile(&user).await?;
    let profile = profiles.update(&user, &update).await?;
    Ok(Json(profile))
}
