//! Customer profile reads and writes.

use serde::Serialize;
use tracing::instrument;

use sundry_core::UserId;

use crate::models::{CurrentUser, Profile, ProfileUpdate};
use crate::supabase::{Query, SupabaseClient, SupabaseError};

const PROFILES: &str = "profiles";

#[derive(Serialize)]
struct NewProfile {
    id: UserId,
}

/// Profile service.
pub struct ProfileService<'a> {
    client: &'a SupabaseClient,
}

impl<'a> ProfileService<'a> {
    #[must_use]
    pub const fn new(client: &'a SupabaseClient) -> Self {
        Self { client }
    }

    /// The user's profile, if one has been created.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn profile(&self, user: &CurrentUser) -> Result<Option<Profile>, SupabaseError> {
        let query = Query::new().select("*").eq("id", user.id);
        self.client
            .select_single(PROFILES, &query, Some(&user.access_token))
            .await
    }

    /// Apply `update` to the user's profile and return the stored row.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the profile does not exist.
    #[instrument(skip(self, user, update), fields(user_id = %user.id))]
    pub async fn update(
        &self,
        user: &CurrentUser,
        update: &ProfileUpdate,
    ) -> Result<Profile, SupabaseError> {
        let query = Query::new().eq("id", user.id);
        self.client
            .update_returning(PROFILES, &query, update, Some(&user.access_token))
            .await
    }

    /// The user's profile, creating an empty one first if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if a request fails.
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn ensure_profile(&self, user: &CurrentUser) -> Result<Profile, SupabaseError> {
        if let Some(profile) = self.profile(user).await? {
            return Ok(profile);
        }

        tracing::info!("Creating profile");
        self.client
            .insert_returning(
                PROFILES,
                &NewProfile { id: user.id },
                Some(&user.access_token),
            )
            .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use sundry_core::Email;

    use super::*;
    use crate::supabase::tests::client_for;

    const USER_ID: &str = "0b8f6a52-3c1e-4d2a-9f6b-7e5d4c3b2a19";

    fn user() -> CurrentUser {
        CurrentUser {
            id: USER_ID.parse().unwrap(),
            email: Email::parse("shopper@example.com").unwrap(),
            access_token: secrecy::SecretString::from("user-jwt"),
        }
    }

    #[tokio::test]
    async fn test_ensure_profile_creates_missing_row() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/profiles"))
            .and(query_param("id", format!("eq.{USER_ID}")))
            .respond_with(ResponseTemplate::new(406).set_body_json(serde_json::json!({
                "code": "PGRST116",
                "message": "JSON object requested, multiple (or no) rows returned"
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/profiles"))
            .and(body_json(serde_json::json!({"id": USER_ID})))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "id": USER_ID,
                "first_name": null,
                "updated_at": null
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let profile = ProfileService::new(&client).ensure_profile(&user()).await.unwrap();
        assert_eq!(profile.id.to_string(), USER_ID);
        assert!(profile.first_name.is_none());
    }

    #[tokio::test]
    async fn test_update_sends_only_changed_fields() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/rest/v1/profiles"))
            .and(query_param("id", format!("eq.{USER_ID}")))
            .and(body_json(serde_json::json!({"first_name": "Ada"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": USER_ID,
                "first_name": "Ada"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let update = ProfileUpdate {
            first_name: Some("Ada".to_string()),
            ..ProfileUpdate::default()
        };
        let profile = ProfileService::new(&client)
            .update(&user(), &update)
            .await
            .unwrap();
        assert_eq!(profile.first_name.as_deref(), Some("Ada"));
    }
}
