//! Per-user remote cart mirror.
//!
//! The remote side holds one `cart_items` row per product for each user. It
//! is written with replace-all semantics: delete every row for the user, then
//! insert the current items.

use std::future::Future;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};

use sundry_core::{CartItem, ProductId, UserId};

use crate::models::CurrentUser;
use crate::supabase::{Query, SupabaseClient, SupabaseError};

const CART_TABLE: &str = "cart_items";

/// Cart rows joined with the product fields a cart line needs.
const CART_SELECT: &str = "product_id,quantity,products(id,name,price,image_url)";

/// Storage operations for a user's remote cart.
///
/// # Implementation Notes
///
/// - Implementations must be thread-safe (`Send + Sync`)
/// - Calls are made with the user's own access token
/// - No retries: a failure is returned to the caller as-is
pub trait RemoteCartStore: Send + Sync {
    /// Fetch the user's cart lines.
    fn fetch(
        &self,
        user: &CurrentUser,
    ) -> impl Future<Output = Result<Vec<CartItem>, SupabaseError>> + Send;

    /// Delete every cart row belonging to the user.
    fn delete_all(&self, user: &CurrentUser)
    -> impl Future<Output = Result<(), SupabaseError>> + Send;

    /// Insert `items` as fresh rows for the user.
    fn insert(
        &self,
        user: &CurrentUser,
        items: &[CartItem],
    ) -> impl Future<Output = Result<(), SupabaseError>> + Send;
}

/// [`RemoteCartStore`] backed by the Supabase `cart_items` table.
#[derive(Debug, Clone)]
pub struct SupabaseCartStore {
    client: SupabaseClient,
}

impl SupabaseCartStore {
    #[must_use]
    pub const fn new(client: SupabaseClient) -> Self {
        Self { client }
    }
}

#[derive(Debug, Deserialize)]
struct CartRow {
    product_id: ProductId,
    quantity: i64,
    products: Option<JoinedProduct>,
}

#[derive(Debug, Deserialize)]
struct JoinedProduct {
    id: ProductId,
    name: String,
    #[serde(with = "rust_decimal::serde::float")]
    price: Decimal,
    #[serde(default)]
    image_url: Option<String>,
}

#[derive(Debug, Serialize)]
struct NewCartRow {
    user_id: UserId,
    product_id: ProductId,
    quantity: u32,
    added_at: DateTime<Utc>,
}

impl CartRow {
    fn into_item(self) -> Option<CartItem> {
        let Some(product) = self.products else {
            warn!(product_id = %self.product_id, "Skipping remote cart row without product");
            return None;
        };
        Some(CartItem {
            id: product.id,
            name: product.name,
            price: product.price,
            image: product.image_url.unwrap_or_default(),
            // Zero and negative rows are dropped when the cart is rebuilt
            quantity: u32::try_from(self.quantity).unwrap_or(0),
        })
    }
}

impl RemoteCartStore for SupabaseCartStore {
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    async fn fetch(&self, user: &CurrentUser) -> Result<Vec<CartItem>, SupabaseError> {
        let query = Query::new().select(CART_SELECT).eq("user_id", user.id);
        let rows: Vec<CartRow> = self
            .client
            .select(CART_TABLE, &query, Some(&user.access_token))
            .await?;
        Ok(rows.into_iter().filter_map(CartRow::into_item).collect())
    }

    #[instrument(skip(self, user), fields(user_id = %user.id))]
    async fn delete_all(&self, user: &CurrentUser) -> Result<(), SupabaseError> {
        let query = Query::new().eq("user_id", user.id);
        self.client
            .delete(CART_TABLE, &query, Some(&user.access_token))
            .await
    }

    #[instrument(skip(self, user, items), fields(user_id = %user.id, items = items.len()))]
    async fn insert(&self, user: &CurrentUser, items: &[CartItem]) -> Result<(), SupabaseError> {
        let added_at = Utc::now();
        let rows: Vec<NewCartRow> = items
            .iter()
            .map(|item| NewCartRow {
                user_id: user.id,
                product_id: item.id,
                quantity: item.quantity,
                added_at,
            })
            .collect();
        self.client
            .insert(CART_TABLE, &rows, Some(&user.access_token))
            .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use secrecy::SecretString;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, Request, ResponseTemplate};

    use sundry_core::Email;

    use super::*;
    use crate::supabase::tests::client_for;

    const USER_ID: &str = "0b8f6a52-3c1e-4d2a-9f6b-7e5d4c3b2a19";

    fn user() -> CurrentUser {
        CurrentUser {
            id: USER_ID.parse().unwrap(),
            email: Email::parse("shopper@example.com").unwrap(),
            access_token: SecretString::from("user-jwt"),
        }
    }

    #[tokio::test]
    async fn test_fetch_joins_products_and_skips_orphans() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/cart_items"))
            .and(query_param("select", CART_SELECT))
            .and(query_param("user_id", format!("eq.{USER_ID}")))
            .and(header("authorization", "Bearer user-jwt"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {
                    "product_id": 7,
                    "quantity": 3,
                    "products": {"id": 7, "name": "Widget", "price": 10.0, "image_url": "x"}
                },
                {"product_id": 8, "quantity": 1, "products": null},
                {
                    "product_id": 9,
                    "quantity": 1,
                    "products": {"id": 9, "name": "Gadget", "price": 2.5, "image_url": null}
                }
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let store = SupabaseCartStore::new(client_for(&server));
        let items = store.fetch(&user()).await.unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].name, "Widget");
        assert_eq!(items[0].quantity, 3);
        assert_eq!(items[0].price, Decimal::from(10));
        assert_eq!(items[1].id, ProductId::new(9));
        assert_eq!(items[1].image, "");
    }

    #[tokio::test]
    async fn test_delete_all_filters_by_user() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/rest/v1/cart_items"))
            .and(query_param("user_id", format!("eq.{USER_ID}")))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let store = SupabaseCartStore::new(client_for(&server));
        store.delete_all(&user()).await.unwrap();
    }

    #[tokio::test]
    async fn test_insert_writes_one_row_per_item() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/cart_items"))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let items = vec![
            CartItem {
                id: ProductId::new(7),
                name: "Widget".to_string(),
                price: Decimal::from(10),
                image: "x".to_string(),
                quantity: 2,
            },
            CartItem {
                id: ProductId::new(9),
                name: "Gadget".to_string(),
                price: Decimal::new(25, 1),
                image: String::new(),
                quantity: 1,
            },
        ];

        let store = SupabaseCartStore::new(client_for(&server));
        store.insert(&user(), &items).await.unwrap();

        let requests: Vec<Request> = server.received_requests().await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        let rows = body.as_array().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["user_id"], USER_ID);
        assert_eq!(rows[0]["product_id"], 7);
        assert_eq!(rows[0]["quantity"], 2);
        assert!(rows[0]["added_at"].as_str().unwrap().contains('T'));
        assert!(rows[0].get("name").is_none());
    }
}
