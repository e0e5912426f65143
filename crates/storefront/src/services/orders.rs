//! Order history and checkout.
//!
//! All requests run with the customer's access token, so the database only
//! ever shows them their own orders.

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info, instrument, warn};

use sundry_core::{Cart, OrderId, OrderStatus, PaymentStatus, ProductId, UserId};

use crate::models::{CurrentUser, Order, OrderItem, OrderWithItems, ShippingDetails};
use crate::supabase::{Query, SupabaseClient, SupabaseError};

/// Errors from order operations.
#[derive(Debug, Error)]
pub enum OrderError {
    /// Checkout was attempted with nothing in the cart.
    #[error("cannot place an order from an empty cart")]
    EmptyCart,

    /// A required shipping field was blank.
    #[error("missing shipping field: {0}")]
    MissingField(&'static str),

    /// The data API request failed.
    #[error("order storage error: {0}")]
    Supabase(#[from] SupabaseError),
}

#[derive(Debug, Serialize)]
struct NewOrder<'a> {
    user_id: UserId,
    status: OrderStatus,
    #[serde(with = "rust_decimal::serde::float")]
    total_amount: Decimal,
    shipping_address: &'a str,
    shipping_city: &'a str,
    shipping_state: &'a str,
    shipping_postal_code: &'a str,
    shipping_country: &'a str,
    shipping_method: &'a str,
    payment_method: &'a str,
    payment_status: PaymentStatus,
    created_at: chrono::DateTime<Utc>,
}

#[derive(Debug, Serialize)]
struct NewOrderItem<'a> {
    order_id: OrderId,
    product_id: ProductId,
    product_name: &'a str,
    #[serde(with = "rust_decimal::serde::float")]
    product_price: Decimal,
    quantity: u32,
    #[serde(with = "rust_decimal::serde::float")]
    subtotal: Decimal,
}

/// Order service.
pub struct OrderService<'a> {
    client: &'a SupabaseClient,
}

impl<'a> OrderService<'a> {
    #[must_use]
    pub const fn new(client: &'a SupabaseClient) -> Self {
        Self { client }
    }

    /// The user's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn orders(&self, user: &CurrentUser) -> Result<Vec<Order>, OrderError> {
        let query = Query::new()
            .select("*")
            .eq("user_id", user.id)
            .order("created_at", false);
        Ok(self
            .client
            .select("orders", &query, Some(&user.access_token))
            .await?)
    }

    /// One of the user's orders with its lines, or `None` if it is not theirs
    /// or does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if a request fails.
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn order(
        &self,
        user: &CurrentUser,
        id: OrderId,
    ) -> Result<Option<OrderWithItems>, OrderError> {
        let query = Query::new()
            .select("*")
            .eq("id", id)
            .eq("user_id", user.id);
        let Some(order) = self
            .client
            .select_single::<Order>("orders", &query, Some(&user.access_token))
            .await?
        else {
            return Ok(None);
        };

        let items_query = Query::new()
            .select("*")
            .eq("order_id", id)
            .order("id", true);
        let items: Vec<OrderItem> = self
            .client
            .select("order_items", &items_query, Some(&user.access_token))
            .await?;

        Ok(Some(OrderWithItems { order, items }))
    }

    /// Create an order from `cart`: the `orders` row first, then one
    /// `order_items` row per cart line.
    ///
    /// If the lines cannot be written the `orders` row is deleted again, so a
    /// failed checkout leaves no empty order behind.
    ///
    /// The cart itself is left alone; clearing it is the caller's job.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::EmptyCart` for an empty cart,
    /// `OrderError::MissingField` for blank shipping input, or a storage error.
    #[instrument(skip(self, user, cart, shipping), fields(user_id = %user.id, items = cart.len()))]
    pub async fn place_order(
        &self,
        user: &CurrentUser,
        cart: &Cart,
        shipping: &ShippingDetails,
    ) -> Result<OrderWithItems, OrderError> {
        if cart.is_empty() {
            return Err(OrderError::EmptyCart);
        }
        if let Some(field) = shipping.first_missing_field() {
            return Err(OrderError::MissingField(field));
        }

        let new_order = NewOrder {
            user_id: user.id,
            status: OrderStatus::Pending,
            total_amount: cart.total_price(),
            shipping_address: &shipping.address,
            shipping_city: &shipping.city,
            shipping_state: &shipping.state,
            shipping_postal_code: &shipping.postal_code,
            shipping_country: &shipping.country,
            shipping_method: &shipping.shipping_method,
            payment_method: &shipping.payment_method,
            payment_status: PaymentStatus::Pending,
            created_at: Utc::now(),
        };
        let order: Order = self
            .client
            .insert_returning("orders", &new_order, Some(&user.access_token))
            .await?;

        let items = match self.insert_items(user, &order, cart).await {
            Ok(items) => items,
            Err(e) => {
                self.discard(user, &order).await;
                return Err(e.into());
            }
        };

        info!(order_id = %order.id, total = %order.total_amount, "Order placed");
        Ok(OrderWithItems { order, items })
    }

    /// Write one `order_items` row per cart line and read them back.
    async fn insert_items(
        &self,
        user: &CurrentUser,
        order: &Order,
        cart: &Cart,
    ) -> Result<Vec<OrderItem>, SupabaseError> {
        let rows: Vec<NewOrderItem<'_>> = cart
            .items()
            .iter()
            .map(|item| NewOrderItem {
                order_id: order.id,
                product_id: item.id,
                product_name: &item.name,
                product_price: item.price,
                quantity: item.quantity,
                subtotal: item.line_total(),
            })
            .collect();
        self.client
            .insert("order_items", &rows, Some(&user.access_token))
            .await?;

        let items_query = Query::new()
            .select("*")
            .eq("order_id", order.id)
            .order("id", true);
        self.client
            .select("order_items", &items_query, Some(&user.access_token))
            .await
    }

    /// Delete an order whose lines could not be written.
    async fn discard(&self, user: &CurrentUser, order: &Order) {
        let query = Query::new().eq("id", order.id);
        match self
            .client
            .delete("orders", &query, Some(&user.access_token))
            .await
        {
            Ok(()) => warn!(order_id = %order.id, "Discarded order without items"),
            Err(e) => {
                error!(order_id = %order.id, error = %e, "Failed to discard order without items");
            }
        }
    }
}
