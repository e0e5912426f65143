//! Order route handlers.
//!
//! These routes require authentication.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use tower_sessions::Session;
use tracing::instrument;

use sundry_core::OrderId;

use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::{Order, OrderWithItems, ShippingDetails};
use crate::routes::cart::open_cart;
use crate::services::OrderService;
use crate::state::AppState;

/// List the user's orders.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<Order>>> {
    let orders = OrderService::new(state.supabase()).orders(&user).await?;
    Ok(Json(orders))
}

/// Show one order with its lines.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<OrderId>,
) -> Result<Json<OrderWithItems>> {
    OrderService::new(state.supabase())
        .order(&user, id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("order {id}")))
}

/// Place an order from the cart, then empty the cart.
///
/// The order stands even if clearing the cart fails afterwards.
#[instrument(skip(state, session, user, shipping), fields(user_id = %user.id))]
pub async fn create(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Json(shipping): Json<ShippingDetails>,
) -> Result<(StatusCode, Json<OrderWithItems>)> {
    let mut cart = open_cart(&state, &session).await?;

    let order = OrderService::new(state.supabase())
        .place_order(&user, cart.cart(), &shipping)
        .await?;

    if let Err(e) = cart.clear_cart().await {
        tracing::warn!(order_id = %order.order.id, error = %e, "Failed to clear cart after order");
    }

    Ok((StatusCode::CREATED, Json(order)))
}
