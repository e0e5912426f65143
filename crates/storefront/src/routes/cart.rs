//! Cart route handlers.
//!
//! Each browser gets a cart key in its session; the key picks a manager from
//! the [`CartRegistry`](crate::cart::CartRegistry). The signed-in user, if any,
//! is handed to the manager on every request so mutations reach the remote
//! mirror.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::OwnedMutexGuard;
use tower_sessions::Session;
use tracing::instrument;
use uuid::Uuid;

use sundry_core::{CartItem, NewCartItem, ProductId, format_price};

use crate::cart::StorefrontCart;
use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::{CurrentUser, session_keys};
use crate::state::AppState;

/// Cart display data.
#[derive(Debug, Clone, Serialize)]
pub struct CartView {
    pub items: Vec<CartItem>,
    pub item_count: u64,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_price: Decimal,
    pub formatted_total: String,
    pub is_empty: bool,
}

impl From<&StorefrontCart> for CartView {
    fn from(cart: &StorefrontCart) -> Self {
        let total_price = cart.total_price();
        Self {
            items: cart.items().to_vec(),
            item_count: cart.item_count(),
            total_price,
            formatted_total: format_price(total_price),
            is_empty: cart.is_empty(),
        }
    }
}

/// Set quantity request body.
#[derive(Debug, Deserialize)]
pub struct UpdateQuantity {
    pub quantity: i64,
}

// =============================================================================
// Session Helpers
// =============================================================================

/// Get the browser's cart key, creating one on first use.
async fn cart_key(session: &Session) -> Result<Uuid> {
    if let Some(key) = session.get::<Uuid>(session_keys::CART_KEY).await? {
        return Ok(key);
    }

    let key = Uuid::new_v4();
    session.insert(session_keys::CART_KEY, key).await?;
    Ok(key)
}

/// Lock the browser's cart as it is, without touching its identity.
pub(crate) async fn lock_cart(
    state: &AppState,
    session: &Session,
) -> Result<OwnedMutexGuard<StorefrontCart>> {
    let key = cart_key(session).await?;
    Ok(state.carts().open(key).await.lock_owned().await)
}

/// Lock the browser's cart with the session's current identity applied.
///
/// A fresh manager is initialized (local load, then a merge with the stored
/// remote cart when signed in). A live manager that just gained a new user
/// is reconciled instead. The manager only keeps the new user once that merge
/// succeeds, so a failed merge is retried on the next request.
pub(crate) async fn open_cart(
    state: &AppState,
    session: &Session,
) -> Result<OwnedMutexGuard<StorefrontCart>> {
    let user = session
        .get::<CurrentUser>(session_keys::CURRENT_USER)
        .await?;
    let mut cart = lock_cart(state, session).await?;

    let previous = cart.session().as_ref().map(|u| u.id);
    let signed_in = user.as_ref().map(|u| u.id).filter(|id| previous != Some(*id));
    *cart.session_mut() = user;

    if !cart.is_initialized() {
        cart.initialize().await?;
    } else if let Some(user_id) = signed_in
        && let Err(e) = cart.reconcile().await
    {
        tracing::warn!(%user_id, error = %e, "Cart merge failed, will retry");
        *cart.session_mut() = None;
        return Err(e.into());
    }

    Ok(cart)
}

// =============================================================================
// Handlers
// =============================================================================

/// Show the cart.
#[instrument(skip(state, session))]
pub async fn show(State(state): State<AppState>, session: Session) -> Result<Json<CartView>> {
    let cart = open_cart(&state, &session).await?;
    Ok(Json(CartView::from(&*cart)))
}

/// Add one unit of a product.
#[instrument(skip(state, session, item), fields(product_id = %item.id))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    Json(item): Json<NewCartItem>,
) -> Result<Json<CartView>> {
    if item.price.is_sign_negative() {
        return Err(AppError::BadRequest("price must not be negative".to_string()));
    }

    let mut cart = open_cart(&state, &session).await?;
    cart.add_item(item).await?;
    Ok(Json(CartView::from(&*cart)))
}

/// Set the quantity of a line; zero or less removes it.
#[instrument(skip(state, session, body))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<ProductId>,
    Json(body): Json<UpdateQuantity>,
) -> Result<Json<CartView>> {
    let mut cart = open_cart(&state, &session).await?;
    cart.update_quantity(id, body.quantity).await?;
    Ok(Json(CartView::from(&*cart)))
}

/// Remove a line.
#[instrument(skip(state, session))]
pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<ProductId>,
) -> Result<Json<CartView>> {
    let mut cart = open_cart(&state, &session).await?;
    cart.remove_item(id).await?;
    Ok(Json(CartView::from(&*cart)))
}

/// Empty the cart.
#[instrument(skip(state, session))]
pub async fn clear(State(state): State<AppState>, session: Session) -> Result<StatusCode> {
    let mut cart = open_cart(&state, &session).await?;
    cart.clear_cart().await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Merge with the stored remote cart on demand.
#[instrument(skip(state, session, user), fields(user_id = %user.id))]
pub async fn sync(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
) -> Result<Json<CartView>> {
    let mut cart = open_cart(&state, &session).await?;
    cart.reconcile().await?;
    Ok(Json(CartView::from(&*cart)))
}
