//! HTTP route handlers for the storefront JSON API.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                      - Health check
//!
//! # Cart
//! GET    /api/cart                    - Cart view
//! DELETE /api/cart                    - Clear cart
//! POST   /api/cart/items              - Add one unit of a product
//! PATCH  /api/cart/items/{id}         - Set quantity (0 removes)
//! DELETE /api/cart/items/{id}         - Remove a line
//! POST   /api/cart/sync               - Merge with the stored cart (auth)
//!
//! # Catalog
//! GET    /api/products                - Product listing
//! GET    /api/products/featured       - Newest products (?limit=)
//! GET    /api/products/{id}           - Product detail
//! GET    /api/categories              - Category listing
//! GET    /api/categories/{slug}       - Category with its products
//!
//! # Auth
//! POST   /api/auth/login              - Sign in (reconciles the cart)
//! POST   /api/auth/register           - Sign up
//! POST   /api/auth/logout             - Sign out (cart stays)
//! GET    /api/auth/me                 - Current user
//!
//! # Orders (requires auth)
//! GET    /api/orders                  - Order history
//! POST   /api/orders                  - Place an order from the cart
//! GET    /api/orders/{id}             - Order detail
//!
//! # Account (requires auth)
//! GET    /api/account/profile         - Profile
//! PUT    /api/account/profile         - Update profile
//! ```

pub mod account;
pub mod auth;
pub mod cart;
pub mod orders;
pub mod products;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, patch, post},
};
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use crate::middleware::{create_session_layer, request_id_middleware};
use crate::state::AppState;

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show).delete(cart::clear))
        .route("/items", post(cart::add))
        .route("/items/{id}", patch(cart::update).delete(cart::remove))
        .route("/sync", post(cart::sync))
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/featured", get(products::featured))
        .route("/{id}", get(products::show))
}

/// Create the category routes router.
pub fn category_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::categories))
        .route("/{slug}", get(products::category))
}

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(auth::login))
        .route("/register", post(auth::register))
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me))
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::index).post(orders::create))
        .route("/{id}", get(orders::show))
}

/// Create the account routes router.
pub fn account_routes() -> Router<AppState> {
    Router::new().route(
        "/profile",
        get(account::profile).put(account::update_profile),
    )
}

/// Create all API routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/api/cart", cart_routes())
        .nest("/api/products", product_routes())
        .nest("/api/categories", category_routes())
        .nest("/api/auth", auth_routes())
        .nest("/api/orders", order_routes())
        .nest("/api/account", account_routes())
}

/// Build the complete application: routes, health check and middleware.
pub fn app(state: AppState) -> Router {
    let session_layer = create_session_layer(state.config());

    Router::new()
        .route("/health", get(health))
        .merge(routes())
        .layer(session_layer)
        .layer(axum_middleware::from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}
