//! Cart manager: an in-memory cart mirrored locally and, for signed-in users,
//! remotely.
//!
//! # Architecture
//!
//! - [`CartManager`] owns the [`Cart`]; the mirrors are never read again once
//!   the manager is initialized, except during [reconciliation](CartManager::reconcile)
//! - Every mutation updates memory first, then the local mirror under
//!   [`CART_STORAGE_KEY`], then (with a session) the remote mirror
//! - Local mirror failures are logged and absorbed; remote failures are
//!   returned as [`CartError::Remote`] after memory and the local mirror have
//!   already changed
//!
//! # Example
//!
//! ```rust,ignore
//! let mut cart = CartManager::new(FileStorage::new(dir), SupabaseCartStore::new(client), None);
//! cart.initialize().await?;
//! cart.add_item(product.to_cart_item()).await?;
//!
//! // Sign-in: hand over the identity, then merge with the stored cart
//! *cart.session_mut() = Some(user);
//! cart.reconcile().await?;
//! ```

pub mod registry;
pub mod remote;
pub mod session;
pub mod storage;

use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use sundry_core::{Cart, CartItem, NewCartItem, ProductId};

use crate::models::CurrentUser;
use crate::supabase::SupabaseError;

pub use registry::{CartRegistry, SharedCart, StorefrontCart};
pub use remote::{RemoteCartStore, SupabaseCartStore};
pub use session::{Anonymous, SessionProvider};
pub use storage::{FileStorage, LocalStorage, MemoryStorage, StorageError};

/// Local storage key holding the serialized item list.
pub const CART_STORAGE_KEY: &str = "cartItems";

/// Errors surfaced by cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// The remote mirror could not be read or written.
    #[error("remote cart sync failed: {0}")]
    Remote(#[from] SupabaseError),
}

/// Owns one cart and keeps its mirrors in step.
pub struct CartManager<L, R, S> {
    cart: Cart,
    local: L,
    remote: R,
    session: S,
    initialized: bool,
}

impl<L, R, S> std::fmt::Debug for CartManager<L, R, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartManager")
            .field("cart", &self.cart)
            .field("initialized", &self.initialized)
            .finish_non_exhaustive()
    }
}

impl<L, R, S> CartManager<L, R, S>
where
    L: LocalStorage,
    R: RemoteCartStore,
    S: SessionProvider,
{
    /// Create an uninitialized manager with an empty cart.
    #[must_use]
    pub const fn new(local: L, remote: R, session: S) -> Self {
        Self {
            cart: Cart::new(),
            local,
            remote,
            session,
            initialized: false,
        }
    }

    /// Whether [`initialize`](Self::initialize) has completed.
    #[must_use]
    pub const fn is_initialized(&self) -> bool {
        self.initialized
    }

    #[must_use]
    pub const fn cart(&self) -> &Cart {
        &self.cart
    }

    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        self.cart.items()
    }

    /// Sum of quantities.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.cart.item_count()
    }

    /// Sum of `price * quantity`.
    #[must_use]
    pub fn total_price(&self) -> Decimal {
        self.cart.total_price()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cart.is_empty()
    }

    #[must_use]
    pub const fn session(&self) -> &S {
        &self.session
    }

    /// Replace or update the session in place (sign-in, sign-out, new token).
    pub const fn session_mut(&mut self) -> &mut S {
        &mut self.session
    }

    /// Load the cart from the local mirror and, with a session, reconcile it
    /// with the remote one.
    ///
    /// Does nothing once it has succeeded. Absent or malformed local data
    /// yields an empty cart. If reconciliation fails the manager stays
    /// uninitialized (the next call retries) but keeps the loaded items.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Remote` if reconciliation fails.
    #[instrument(skip(self))]
    pub async fn initialize(&mut self) -> Result<(), CartError> {
        if self.initialized {
            return Ok(());
        }

        self.cart = self.load_local();
        debug!(items = self.cart.len(), "Loaded local cart");

        self.reconcile().await?;
        self.initialized = true;
        Ok(())
    }

    /// Add one unit of `product`.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Remote` if the remote write fails.
    #[instrument(skip(self, product), fields(product_id = %product.id))]
    pub async fn add_item(&mut self, product: NewCartItem) -> Result<(), CartError> {
        self.cart.add(product);
        self.persist().await
    }

    /// Remove the line for `id`; an unknown `id` is ignored.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Remote` if the remote write fails.
    #[instrument(skip(self))]
    pub async fn remove_item(&mut self, id: ProductId) -> Result<(), CartError> {
        if !self.cart.remove(id) {
            return Ok(());
        }
        self.persist().await
    }

    /// Set the quantity of the line for `id`.
    ///
    /// Zero or less removes the line. An unknown `id` is ignored.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Remote` if the remote write fails.
    #[instrument(skip(self))]
    pub async fn update_quantity(&mut self, id: ProductId, quantity: i64) -> Result<(), CartError> {
        if self.cart.get(id).is_none() {
            return Ok(());
        }
        self.cart.set_quantity(id, quantity);
        self.persist().await
    }

    /// Empty the cart. Remotely this deletes the user's rows and inserts none.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Remote` if the remote delete fails.
    #[instrument(skip(self))]
    pub async fn clear_cart(&mut self) -> Result<(), CartError> {
        self.cart.clear();
        self.persist().await
    }

    /// Merge the remote cart into the in-memory one and write the result to
    /// both mirrors. Without a session this does nothing.
    ///
    /// Shared products keep local names, prices and images with the larger
    /// quantity. Running it again against its own output changes nothing.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Remote` if the remote cart cannot be read or
    /// written.
    #[instrument(skip(self))]
    pub async fn reconcile(&mut self) -> Result<(), CartError> {
        let Some(user) = self.session.current_user() else {
            return Ok(());
        };

        let remote = Cart::from_items(self.remote.fetch(user).await?);
        let merged = Cart::merge(&self.cart, &remote);
        info!(
            user_id = %user.id,
            local = self.cart.len(),
            remote = remote.len(),
            merged = merged.len(),
            "Reconciled cart"
        );

        self.cart = merged;
        self.save_local();
        self.save_remote(user).await
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    async fn persist(&self) -> Result<(), CartError> {
        self.save_local();
        match self.session.current_user() {
            Some(user) => self.save_remote(user).await,
            None => Ok(()),
        }
    }

    fn load_local(&self) -> Cart {
        let raw = match self.local.get_item(CART_STORAGE_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Cart::new(),
            Err(e) => {
                warn!(error = %e, "Failed to read local cart, starting empty");
                return Cart::new();
            }
        };

        serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!(error = %e, "Discarding malformed local cart");
            Cart::new()
        })
    }

    fn save_local(&self) {
        let result = serde_json::to_string(&self.cart)
            .map_err(|e| e.to_string())
            .and_then(|json| {
                self.local
                    .set_item(CART_STORAGE_KEY, &json)
                    .map_err(|e| e.to_string())
            });
        if let Err(error) = result {
            warn!(%error, "Failed to write local cart");
        }
    }

    async fn save_remote(&self, user: &CurrentUser) -> Result<(), CartError> {
        self.remote.delete_all(user).await?;
        if !self.cart.is_empty() {
            self.remote.insert(user, self.cart.items()).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
pub(crate) mod tests {
    use std::sync::{Arc, Mutex};

    use secrecy::SecretString;

    use sundry_core::Email;

    use super::*;

    /// A call the fake remote received.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub(crate) enum RemoteCall {
        Fetch,
        DeleteAll,
        Insert(Vec<CartItem>),
    }

    #[derive(Debug, Default)]
    struct FakeRemoteState {
        rows: Vec<CartItem>,
        calls: Vec<RemoteCall>,
        fail: bool,
    }

    /// Remote cart store that keeps rows in memory and records calls.
    #[derive(Debug, Clone, Default)]
    pub(crate) struct FakeRemote {
        state: Arc<Mutex<FakeRemoteState>>,
    }

    impl FakeRemote {
        pub(crate) fn with_rows(rows: Vec<CartItem>) -> Self {
            let remote = Self::default();
            remote.state.lock().unwrap().rows = rows;
            remote
        }

        pub(crate) fn rows(&self) -> Vec<CartItem> {
            self.state.lock().unwrap().rows.clone()
        }

        pub(crate) fn calls(&self) -> Vec<RemoteCall> {
            self.state.lock().unwrap().calls.clone()
        }

        pub(crate) fn reset_calls(&self) {
            self.state.lock().unwrap().calls.clear();
        }

        pub(crate) fn set_failing(&self, fail: bool) {
            self.state.lock().unwrap().fail = fail;
        }

        fn record(&self, call: RemoteCall) -> Result<MutexGuardRows<'_>, SupabaseError> {
            let mut state = self.state.lock().unwrap();
            state.calls.push(call);
            if state.fail {
                return Err(SupabaseError::Api {
                    status: 503,
                    code: None,
                    message: "unavailable".to_string(),
                });
            }
            Ok(state)
        }
    }

    type MutexGuardRows<'a> = std::sync::MutexGuard<'a, FakeRemoteState>;

    impl RemoteCartStore for FakeRemote {
        async fn fetch(&self, _user: &CurrentUser) -> Result<Vec<CartItem>, SupabaseError> {
            let state = self.record(RemoteCall::Fetch)?;
            Ok(state.rows.clone())
        }

        async fn delete_all(&self, _user: &CurrentUser) -> Result<(), SupabaseError> {
            let mut state = self.record(RemoteCall::DeleteAll)?;
            state.rows.clear();
            Ok(())
        }

        async fn insert(&self, _user: &CurrentUser, items: &[CartItem]) -> Result<(), SupabaseError> {
            let mut state = self.record(RemoteCall::Insert(items.to_vec()))?;
            state.rows.extend_from_slice(items);
            Ok(())
        }
    }

    pub(crate) fn user() -> CurrentUser {
        CurrentUser {
            id: "0b8f6a52-3c1e-4d2a-9f6b-7e5d4c3b2a19".parse().unwrap(),
            email: Email::parse("shopper@example.com").unwrap(),
            access_token: SecretString::from("user-jwt"),
        }
    }

    fn product(id: i64, price: i64) -> NewCartItem {
        NewCartItem {
            id: ProductId::new(id),
            name: format!("Product {id}"),
            price: Decimal::from(price),
            image: format!("/img/{id}.png"),
        }
    }

    fn line(id: i64, quantity: u32) -> CartItem {
        product(id, 1).with_quantity(quantity)
    }

    fn local_with(items: &[CartItem]) -> MemoryStorage {
        let storage = MemoryStorage::new();
        storage
            .set_item(CART_STORAGE_KEY, &serde_json::to_string(items).unwrap())
            .unwrap();
        storage
    }

    fn stored(manager: &CartManager<MemoryStorage, FakeRemote, impl SessionProvider>) -> Cart {
        let raw = manager.local.get_item(CART_STORAGE_KEY).unwrap().unwrap();
        serde_json::from_str(&raw).unwrap()
    }

    #[tokio::test]
    async fn test_widget_scenario_without_session() {
        let remote = FakeRemote::default();
        let mut cart = CartManager::new(MemoryStorage::new(), remote.clone(), Anonymous);
        cart.initialize().await.unwrap();

        let widget = NewCartItem {
            id: ProductId::new(7),
            name: "Widget".to_string(),
            price: Decimal::from(10),
            image: "x".to_string(),
        };
        cart.add_item(widget.clone()).await.unwrap();
        assert_eq!(cart.item_count(), 1);
        assert_eq!(cart.total_price(), Decimal::from(10));

        cart.add_item(widget).await.unwrap();
        assert_eq!(cart.item_count(), 2);
        assert_eq!(cart.total_price(), Decimal::from(20));
        assert_eq!(cart.items().len(), 1);

        cart.update_quantity(ProductId::new(7), 0).await.unwrap();
        assert!(cart.is_empty());
        assert!(stored(&cart).is_empty());
        assert!(remote.calls().is_empty());
    }

    #[tokio::test]
    async fn test_initialize_loads_local_and_is_idempotent() {
        let local = local_with(&[line(1, 2), line(2, 1)]);
        let mut cart = CartManager::new(local, FakeRemote::default(), Anonymous);
        assert!(!cart.is_initialized());

        cart.initialize().await.unwrap();
        assert!(cart.is_initialized());
        assert_eq!(cart.item_count(), 3);

        cart.local.set_item(CART_STORAGE_KEY, "[]").unwrap();
        cart.initialize().await.unwrap();
        assert_eq!(cart.item_count(), 3);
    }

    #[tokio::test]
    async fn test_initialize_with_malformed_local_data_starts_empty() {
        let local = MemoryStorage::new();
        local.set_item(CART_STORAGE_KEY, "{not json").unwrap();
        let mut cart = CartManager::new(local, FakeRemote::default(), Anonymous);

        cart.initialize().await.unwrap();
        assert!(cart.is_initialized());
        assert!(cart.is_empty());
    }

    #[tokio::test]
    async fn test_initialize_with_session_merges_and_writes_back() {
        let local = local_with(&[line(1, 2), line(2, 1)]);
        let remote = FakeRemote::with_rows(vec![line(1, 5), line(3, 4)]);
        let mut cart = CartManager::new(local, remote.clone(), Some(user()));

        cart.initialize().await.unwrap();

        let expected = vec![line(1, 5), line(2, 1), line(3, 4)];
        assert_eq!(cart.items(), expected.as_slice());
        assert_eq!(stored(&cart).items(), expected.as_slice());
        assert_eq!(remote.rows(), expected);
        assert_eq!(
            remote.calls(),
            vec![
                RemoteCall::Fetch,
                RemoteCall::DeleteAll,
                RemoteCall::Insert(expected.clone())
            ]
        );
    }

    #[tokio::test]
    async fn test_reconcile_is_a_fixed_point() {
        let local = local_with(&[line(1, 1), line(4, 2)]);
        let remote = FakeRemote::with_rows(vec![line(1, 3), line(5, 1)]);
        let mut cart = CartManager::new(local, remote.clone(), Some(user()));
        cart.initialize().await.unwrap();
        let first = cart.cart().clone();

        cart.reconcile().await.unwrap();
        assert_eq!(cart.cart(), &first);
        assert_eq!(remote.rows(), first.items());
    }

    #[tokio::test]
    async fn test_initialize_failure_keeps_local_state_and_retries() {
        let local = local_with(&[line(1, 2)]);
        let remote = FakeRemote::with_rows(vec![line(2, 1)]);
        remote.set_failing(true);
        let mut cart = CartManager::new(local, remote.clone(), Some(user()));

        let err = cart.initialize().await.unwrap_err();
        assert!(matches!(err, CartError::Remote(_)));
        assert!(!cart.is_initialized());
        assert_eq!(cart.items(), &[line(1, 2)]);

        remote.set_failing(false);
        cart.initialize().await.unwrap();
        assert!(cart.is_initialized());
        assert_eq!(cart.items(), &[line(1, 2), line(2, 1)]);
    }

    #[tokio::test]
    async fn test_mutations_replace_remote_rows() {
        let remote = FakeRemote::default();
        let mut cart = CartManager::new(MemoryStorage::new(), remote.clone(), Some(user()));
        cart.initialize().await.unwrap();
        remote.reset_calls();

        cart.add_item(product(1, 5)).await.unwrap();
        cart.add_item(product(2, 3)).await.unwrap();
        cart.update_quantity(ProductId::new(1), 4).await.unwrap();

        let expected = vec![
            product(1, 5).with_quantity(4),
            product(2, 3).with_quantity(1),
        ];
        assert_eq!(remote.rows(), expected);
        assert_eq!(remote.calls().len(), 6);
        assert_eq!(remote.calls()[4], RemoteCall::DeleteAll);
        assert_eq!(remote.calls()[5], RemoteCall::Insert(expected));
    }

    #[tokio::test]
    async fn test_unknown_ids_are_ignored_without_persisting() {
        let local = local_with(&[line(1, 2)]);
        let remote = FakeRemote::default();
        let mut cart = CartManager::new(local, remote.clone(), Some(user()));
        cart.initialize().await.unwrap();
        remote.reset_calls();

        cart.remove_item(ProductId::new(9)).await.unwrap();
        cart.update_quantity(ProductId::new(9), 3).await.unwrap();
        cart.update_quantity(ProductId::new(9), 0).await.unwrap();

        assert_eq!(cart.items(), &[line(1, 2)]);
        assert!(remote.calls().is_empty());
    }

    #[tokio::test]
    async fn test_update_quantity_sets_exact_value_or_removes() {
        let mut cart = CartManager::new(
            local_with(&[line(1, 2), line(2, 2)]),
            FakeRemote::default(),
            Anonymous,
        );
        cart.initialize().await.unwrap();

        cart.update_quantity(ProductId::new(1), 7).await.unwrap();
        assert_eq!(cart.cart().get(ProductId::new(1)).unwrap().quantity, 7);

        cart.update_quantity(ProductId::new(2), -1).await.unwrap();
        assert!(cart.cart().get(ProductId::new(2)).is_none());
        assert_eq!(stored(&cart).items(), &[line(1, 7)]);
    }

    #[tokio::test]
    async fn test_clear_deletes_remote_without_insert() {
        let remote = FakeRemote::with_rows(vec![line(1, 2), line(2, 1)]);
        let mut cart = CartManager::new(MemoryStorage::new(), remote.clone(), Some(user()));
        cart.initialize().await.unwrap();
        remote.reset_calls();

        cart.clear_cart().await.unwrap();

        assert_eq!(cart.item_count(), 0);
        assert_eq!(cart.total_price(), Decimal::ZERO);
        assert!(stored(&cart).is_empty());
        assert_eq!(remote.calls(), vec![RemoteCall::DeleteAll]);
        assert!(remote.rows().is_empty());
    }

    #[tokio::test]
    async fn test_remote_failure_leaves_local_updated() {
        let remote = FakeRemote::default();
        let mut cart = CartManager::new(MemoryStorage::new(), remote.clone(), Some(user()));
        cart.initialize().await.unwrap();
        remote.set_failing(true);

        let err = cart.add_item(product(3, 4)).await.unwrap_err();
        assert!(matches!(err, CartError::Remote(SupabaseError::Api { status: 503, .. })));
        assert_eq!(cart.item_count(), 1);
        assert_eq!(stored(&cart).item_count(), 1);
    }

    #[tokio::test]
    async fn test_sign_in_reconciles_anonymous_cart() {
        let remote = FakeRemote::with_rows(vec![line(2, 3)]);
        let mut cart = CartManager::new(MemoryStorage::new(), remote.clone(), None);
        cart.initialize().await.unwrap();
        cart.add_item(product(1, 1)).await.unwrap();
        assert!(remote.calls().is_empty());

        *cart.session_mut() = Some(user());
        cart.reconcile().await.unwrap();

        assert_eq!(cart.items(), &[line(1, 1), line(2, 3)]);
        assert_eq!(remote.rows(), vec![line(1, 1), line(2, 3)]);

        *cart.session_mut() = None;
        remote.reset_calls();
        cart.clear_cart().await.unwrap();
        assert!(remote.calls().is_empty());
    }
}
