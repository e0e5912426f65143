//! Long-lived cart managers for the storefront, one per browser.
//!
//! Each browser session carries a cart key; the registry maps it to a
//! manager whose local mirror is the directory `<storage_dir>/<cart key>`.
//! Managers that sit idle are dropped from memory (their files stay) and are
//! re-initialized from disk on the next request.

use std::path::PathBuf;
use std::sync::Arc;

use moka::future::Cache;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{CartManager, FileStorage, SupabaseCartStore};
use crate::config::CartConfig;
use crate::models::CurrentUser;

/// The manager type the storefront serves.
pub type StorefrontCart = CartManager<FileStorage, SupabaseCartStore, Option<CurrentUser>>;

/// A manager shared between the requests of one browser.
pub type SharedCart = Arc<Mutex<StorefrontCart>>;

/// Upper bound on carts held in memory at once.
const MAX_LIVE_CARTS: u64 = 10_000;

/// Cheaply cloneable map from cart key to manager.
#[derive(Clone)]
pub struct CartRegistry {
    inner: Arc<CartRegistryInner>,
}

struct CartRegistryInner {
    carts: Cache<Uuid, SharedCart>,
    storage_dir: PathBuf,
    remote: SupabaseCartStore,
}

impl CartRegistry {
    #[must_use]
    pub fn new(config: &CartConfig, remote: SupabaseCartStore) -> Self {
        let carts = Cache::builder()
            .max_capacity(MAX_LIVE_CARTS)
            .time_to_idle(config.idle_timeout)
            .build();

        Self {
            inner: Arc::new(CartRegistryInner {
                carts,
                storage_dir: config.storage_dir.clone(),
                remote,
            }),
        }
    }

    /// The manager for `cart_key`, created uninitialized on first use.
    pub async fn open(&self, cart_key: Uuid) -> SharedCart {
        self.inner
            .carts
            .get_with(cart_key, async {
                tracing::debug!(%cart_key, "Opening cart");
                let local = FileStorage::new(self.inner.storage_dir.join(cart_key.to_string()));
                Arc::new(Mutex::new(CartManager::new(
                    local,
                    self.inner.remote.clone(),
                    None,
                )))
            })
            .await
    }

    /// Number of managers currently held in memory.
    #[must_use]
    pub fn live_carts(&self) -> u64 {
        self.inner.carts.entry_count()
    }
}
