//! Product and category reads.
//!
//! Catalog data changes rarely and is the same for every visitor, so reads
//! go through a `moka` cache (5-minute TTL) and use the anon key.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use tracing::{debug, instrument};

use sundry_core::ProductId;

use crate::models::{Category, Product};
use crate::supabase::{Query, SupabaseClient, SupabaseError};

/// Number of products returned by [`CatalogService::featured`] by default.
pub const DEFAULT_FEATURED_LIMIT: usize = 4;

#[derive(Debug, Clone)]
enum CacheValue {
    Products(Arc<Vec<Product>>),
    Product(Box<Product>),
    Categories(Arc<Vec<Category>>),
    Category(Box<Category>),
}

/// Cached catalog reader.
#[derive(Clone)]
pub struct CatalogService {
    inner: Arc<CatalogServiceInner>,
}

struct CatalogServiceInner {
    client: SupabaseClient,
    cache: Cache<String, CacheValue>,
}

impl CatalogService {
    #[must_use]
    pub fn new(client: SupabaseClient) -> Self {
        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();

        Self {
            inner: Arc::new(CatalogServiceInner { client, cache }),
        }
    }

    /// All products, ordered by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn products(&self) -> Result<Arc<Vec<Product>>, SupabaseError> {
        let query = Query::new().select("*").order("name", true);
        self.cached_products("products:all".to_string(), query).await
    }

    /// One product by ID, or `None` if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn product(&self, id: ProductId) -> Result<Option<Product>, SupabaseError> {
        let cache_key = format!("product:{id}");
        if let Some(CacheValue::Product(product)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for product");
            return Ok(Some(*product));
        }

        let query = Query::new().select("*").eq("id", id);
        let product: Option<Product> = self
            .inner
            .client
            .select_single("products", &query, None)
            .await?;

        if let Some(product) = &product {
            self.inner
                .cache
                .insert(cache_key, CacheValue::Product(Box::new(product.clone())))
                .await;
        }
        Ok(product)
    }

    /// Products filed under the category with `slug`.
    ///
    /// An unknown slug yields an empty list.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn products_in_category(
        &self,
        slug: &str,
    ) -> Result<Arc<Vec<Product>>, SupabaseError> {
        let query = Query::new()
            .select("*,categories!inner(slug)")
            .eq("categories.slug", slug)
            .order("name", true);
        self.cached_products(format!("products:category:{slug}"), query)
            .await
    }

    /// The newest `limit` products.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn featured(&self, limit: usize) -> Result<Arc<Vec<Product>>, SupabaseError> {
        let query = Query::new()
            .select("*")
            .order("created_at", false)
            .limit(limit);
        self.cached_products(format!("products:featured:{limit}"), query)
            .await
    }

    /// All categories, ordered by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn categories(&self) -> Result<Arc<Vec<Category>>, SupabaseError> {
        let cache_key = "categories:all".to_string();
        if let Some(CacheValue::Categories(categories)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for categories");
            return Ok(categories);
        }

        let query = Query::new().select("*").order("name", true);
        let categories: Arc<Vec<Category>> = Arc::new(
            self.inner
                .client
                .select("categories", &query, None)
                .await?,
        );
        self.inner
            .cache
            .insert(cache_key, CacheValue::Categories(Arc::clone(&categories)))
            .await;
        Ok(categories)
    }

    /// One category by slug, or `None` if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn category(&self, slug: &str) -> Result<Option<Category>, SupabaseError> {
        let cache_key = format!("category:{slug}");
        if let Some(CacheValue::Category(category)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for category");
            return Ok(Some(*category));
        }

        let query = Query::new().select("*").eq("slug", slug);
        let category: Option<Category> = self
            .inner
            .client
            .select_single("categories", &query, None)
            .await?;

        if let Some(category) = &category {
            self.inner
                .cache
                .insert(cache_key, CacheValue::Category(Box::new(category.clone())))
                .await;
        }
        Ok(category)
    }

    /// Drop every cached entry.
    pub async fn invalidate_all(&self) {
        self.inner.cache.invalidate_all();
        self.inner.cache.run_pending_tasks().await;
    }

    async fn cached_products(
        &self,
        cache_key: String,
        query: Query,
    ) -> Result<Arc<Vec<Product>>, SupabaseError> {
        if let Some(CacheValue::Products(products)) = self.inner.cache.get(&cache_key).await {
            debug!(key = %cache_key, "Cache hit for products");
            return Ok(products);
        }

        let products: Arc<Vec<Product>> = Arc::new(
            self.inner
                .client
                .select("products", &query, None)
                .await?,
        );
        self.inner
            .cache
            .insert(cache_key, CacheValue::Products(Arc::clone(&products)))
            .await;
        Ok(products)
    }
}
