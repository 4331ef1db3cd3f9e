//! Product catalog client with in-memory caching.
//!
//! Catalog data is public and read-only, so responses are cached via `moka`
//! (5-minute TTL). Cart and account data is never cached here - mutable
//! state always round-trips to the backend.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use driftwood_core::{Price, ProductId};

use crate::api::{ApiClient, ApiError};
use crate::identity::Identity;

/// A catalog product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    pub description: String,
    pub price: Price,
    pub image_url: Option<String>,
    pub available: bool,
}

/// One page of the product listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductPage {
    pub products: Vec<Product>,
    pub page: u32,
    pub total_pages: u32,
}

#[derive(Clone)]
enum CacheValue {
    Product(Box<Product>),
    Page(ProductPage),
}

/// Client for the backend catalog endpoints.
#[derive(Clone)]
pub struct CatalogClient {
    inner: Arc<CatalogClientInner>,
}

struct CatalogClientInner {
    api: ApiClient,
    cache: Cache<String, CacheValue>,
}

impl CatalogClient {
    /// Create a catalog client over the backend API client.
    #[must_use]
    pub fn new(api: ApiClient) -> Self {
        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();

        Self {
            inner: Arc::new(CatalogClientInner { api, cache }),
        }
    }

    /// Get a product by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the product is not found or the request fails.
    #[instrument(skip(self, identity), fields(product_id = %product_id))]
    pub async fn get_product(
        &self,
        product_id: ProductId,
        identity: &Identity,
    ) -> Result<Product, ApiError> {
        let cache_key = format!("product:{product_id}");

        if let Some(CacheValue::Product(product)) = self.inner.cache.get(&cache_key).await {
            debug!("cache hit for product");
            return Ok(*product);
        }

        let path = format!("/products/{product_id}");
        let product: Product = self.inner.api.get(&path, identity).await?;

        self.inner
            .cache
            .insert(cache_key, CacheValue::Product(Box::new(product.clone())))
            .await;

        Ok(product)
    }

    /// Get a page of the product listing.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self, identity))]
    pub async fn get_products(
        &self,
        page: u32,
        identity: &Identity,
    ) -> Result<ProductPage, ApiError> {
        let cache_key = format!("products:{page}");

        if let Some(CacheValue::Page(products)) = self.inner.cache.get(&cache_key).await {
            debug!("cache hit for product page");
            return Ok(products);
        }

        let path = format!("/products?page={page}");
        let products: ProductPage = self.inner.api.get(&path, identity).await?;

        self.inner
            .cache
            .insert(cache_key, CacheValue::Page(products.clone()))
            .await;

        Ok(products)
    }

    /// Invalidate all cached catalog data.
    pub async fn invalidate_all(&self) {
        self.inner.cache.invalidate_all();
        self.inner.cache.run_pending_tasks().await;
    }
}
