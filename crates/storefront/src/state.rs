//! Application state shared across handlers.

use std::sync::Arc;

use crate::api::ApiClient;
use crate::catalog::CatalogClient;
use crate::checkout::ProviderGateway;
use crate::config::StorefrontConfig;
use crate::identity::Identity;
use crate::stores::{CartStore, MetricsStore, PaymentStore, UserStore, WishlistStore};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to the
/// long-lived clients. Domain stores are constructed per request, bound to
/// that request's identity.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    api: ApiClient,
    catalog: CatalogClient,
    gateway: ProviderGateway,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(config: StorefrontConfig) -> Self {
        let api = ApiClient::new(&config.backend);
        let gateway = ProviderGateway::new(&config.provider);
        Self::with_clients(config, api, gateway)
    }

    /// Build state over explicit clients.
    ///
    /// Used by tests to point the handlers at an in-process stub backend.
    #[must_use]
    pub fn with_clients(config: StorefrontConfig, api: ApiClient, gateway: ProviderGateway) -> Self {
        let catalog = CatalogClient::new(api.clone());
        Self {
            inner: Arc::new(AppStateInner {
                config,
                api,
                catalog,
                gateway,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the backend API client.
    #[must_use]
    pub fn api(&self) -> &ApiClient {
        &self.inner.api
    }

    /// Get a reference to the catalog client.
    #[must_use]
    pub fn catalog(&self) -> &CatalogClient {
        &self.inner.catalog
    }

    /// Get a reference to the payment gateway.
    #[must_use]
    pub fn gateway(&self) -> &ProviderGateway {
        &self.inner.gateway
    }

    /// Build a cart store bound to an identity.
    #[must_use]
    pub fn cart_store(&self, identity: Identity) -> CartStore {
        CartStore::new(self.inner.api.clone(), identity)
    }

    /// Build a wishlist store bound to an identity.
    #[must_use]
    pub fn wishlist_store(&self, identity: Identity) -> WishlistStore {
        WishlistStore::new(self.inner.api.clone(), identity)
    }

    /// Build a user store bound to an identity.
    #[must_use]
    pub fn user_store(&self, identity: Identity) -> UserStore {
        UserStore::new(self.inner.api.clone(), identity)
    }

    /// Build a payment store bound to an identity.
    #[must_use]
    pub fn payment_store(&self, identity: Identity) -> PaymentStore {
        PaymentStore::new(self.inner.api.clone(), identity)
    }

    /// Build a metrics store bound to a staff identity.
    #[must_use]
    pub fn metrics_store(&self, identity: Identity) -> MetricsStore {
        MetricsStore::new(self.inner.api.clone(), identity)
    }
}
