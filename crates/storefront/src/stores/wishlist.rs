//! Wishlist store: a set of product references per identity.

use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::instrument;

use driftwood_core::ProductId;

use crate::api::{ApiClient, ApiError};
use crate::identity::Identity;

use super::{Slice, SliceView, lock};

/// The wishlist: product references only, no quantities, no ordering
/// guarantee.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Wishlist {
    pub product_ids: Vec<ProductId>,
}

impl Wishlist {
    /// Whether a product is on the list.
    #[must_use]
    pub fn contains(&self, product_id: ProductId) -> bool {
        self.product_ids.contains(&product_id)
    }

    /// Number of saved products.
    #[must_use]
    pub fn len(&self) -> usize {
        self.product_ids.len()
    }

    /// Whether the list is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.product_ids.is_empty()
    }
}

#[derive(Debug, Serialize)]
struct WishlistRequest {
    product_id: ProductId,
}

/// Store for the visitor's wishlist.
pub struct WishlistStore {
    client: ApiClient,
    identity: Identity,
    slice: Mutex<Slice<Wishlist>>,
}

impl WishlistStore {
    /// Create a wishlist store bound to one identity.
    #[must_use]
    pub fn new(client: ApiClient, identity: Identity) -> Self {
        Self {
            client,
            identity,
            slice: Mutex::new(Slice::default()),
        }
    }

    /// Snapshot the slice for rendering.
    #[must_use]
    pub fn view(&self) -> SliceView<Wishlist> {
        lock(&self.slice).view()
    }

    async fn run(
        &self,
        call: impl Future<Output = Result<Wishlist, ApiError>>,
    ) -> SliceView<Wishlist> {
        let ticket = lock(&self.slice).begin();
        let result = call.await;
        let mut slice = lock(&self.slice);
        slice.resolve(ticket, result);
        slice.view()
    }

    /// Fetch the wishlist.
    #[instrument(skip(self))]
    pub async fn fetch(&self) -> SliceView<Wishlist> {
        self.run(self.client.get("/accounts/wishlist", &self.identity))
            .await
    }

    /// Add a product reference. Adding an already-saved product is a no-op
    /// on the backend side; the returned set is authoritative.
    #[instrument(skip(self))]
    pub async fn add(&self, product_id: ProductId) -> SliceView<Wishlist> {
        self.run(self.client.post(
            "/accounts/wishlist",
            &self.identity,
            &WishlistRequest { product_id },
        ))
        .await
    }

    /// Remove a product reference.
    #[instrument(skip(self))]
    pub async fn remove(&self, product_id: ProductId) -> SliceView<Wishlist> {
        let path = format!("/accounts/wishlist/{product_id}/remove");
        self.run(
            self.client
                .post(&path, &self.identity, &serde_json::json!({})),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains() {
        let wishlist = Wishlist {
            product_ids: vec![ProductId::new(1), ProductId::new(5)],
        };
        assert!(wishlist.contains(ProductId::new(5)));
        assert!(!wishlist.contains(ProductId::new(2)));
        assert_eq!(wishlist.len(), 2);
    }

    #[test]
    fn test_empty() {
        assert!(Wishlist::default().is_empty());
    }
}
