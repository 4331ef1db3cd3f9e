//! Cart store: line items synchronized with the backend cart resource.

use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::instrument;

use driftwood_core::{CurrencyCode, LineItemId, Price, ProductId};

use crate::api::{ApiClient, ApiError};
use crate::identity::Identity;

use super::{Slice, SliceView, lock};

/// One cart line: a product reference, a unit-price snapshot, and a quantity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItem {
    pub id: LineItemId,
    pub product_id: ProductId,
    pub title: String,
    pub unit_price: Price,
    pub quantity: u32,
    pub image_url: Option<String>,
}

impl LineItem {
    /// Price times quantity for this line.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.unit_price.times(self.quantity)
    }
}

/// The cart: an ordered collection of line items.
///
/// An empty cart is a valid terminal state, not an error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Cart {
    pub items: Vec<LineItem>,
}

impl Cart {
    /// Invariant: total is always the sum of price times quantity over the
    /// current items. It is derived, never stored.
    #[must_use]
    pub fn total(&self) -> Price {
        let currency = self
            .items
            .first()
            .map_or(CurrencyCode::default(), |item| {
                item.unit_price.currency_code
            });
        self.items
            .iter()
            .fold(Price::from_minor_units(0, currency), |acc, item| {
                acc + item.line_total()
            })
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).sum()
    }

    /// Whether the cart has no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[derive(Debug, Serialize)]
struct AddItemRequest {
    product_id: ProductId,
    quantity: u32,
}

#[derive(Debug, Serialize)]
struct UpdateItemRequest {
    quantity: u32,
}

/// Store for the visitor's cart.
///
/// Every mutation round-trips through the backend, which returns the
/// updated cart; the store never edits line items locally.
pub struct CartStore {
    client: ApiClient,
    identity: Identity,
    slice: Mutex<Slice<Cart>>,
}

impl CartStore {
    /// Create a cart store bound to one identity.
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
    pub fn view(&self) -> SliceView<Cart> {
        lock(&self.slice).view()
    }

    async fn run(&self, call: impl Future<Output = Result<Cart, ApiError>>) -> SliceView<Cart> {
        let ticket = lock(&self.slice).begin();
        let result = call.await;
        let mut slice = lock(&self.slice);
        slice.resolve(ticket, result);
        slice.view()
    }

    /// Fetch the cart.
    #[instrument(skip(self))]
    pub async fn fetch(&self) -> SliceView<Cart> {
        self.run(self.client.get("/orders/cart", &self.identity)).await
    }

    /// Add a product to the cart. Quantity must be at least 1.
    #[instrument(skip(self))]
    pub async fn add_item(&self, product_id: ProductId, quantity: u32) -> SliceView<Cart> {
        let quantity = quantity.max(1);
        self.run(self.client.post(
            "/orders/cart/items",
            &self.identity,
            &AddItemRequest {
                product_id,
                quantity,
            },
        ))
        .await
    }

    /// Change the quantity of a line item.
    #[instrument(skip(self), fields(line_id = %line_id))]
    pub async fn update_item(&self, line_id: &LineItemId, quantity: u32) -> SliceView<Cart> {
        let path = format!("/orders/cart/items/{line_id}");
        self.run(self.client.patch(
            &path,
            &self.identity,
            &UpdateItemRequest { quantity },
        ))
        .await
    }

    /// Remove a line item from the cart.
    #[instrument(skip(self), fields(line_id = %line_id))]
    pub async fn remove_item(&self, line_id: &LineItemId) -> SliceView<Cart> {
        let path = format!("/orders/cart/items/{line_id}/remove");
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

    fn line(id: &str, cents: i64, quantity: u32) -> LineItem {
        LineItem {
            id: LineItemId::from(id),
            product_id: ProductId::new(1),
            title: format!("item {id}"),
            unit_price: Price::from_minor_units(cents, CurrencyCode::USD),
            quantity,
            image_url: None,
        }
    }

    #[test]
    fn test_empty_cart_is_valid() {
        let cart = Cart::default();
        assert!(cart.is_empty());
        assert_eq!(cart.item_count(), 0);
        assert_eq!(cart.total().minor_units(), 0);
    }

    #[test]
    fn test_total_is_sum_of_price_times_quantity() {
        let cart = Cart {
            items: vec![line("a", 1999, 2), line("b", 550, 1), line("c", 100, 3)],
        };
        // 2*19.99 + 5.50 + 3*1.00 = 48.48
        assert_eq!(cart.total().minor_units(), 4848);
        assert_eq!(cart.item_count(), 6);
    }

    #[test]
    fn test_total_tracks_mutations() {
        let mut cart = Cart {
            items: vec![line("a", 1000, 1)],
        };
        assert_eq!(cart.total().minor_units(), 1000);

        cart.items.push(line("b", 250, 4));
        assert_eq!(cart.total().minor_units(), 2000);

        if let Some(first) = cart.items.first_mut() {
            first.quantity = 3;
        }
        assert_eq!(cart.total().minor_units(), 4000);

        cart.items.retain(|item| item.id != LineItemId::from("a"));
        assert_eq!(cart.total().minor_units(), 1000);

        cart.items.clear();
        assert_eq!(cart.total().minor_units(), 0);
    }

    #[test]
    fn test_line_total() {
        let item = line("a", 1234, 3);
        assert_eq!(item.line_total().minor_units(), 3702);
    }

    #[test]
    fn test_cart_serde_shape() {
        let json = r#"{"items":[{"id":"li_1","product_id":7,"title":"Mug",
            "unit_price":{"amount":"12.50","currency_code":"USD"},
            "quantity":2,"image_url":null}]}"#;
        let cart: Cart = serde_json::from_str(json).expect("deserialize cart");
        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.total().minor_units(), 2500);
    }
}
