//! Domain store behavior over real HTTP against the stub backend.

use driftwood_core::{GuestToken, ProductId};
use driftwood_integration_tests::{StubBackend, UNIT_PRICE_MINOR};
use driftwood_storefront::identity::Identity;
use driftwood_storefront::stores::{CartStore, WishlistStore};

fn guest() -> Identity {
    Identity::Guest(GuestToken::from("gt_stub_fixed"))
}

#[tokio::test]
async fn test_cart_mutations_update_derived_total() {
    let stub = StubBackend::spawn().await;
    let store = CartStore::new(stub.api_client(), guest());

    let view = store.fetch().await;
    let cart = view.data.expect("cart data");
    assert!(cart.is_empty());
    assert_eq!(cart.total().minor_units(), 0);

    let view = store.add_item(ProductId::new(7), 2).await;
    let cart = view.data.expect("cart data");
    assert_eq!(cart.item_count(), 2);
    assert_eq!(cart.total().minor_units(), 2 * UNIT_PRICE_MINOR);

    let line_id = cart.items.first().expect("line present").id.clone();

    let view = store.update_item(&line_id, 3).await;
    let cart = view.data.expect("cart data");
    assert_eq!(cart.item_count(), 3);
    assert_eq!(cart.total().minor_units(), 3 * UNIT_PRICE_MINOR);

    let view = store.remove_item(&line_id).await;
    let cart = view.data.expect("cart data");
    assert!(cart.is_empty());
    assert_eq!(cart.total().minor_units(), 0);
}

#[tokio::test]
async fn test_failed_fetch_keeps_last_good_cart() {
    let stub = StubBackend::spawn().await;
    let store = CartStore::new(stub.api_client(), guest());

    let view = store.add_item(ProductId::new(7), 1).await;
    assert!(view.data.is_some());
    assert!(view.error.is_none());

    stub.set_cart_failing(true);
    let view = store.fetch().await;

    assert!(view.error.is_some(), "failure must surface an error");
    let cart = view.data.expect("stale data must remain present");
    assert_eq!(cart.item_count(), 1);
    assert!(!view.loading, "loading must clear after the failure");

    // Recovery: the next successful fetch replaces data and clears error.
    stub.set_cart_failing(false);
    let view = store.fetch().await;
    assert!(view.error.is_none());
    assert!(view.data.is_some());
}

#[tokio::test]
async fn test_wishlist_add_and_remove() {
    let stub = StubBackend::spawn().await;
    let store = WishlistStore::new(stub.api_client(), guest());

    let view = store.add(ProductId::new(7)).await;
    let wishlist = view.data.expect("wishlist data");
    assert!(wishlist.contains(ProductId::new(7)));

    // Adding the same product again stays idempotent.
    let view = store.add(ProductId::new(7)).await;
    assert_eq!(view.data.expect("wishlist data").len(), 1);

    let view = store.remove(ProductId::new(7)).await;
    assert!(view.data.expect("wishlist data").is_empty());
}
