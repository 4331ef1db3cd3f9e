//! Checkout orchestration against the stub backend and provider.

use driftwood_core::{GuestToken, OrderNumber, PaymentStatus, ProductId};
use driftwood_integration_tests::{StubBackend, UNIT_PRICE_MINOR};
use driftwood_storefront::checkout::{
    FlowOutcome, PaymentMethod, available_methods, confirm_flow,
};
use driftwood_storefront::identity::Identity;
use driftwood_storefront::stores::{CartStore, PaymentStore};

const BASE_URL: &str = "http://shop.test";

fn guest() -> Identity {
    Identity::Guest(GuestToken::from("gt_stub_fixed"))
}

#[tokio::test]
async fn test_payment_session_total_comes_from_order() {
    let stub = StubBackend::spawn().await;

    // The wallet amount is whatever the order record says, so the payment
    // session must carry the cart-derived total.
    let cart = CartStore::new(stub.api_client(), guest());
    cart.add_item(ProductId::new(7), 2).await;

    let store = PaymentStore::new(stub.api_client(), guest());
    let view = store.begin_checkout(OrderNumber::from("DW-1042")).await;

    let session = view.data.expect("payment session");
    assert_eq!(session.order_number, OrderNumber::from("DW-1042"));
    assert_eq!(session.status, PaymentStatus::Pending);
    assert_eq!(session.total.minor_units(), 2 * UNIT_PRICE_MINOR);
    assert!(session.client_secret.as_str().contains("_secret"));
}

#[tokio::test]
async fn test_verify_status_reflects_backend() {
    let stub = StubBackend::spawn().await;
    let store = PaymentStore::new(stub.api_client(), guest());
    let order = OrderNumber::from("DW-1042");

    let status = store.verify_status(&order).await.expect("verify");
    assert_eq!(status, PaymentStatus::Pending);

    stub.set_payment_status("succeeded");
    let status = store.verify_status(&order).await.expect("verify");
    assert_eq!(status, PaymentStatus::Succeeded);
    assert!(status.is_terminal());
}

#[tokio::test]
async fn test_verify_updates_local_session_status() {
    let stub = StubBackend::spawn().await;
    let store = PaymentStore::new(stub.api_client(), guest());
    let order = OrderNumber::from("DW-1042");

    store.begin_checkout(order.clone()).await;
    stub.set_payment_status("succeeded");

    let view = store.verify(&order).await;
    let session = view.data.expect("payment session");
    assert_eq!(session.status, PaymentStatus::Succeeded);
    assert_eq!(session.order_number, order);
}

#[tokio::test]
async fn test_verify_without_local_session_reports_error() {
    let stub = StubBackend::spawn().await;
    let store = PaymentStore::new(stub.api_client(), guest());

    // A provider redirect can land with no local session; the slice-level
    // verify has nothing to update, while verify_status still works.
    let view = store.verify(&OrderNumber::from("DW-9999")).await;
    assert!(view.data.is_none());
    assert!(view.error.is_some());
}

#[tokio::test]
async fn test_wallet_probe_gates_offered_methods() {
    let stub = StubBackend::spawn().await;
    let gateway = stub.gateway();

    let methods = available_methods(&gateway).await;
    assert!(
        !methods.contains(&PaymentMethod::Wallet),
        "wallet offered without capability"
    );

    stub.set_wallet_available(true);
    let methods = available_methods(&gateway).await;
    assert_eq!(methods.get(1), Some(&PaymentMethod::Wallet));
}

#[tokio::test]
async fn test_confirm_success_over_http() {
    let stub = StubBackend::spawn().await;
    let gateway = stub.gateway();
    let order = OrderNumber::from("DW-1042");

    let outcome = confirm_flow(
        &gateway,
        &"pi_stub_1_secret_abc".into(),
        &order,
        PaymentMethod::Card,
        BASE_URL,
    )
    .await;

    let FlowOutcome::Succeeded { location, .. } = outcome else {
        panic!("expected success, got {outcome:?}");
    };
    assert!(location.contains("order=DW-1042"));
    assert_eq!(stub.hits("POST /v1/payment_intents/pi_stub_1/confirm"), 1);
}

#[tokio::test]
async fn test_confirm_decline_carries_provider_message() {
    let stub = StubBackend::spawn().await;
    stub.set_decline_message(Some("Card declined by issuer"));
    let gateway = stub.gateway();

    let outcome = confirm_flow(
        &gateway,
        &"pi_stub_1_secret_abc".into(),
        &OrderNumber::from("DW-1042"),
        PaymentMethod::Card,
        BASE_URL,
    )
    .await;

    let FlowOutcome::Failed { notice } = outcome else {
        panic!("expected failure, got {outcome:?}");
    };
    assert_eq!(notice.message, "Card declined by issuer");
}

#[tokio::test]
async fn test_redirect_method_stays_in_flight() {
    let stub = StubBackend::spawn().await;
    stub.set_confirm_status("requires_action");
    let gateway = stub.gateway();
    let order = OrderNumber::from("DW 11");

    let outcome = confirm_flow(
        &gateway,
        &"pi_stub_1_secret_abc".into(),
        &order,
        PaymentMethod::Klarna,
        BASE_URL,
    )
    .await;

    let FlowOutcome::InFlight { location } = outcome else {
        panic!("expected in-flight, got {outcome:?}");
    };
    // The order number rides the return URL, encoded.
    assert!(location.ends_with("/checkout/success?order=DW%2011"));
}
