//! Identity establishment against the stub backend.
//!
//! Covers the idempotence contract: an established identity issues zero
//! network calls, and the guest token is minted exactly once per session.

use std::sync::Arc;

use tower_sessions::{MemoryStore, Session};

use driftwood_core::Email;
use driftwood_integration_tests::StubBackend;
use driftwood_storefront::identity::{Identity, clear_credential, ensure_identity};
use driftwood_storefront::models::{CurrentUser, session_keys};

fn fresh_session() -> Session {
    Session::new(None, Arc::new(MemoryStore::default()), None)
}

#[tokio::test]
async fn test_guest_token_minted_exactly_once() {
    let stub = StubBackend::spawn().await;
    let client = stub.api_client();
    let session = fresh_session();

    let first = ensure_identity(&session, &client)
        .await
        .expect("first ensure");
    let Identity::Guest(first_token) = first else {
        panic!("fresh session should produce a guest identity");
    };
    assert_eq!(stub.hits("POST /accounts/guest"), 1);

    // Re-running with a settled identity must not touch the network.
    let before = stub.request_count();
    let second = ensure_identity(&session, &client)
        .await
        .expect("second ensure");
    let Identity::Guest(second_token) = second else {
        panic!("identity mode must not change between runs");
    };

    assert_eq!(second_token, first_token, "persisted token is reused");
    assert_eq!(stub.request_count(), before, "re-run made a network call");
}

#[tokio::test]
async fn test_credential_short_circuits_guest_minting() {
    let stub = StubBackend::spawn().await;
    let client = stub.api_client();
    let session = fresh_session();

    session
        .insert(
            session_keys::CURRENT_USER,
            &CurrentUser {
                email: Email::parse("jo@example.com").expect("valid email"),
                token: "tok_session_1".to_string(),
                staff: false,
            },
        )
        .await
        .expect("seed credential");

    let identity = ensure_identity(&session, &client).await.expect("ensure");
    assert!(matches!(identity, Identity::User(_)));
    assert_eq!(stub.request_count(), 0, "credentialed session minted a guest");
}

#[tokio::test]
async fn test_guest_token_survives_logout() {
    let stub = StubBackend::spawn().await;
    let client = stub.api_client();
    let session = fresh_session();

    let Identity::Guest(token) = ensure_identity(&session, &client).await.expect("ensure")
    else {
        panic!("expected guest identity");
    };

    // Simulate login then logout; the guest token must survive so the
    // visitor keeps a working identity for the cart.
    session
        .insert(
            session_keys::CURRENT_USER,
            &CurrentUser {
                email: Email::parse("jo@example.com").expect("valid email"),
                token: "tok_session_1".to_string(),
                staff: false,
            },
        )
        .await
        .expect("log in");
    clear_credential(&session).await.expect("log out");

    let Identity::Guest(after) = ensure_identity(&session, &client).await.expect("re-ensure")
    else {
        panic!("expected guest identity after logout");
    };
    assert_eq!(after, token);
    assert_eq!(stub.hits("POST /accounts/guest"), 1, "token was re-minted");
}
