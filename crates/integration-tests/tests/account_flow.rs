//! Profile fetching and cascading auth invalidation against the stub.

use std::sync::atomic::{AtomicBool, Ordering};

use driftwood_integration_tests::StubBackend;
use driftwood_storefront::identity::{Identity, SessionCredential};
use driftwood_storefront::stores::UserStore;
use driftwood_storefront::stores::user::{CredentialStore, ProfileUpdate};

/// Credential store fake that records whether it was cleared.
#[derive(Default)]
struct RecordingCredentials {
    cleared: AtomicBool,
}

impl RecordingCredentials {
    fn was_cleared(&self) -> bool {
        self.cleared.load(Ordering::SeqCst)
    }
}

impl CredentialStore for RecordingCredentials {
    async fn clear_credential(&self) {
        self.cleared.store(true, Ordering::SeqCst);
    }
}

fn user() -> Identity {
    Identity::User(SessionCredential::new("tok_session_1".to_string()))
}

#[tokio::test]
async fn test_profile_fetch_populates_store() {
    let stub = StubBackend::spawn().await;
    let store = UserStore::new(stub.api_client(), user());
    let credentials = RecordingCredentials::default();

    let view = store.fetch(&credentials).await;

    let profile = view.data.expect("profile data");
    assert_eq!(profile.email.as_str(), "jo@example.com");
    assert_eq!(profile.display_name(), "Jo Reyes");
    assert!(!credentials.was_cleared());
}

#[tokio::test]
async fn test_auth_failure_cascades_to_credential() {
    let stub = StubBackend::spawn().await;
    let store = UserStore::new(stub.api_client(), user());
    let credentials = RecordingCredentials::default();

    // Populate, then invalidate server-side.
    let view = store.fetch(&credentials).await;
    assert!(view.data.is_some());

    stub.set_profile_valid(false);
    let view = store.fetch(&credentials).await;

    // Auth failure is the one case where cached data does NOT survive,
    // but the failure itself must still be reported.
    assert!(view.data.is_none(), "profile must be dropped on auth failure");
    assert!(
        view.error.is_some(),
        "the failed fetch must leave an error on the slice"
    );
    assert!(!view.loading);
    assert!(
        credentials.was_cleared(),
        "credential must be invalidated alongside the profile"
    );
}

#[tokio::test]
async fn test_profile_update_skips_multipart_without_avatar() {
    let stub = StubBackend::spawn().await;
    let store = UserStore::new(stub.api_client(), user());

    let update = ProfileUpdate {
        first_name: Some("Jo".to_string()),
        ..ProfileUpdate::default()
    };
    let _ = store.update_profile(update, None).await;

    assert_eq!(stub.hits("PATCH /accounts/me"), 1);
}
