//! Guest/session identity establishment.
//!
//! Every visiting browser gets exactly one identity mode: a persisted guest
//! token or an authenticated credential. The guest token is minted lazily by
//! the backend, persisted in the session exactly once, and never overwritten.
//!
//! Routes call [`ensure_identity`] before any identity-scoped store work;
//! ordering is enforced by sequencing, not locking.

use serde::Deserialize;
use thiserror::Error;
use tower_sessions::Session;
use tracing::instrument;

use driftwood_core::GuestToken;

use crate::api::{ApiClient, ApiError};
use crate::models::{CurrentUser, session_keys};

/// Bearer credential for an authenticated user.
#[derive(Debug, Clone)]
pub struct SessionCredential {
    token: String,
}

impl SessionCredential {
    /// Wrap a backend-issued session token.
    #[must_use]
    pub const fn new(token: String) -> Self {
        Self { token }
    }

    /// The raw bearer token.
    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }
}

/// The identity attached to every backend request.
///
/// Exactly one mode is active per browser at a time.
#[derive(Debug, Clone)]
pub enum Identity {
    /// Unauthenticated visitor with a backend-minted guest token.
    Guest(GuestToken),
    /// Authenticated user with a bearer credential.
    User(SessionCredential),
}

/// Errors that can occur while establishing identity.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// The guest-minting call failed.
    #[error("backend error: {0}")]
    Api(#[from] ApiError),

    /// The session store rejected a read or write.
    #[error("session error: {0}")]
    Session(#[from] tower_sessions::session::Error),
}

/// Response shape of `POST /accounts/guest`.
#[derive(Debug, Deserialize)]
struct GuestResponse {
    guest_token: GuestToken,
}

/// Ensure the session has a settled identity, minting a guest token if needed.
///
/// Idempotent: with a credential or a persisted guest token already present,
/// this performs zero network calls. Only a fresh browser triggers one
/// `POST /accounts/guest`.
///
/// # Errors
///
/// Returns an error if the session store fails or the mint call fails.
#[instrument(skip_all)]
pub async fn ensure_identity(
    session: &Session,
    client: &ApiClient,
) -> Result<Identity, IdentityError> {
    // Authenticated users short-circuit; their credential is the identity.
    if let Some(user) = session
        .get::<CurrentUser>(session_keys::CURRENT_USER)
        .await?
    {
        return Ok(Identity::User(SessionCredential::new(user.token)));
    }

    // A persisted guest token is never overwritten.
    if let Some(token) = session.get::<GuestToken>(session_keys::GUEST_TOKEN).await? {
        return Ok(Identity::Guest(token));
    }

    let minted: GuestResponse = client
        .post_anonymous("/accounts/guest", &serde_json::json!({}))
        .await?;

    session
        .insert(session_keys::GUEST_TOKEN, &minted.guest_token)
        .await?;
    tracing::debug!("minted guest identity");

    Ok(Identity::Guest(minted.guest_token))
}

/// Drop the cached credential so subsequent requests re-authenticate.
///
/// Called on logout and on cascading auth-failure invalidation. The guest
/// token, if any, survives; losing it would orphan the visitor's cart.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn clear_credential(session: &Session) -> Result<(), IdentityError> {
    session.remove::<CurrentUser>(session_keys::CURRENT_USER).await?;
    Ok(())
}
