//! Session-stored models for the storefront.

pub mod flash;

use serde::{Deserialize, Serialize};

use driftwood_core::Email;

/// Session key constants.
///
/// Keep these in one place so session reads and writes cannot drift apart.
pub mod session_keys {
    /// Persisted guest token (written once, never overwritten).
    pub const GUEST_TOKEN: &str = "guest_token";
    /// Logged-in user identity.
    pub const CURRENT_USER: &str = "current_user";
    /// In-progress checkout payment session.
    pub const PAYMENT_SESSION: &str = "payment_session";
    /// One-shot flash notices.
    pub const FLASH: &str = "flash";
}

/// Session-stored user identity.
///
/// Minimal data stored in the session to identify the logged-in user.
/// The profile itself is fetched from the backend on demand.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    /// User's email address.
    pub email: Email,
    /// Backend-issued bearer token.
    pub token: String,
    /// Whether the user may view the admin dashboard.
    #[serde(default)]
    pub staff: bool,
}
