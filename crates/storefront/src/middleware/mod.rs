//! Tower middleware and axum extractors.

pub mod auth;
pub mod session;

pub use auth::{OptionalAuth, RequireAuth, RequireStaff};
pub use session::create_session_layer;
