//! Commerce backend API client.
//!
//! # Architecture
//!
//! - The backend is the source of truth - NO local persistence, direct API calls
//! - JSON over HTTP at a versioned base path (e.g., `/v1`)
//! - Every request carries exactly one identity: a guest token header or a
//!   bearer credential
//! - Responses and transport failures normalize into a single [`ApiError`]
//!   taxonomy that all stores branch on uniformly
//!
//! # Example
//!
//! ```rust,ignore
//! use driftwood_storefront::api::ApiClient;
//!
//! let client = ApiClient::new(&config.backend);
//! let cart: Cart = client.get("/orders/cart", &identity).await?;
//! ```

mod client;

pub use client::ApiClient;

use serde::Deserialize;
use thiserror::Error;

/// Normalized error taxonomy for backend calls.
///
/// Every failure a store can observe is one of these variants; the dynamic
/// error-shape branching lives in [`ApiError::from_status`] and nowhere else.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Transport-level failure (DNS, connect, timeout).
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The session or credential was rejected (401/403).
    #[error("authentication required")]
    Auth,

    /// The backend rejected the request (4xx) with a detail message.
    #[error("{message}")]
    Client {
        /// Server-supplied detail, or a generic fallback.
        message: String,
    },

    /// The backend failed (5xx); details are opaque to the client.
    #[error("server error")]
    Server,

    /// A success response carried a body we could not decode.
    #[error("response parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Error body shape the backend uses for 4xx responses.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: Option<String>,
}

impl ApiError {
    /// Normalize a non-success HTTP status plus body text into a variant.
    #[must_use]
    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        if status == reqwest::StatusCode::UNAUTHORIZED
            || status == reqwest::StatusCode::FORBIDDEN
        {
            return Self::Auth;
        }
        if status.is_client_error() {
            let message = serde_json::from_str::<ErrorBody>(body)
                .ok()
                .and_then(|b| b.detail)
                .unwrap_or_else(|| "The request could not be completed.".to_string());
            return Self::Client { message };
        }
        Self::Server
    }

    /// Human-readable message suitable for a store `error` field or a notice.
    ///
    /// Prefers the server-supplied detail, falls back to a generic message.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Network(_) => "Connection problem. Please try again.".to_string(),
            Self::Auth => "Your session has expired. Please sign in again.".to_string(),
            Self::Client { message } => message.clone(),
            Self::Server | Self::Parse(_) => "Something went wrong. Please try again.".to_string(),
        }
    }

    /// Whether this failure should invalidate the cached credential.
    #[must_use]
    pub const fn is_auth(&self) -> bool {
        matches!(self, Self::Auth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unauthorized_normalizes_to_auth() {
        let err = ApiError::from_status(reqwest::StatusCode::UNAUTHORIZED, "");
        assert!(err.is_auth());
        let err = ApiError::from_status(reqwest::StatusCode::FORBIDDEN, "{}");
        assert!(err.is_auth());
    }

    #[test]
    fn test_client_error_prefers_server_detail() {
        let err = ApiError::from_status(
            reqwest::StatusCode::UNPROCESSABLE_ENTITY,
            r#"{"detail":"Quantity must be at least 1"}"#,
        );
        assert_eq!(err.user_message(), "Quantity must be at least 1");
    }

    #[test]
    fn test_client_error_falls_back_on_opaque_body() {
        let err = ApiError::from_status(reqwest::StatusCode::BAD_REQUEST, "<html>nope</html>");
        assert_eq!(err.user_message(), "The request could not be completed.");
    }

    #[test]
    fn test_server_error_is_opaque() {
        let err = ApiError::from_status(
            reqwest::StatusCode::INTERNAL_SERVER_ERROR,
            r#"{"detail":"stack trace leaked"}"#,
        );
        assert!(matches!(err, ApiError::Server));
        assert!(!err.user_message().contains("stack trace"));
    }
}
