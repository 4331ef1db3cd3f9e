//! Checkout orchestration over the payment provider.
//!
//! One generic confirmation flow drives every payment method against the
//! shared `(client_secret, order_number)` pair; the method is a tagged
//! variant, not a separate code path per method. The provider SDK is a
//! black box behind the [`PaymentGateway`] capability trait.

pub mod flow;
pub mod provider;

pub use flow::{FlowOutcome, available_methods, confirm_flow, success_url};
pub use provider::ProviderGateway;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use driftwood_core::{ClientSecret, PaymentIntentId, PaymentStatus};

/// Supported payment methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Card,
    Wallet,
    Klarna,
    Clearpay,
}

impl PaymentMethod {
    /// Wire name the provider expects.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Card => "card",
            Self::Wallet => "wallet",
            Self::Klarna => "klarna",
            Self::Clearpay => "clearpay",
        }
    }

    /// Label shown on the payment page.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Card => "Card",
            Self::Wallet => "Digital wallet",
            Self::Klarna => "Klarna",
            Self::Clearpay => "Clearpay",
        }
    }

    /// Methods that complete via a provider-hosted redirect rather than an
    /// in-page result.
    #[must_use]
    pub const fn is_redirect_based(&self) -> bool {
        matches!(self, Self::Klarna | Self::Clearpay)
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a successful provider confirmation call.
#[derive(Debug, Clone)]
pub struct Confirmation {
    pub status: PaymentStatus,
    pub payment_intent_id: PaymentIntentId,
}

/// Errors the payment gateway can report.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The gateway handle is not ready; confirmation is a no-op.
    #[error("payment gateway is not ready")]
    NotReady,

    /// The provider rejected the payment, with its message if it gave one.
    #[error("payment declined")]
    Declined { message: Option<String> },

    /// Transport-level failure talking to the provider.
    #[error("provider transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The provider returned a body we could not decode.
    #[error("provider response parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Capability interface over the payment provider SDK.
///
/// Implemented by [`ProviderGateway`] for production and by scripted fakes
/// in tests.
pub trait PaymentGateway {
    /// Whether the gateway handle is usable at all.
    fn is_ready(&self) -> bool;

    /// Confirm a payment intent for one method, passing the return URL the
    /// provider should redirect to.
    fn confirm(
        &self,
        client_secret: &ClientSecret,
        method: PaymentMethod,
        return_url: &str,
    ) -> impl Future<Output = Result<Confirmation, GatewayError>> + Send;

    /// Probe whether a digital wallet is available on this visitor's
    /// browser/device. Absence means the wallet control is not rendered.
    fn wallet_available(&self) -> impl Future<Output = bool> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_wire_names() {
        assert_eq!(PaymentMethod::Card.as_str(), "card");
        assert_eq!(PaymentMethod::Clearpay.as_str(), "clearpay");
    }

    #[test]
    fn test_method_form_deserialization() {
        let method: PaymentMethod = serde_json::from_str("\"klarna\"").expect("deserialize");
        assert_eq!(method, PaymentMethod::Klarna);
    }

    #[test]
    fn test_redirect_based_methods() {
        assert!(PaymentMethod::Klarna.is_redirect_based());
        assert!(PaymentMethod::Clearpay.is_redirect_based());
        assert!(!PaymentMethod::Card.is_redirect_based());
    }
}
