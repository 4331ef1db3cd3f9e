//! Payment status as reported by the provider or the backend.

use serde::{Deserialize, Serialize};

/// Payment intent status as reported by the payment provider or the
/// backend verification endpoint.
///
/// The storefront never assigns a terminal status itself; it only records
/// what the provider or the backend said.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Processing,
    RequiresAction,
    Succeeded,
    Failed,
}

impl PaymentStatus {
    /// Whether this status will not change without a new payment attempt.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::RequiresAction => "requires_action",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_statuses() {
        assert!(PaymentStatus::Succeeded.is_terminal());
        assert!(PaymentStatus::Failed.is_terminal());
        assert!(!PaymentStatus::Pending.is_terminal());
        assert!(!PaymentStatus::RequiresAction.is_terminal());
    }

    #[test]
    fn test_serde_snake_case() {
        let json = serde_json::to_string(&PaymentStatus::RequiresAction).expect("serialize");
        assert_eq!(json, "\"requires_action\"");
        let back: PaymentStatus = serde_json::from_str("\"succeeded\"").expect("deserialize");
        assert_eq!(back, PaymentStatus::Succeeded);
    }
}
