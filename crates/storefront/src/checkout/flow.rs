//! The generic confirmation flow shared by all payment methods.

use driftwood_core::{ClientSecret, OrderNumber, PaymentStatus};
use tracing::instrument;

use crate::models::flash::Notice;

use super::{GatewayError, PaymentGateway, PaymentMethod};

/// Outcome of one confirmation attempt.
///
/// Exactly one notice and at most one navigation per attempt, by
/// construction.
#[derive(Debug)]
pub enum FlowOutcome {
    /// Gateway not ready; the attempt was a no-op.
    NotReady,
    /// Terminal success: notify and navigate to the success route.
    Succeeded { notice: Notice, location: String },
    /// The provider took over (redirect-based method still in flight);
    /// the success route will verify the final status.
    InFlight { location: String },
    /// Provider-reported failure: notify, no navigation, payment stays
    /// pending. No automatic retry.
    Failed { notice: Notice },
}

/// Build the success-route URL carrying the order number.
#[must_use]
pub fn success_url(base_url: &str, order_number: &OrderNumber) -> String {
    format!(
        "{}/checkout/success?order={}",
        base_url.trim_end_matches('/'),
        urlencoding::encode(order_number.as_str())
    )
}

/// Methods offered to this visitor.
///
/// The wallet entry is capability-detected: if the probe says no, the
/// wallet is simply absent (nothing rendered), never a disabled control.
pub async fn available_methods<G: PaymentGateway>(gateway: &G) -> Vec<PaymentMethod> {
    let mut methods = vec![PaymentMethod::Card, PaymentMethod::Klarna, PaymentMethod::Clearpay];
    if gateway.wallet_available().await {
        methods.insert(1, PaymentMethod::Wallet);
    }
    methods
}

/// Drive one payment method to a result against the shared
/// `(client_secret, order_number)` pair.
///
/// 1. Guard: gateway not ready → no-op.
/// 2. Confirm with a return URL encoding the order number.
/// 3. Provider error → one failure notice, no navigation.
/// 4. Terminal success → one success notice plus navigation to the success
///    route, which re-verifies status against the backend.
#[instrument(skip(gateway, client_secret), fields(order = %order_number, method = %method))]
pub async fn confirm_flow<G: PaymentGateway>(
    gateway: &G,
    client_secret: &ClientSecret,
    order_number: &OrderNumber,
    method: PaymentMethod,
    base_url: &str,
) -> FlowOutcome {
    if !gateway.is_ready() {
        return FlowOutcome::NotReady;
    }

    let return_url = success_url(base_url, order_number);

    match gateway.confirm(client_secret, method, &return_url).await {
        Ok(confirmation) if confirmation.status == PaymentStatus::Succeeded => {
            tracing::info!(intent = %confirmation.payment_intent_id, "payment confirmed");
            FlowOutcome::Succeeded {
                notice: Notice::success("Payment received. Thank you for your order!"),
                location: return_url,
            }
        }
        Ok(confirmation) => {
            // Redirect-based methods resolve out of page; the success route
            // is the sole confirmation point from here on.
            tracing::info!(status = %confirmation.status, "payment still in flight");
            FlowOutcome::InFlight {
                location: return_url,
            }
        }
        Err(GatewayError::NotReady) => FlowOutcome::NotReady,
        Err(GatewayError::Declined { message }) => FlowOutcome::Failed {
            notice: Notice::error(
                message.unwrap_or_else(|| "Your payment could not be processed.".to_string()),
            ),
        },
        Err(err @ (GatewayError::Transport(_) | GatewayError::Parse(_))) => {
            tracing::warn!("provider failure: {err}");
            FlowOutcome::Failed {
                notice: Notice::error("Your payment could not be processed."),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use driftwood_core::PaymentIntentId;

    use super::super::Confirmation;
    use super::*;
    use crate::models::flash::NoticeLevel;

    /// Scripted gateway recording every confirm call.
    struct ScriptedGateway {
        ready: bool,
        wallet: bool,
        outcome: fn() -> Result<Confirmation, GatewayError>,
        calls: Mutex<Vec<(String, PaymentMethod, String)>>,
    }

    impl ScriptedGateway {
        fn new(outcome: fn() -> Result<Confirmation, GatewayError>) -> Self {
            Self {
                ready: true,
                wallet: true,
                outcome,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.lock().expect("lock").len()
        }
    }

    impl PaymentGateway for ScriptedGateway {
        fn is_ready(&self) -> bool {
            self.ready
        }

        async fn confirm(
            &self,
            client_secret: &ClientSecret,
            method: PaymentMethod,
            return_url: &str,
        ) -> Result<Confirmation, GatewayError> {
            self.calls.lock().expect("lock").push((
                client_secret.as_str().to_string(),
                method,
                return_url.to_string(),
            ));
            (self.outcome)()
        }

        async fn wallet_available(&self) -> bool {
            self.wallet
        }
    }

    fn succeeded() -> Result<Confirmation, GatewayError> {
        Ok(Confirmation {
            status: PaymentStatus::Succeeded,
            payment_intent_id: PaymentIntentId::from("pi_1"),
        })
    }

    fn declined() -> Result<Confirmation, GatewayError> {
        Err(GatewayError::Declined {
            message: Some("Card declined".to_string()),
        })
    }

    const BASE: &str = "https://shop.example.com";

    #[tokio::test]
    async fn test_success_notifies_once_and_navigates_with_order() {
        let gateway = ScriptedGateway::new(succeeded);
        let order = OrderNumber::from("DW-1042");
        let secret = ClientSecret::from("pi_1_secret_abc");

        let outcome =
            confirm_flow(&gateway, &secret, &order, PaymentMethod::Card, BASE).await;

        let FlowOutcome::Succeeded { notice, location } = outcome else {
            panic!("expected success outcome");
        };
        assert_eq!(notice.level, NoticeLevel::Success);
        assert_eq!(
            location,
            "https://shop.example.com/checkout/success?order=DW-1042"
        );
        assert_eq!(gateway.call_count(), 1);
    }

    #[tokio::test]
    async fn test_error_notifies_once_and_does_not_navigate() {
        let gateway = ScriptedGateway::new(declined);
        let order = OrderNumber::from("DW-7");
        let secret = ClientSecret::from("pi_7_secret_x");

        let outcome =
            confirm_flow(&gateway, &secret, &order, PaymentMethod::Klarna, BASE).await;

        let FlowOutcome::Failed { notice } = outcome else {
            panic!("expected failed outcome");
        };
        assert_eq!(notice.level, NoticeLevel::Error);
        assert_eq!(notice.message, "Card declined");
        assert_eq!(gateway.call_count(), 1);
    }

    #[tokio::test]
    async fn test_declined_without_message_uses_fallback() {
        fn declined_opaque() -> Result<Confirmation, GatewayError> {
            Err(GatewayError::Declined { message: None })
        }
        let gateway = ScriptedGateway::new(declined_opaque);
        let order = OrderNumber::from("DW-8");
        let secret = ClientSecret::from("pi_8_secret_x");

        let outcome =
            confirm_flow(&gateway, &secret, &order, PaymentMethod::Card, BASE).await;
        let FlowOutcome::Failed { notice } = outcome else {
            panic!("expected failed outcome");
        };
        assert_eq!(notice.message, "Your payment could not be processed.");
    }

    #[tokio::test]
    async fn test_not_ready_gateway_is_a_noop() {
        let mut gateway = ScriptedGateway::new(succeeded);
        gateway.ready = false;
        let order = OrderNumber::from("DW-9");
        let secret = ClientSecret::from("pi_9_secret_x");

        let outcome =
            confirm_flow(&gateway, &secret, &order, PaymentMethod::Card, BASE).await;
        assert!(matches!(outcome, FlowOutcome::NotReady));
        assert_eq!(gateway.call_count(), 0, "no-op must not hit the provider");
    }

    #[tokio::test]
    async fn test_in_flight_redirects_to_success_route() {
        fn processing() -> Result<Confirmation, GatewayError> {
            Ok(Confirmation {
                status: PaymentStatus::Processing,
                payment_intent_id: PaymentIntentId::from("pi_2"),
            })
        }
        let gateway = ScriptedGateway::new(processing);
        let order = OrderNumber::from("DW-10");
        let secret = ClientSecret::from("pi_10_secret_x");

        let outcome =
            confirm_flow(&gateway, &secret, &order, PaymentMethod::Clearpay, BASE).await;
        let FlowOutcome::InFlight { location } = outcome else {
            panic!("expected in-flight outcome");
        };
        assert!(location.ends_with("order=DW-10"));
    }

    #[tokio::test]
    async fn test_return_url_is_passed_to_gateway() {
        let gateway = ScriptedGateway::new(succeeded);
        let order = OrderNumber::from("DW 11");
        let secret = ClientSecret::from("pi_11_secret_x");

        confirm_flow(&gateway, &secret, &order, PaymentMethod::Card, BASE).await;
        let calls = gateway.calls.lock().expect("lock");
        let (_, _, return_url) = calls.first().expect("one call");
        // Order numbers are query-encoded into the return URL.
        assert_eq!(
            return_url,
            "https://shop.example.com/checkout/success?order=DW%2011"
        );
    }

    #[tokio::test]
    async fn test_wallet_absent_when_probe_fails() {
        let mut gateway = ScriptedGateway::new(succeeded);
        gateway.wallet = false;

        let methods = available_methods(&gateway).await;
        assert!(!methods.contains(&PaymentMethod::Wallet));
        assert!(methods.contains(&PaymentMethod::Card));
    }

    #[tokio::test]
    async fn test_wallet_offered_when_probe_succeeds() {
        let gateway = ScriptedGateway::new(succeeded);
        let methods = available_methods(&gateway).await;
        assert!(methods.contains(&PaymentMethod::Wallet));
    }
}
