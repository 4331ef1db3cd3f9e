//! Payment store: checkout payment-intent lifecycle.
//!
//! A payment session is created when checkout begins (order + client secret
//! obtained from the backend) and reaches a terminal status only through the
//! provider's confirmation or the backend verification endpoint. This store
//! never assigns a terminal status itself.

use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::instrument;

use driftwood_core::{ClientSecret, OrderNumber, PaymentIntentId, PaymentStatus, Price};

use crate::api::{ApiClient, ApiError};
use crate::identity::Identity;

use super::{Slice, SliceView, lock};

/// The payment record for one order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentSession {
    pub order_number: OrderNumber,
    pub payment_intent_id: PaymentIntentId,
    pub client_secret: ClientSecret,
    pub status: PaymentStatus,
    /// Order total, sourced from the order record. Wallet payment sheets
    /// take their amount from here, never from a hardcoded value.
    pub total: Price,
}

#[derive(Debug, Serialize)]
struct BeginCheckoutRequest {
    order_number: OrderNumber,
}

/// Response of the verification endpoint, keyed by order number.
#[derive(Debug, Deserialize)]
struct VerifyResponse {
    status: PaymentStatus,
}

/// Store for the in-progress payment.
pub struct PaymentStore {
    client: ApiClient,
    identity: Identity,
    slice: Mutex<Slice<PaymentSession>>,
}

impl PaymentStore {
    /// Create a payment store bound to one identity.
    #[must_use]
    pub fn new(client: ApiClient, identity: Identity) -> Self {
        Self {
            client,
            identity,
            slice: Mutex::new(Slice::default()),
        }
    }

    /// Snapshot the slice for rendering.
    #[must_use]
    pub fn view(&self) -> SliceView<PaymentSession> {
        lock(&self.slice).view()
    }

    /// Begin checkout: obtain `{client_secret, payment_intent_id}` for an
    /// order from the backend.
    #[instrument(skip(self), fields(order = %order_number))]
    pub async fn begin_checkout(&self, order_number: OrderNumber) -> SliceView<PaymentSession> {
        let ticket = lock(&self.slice).begin();
        let result: Result<PaymentSession, ApiError> = self
            .client
            .post(
                "/payments",
                &self.identity,
                &BeginCheckoutRequest { order_number },
            )
            .await;
        let mut slice = lock(&self.slice);
        slice.resolve(ticket, result);
        slice.view()
    }

    /// Re-verify the payment status against the backend.
    ///
    /// The success route calls this after any provider redirect; for
    /// redirect-based wallet methods it is the sole confirmation point.
    /// The status comes from the server response, never from local guesses.
    #[instrument(skip(self), fields(order = %order_number))]
    pub async fn verify(&self, order_number: &OrderNumber) -> SliceView<PaymentSession> {
        let ticket = lock(&self.slice).begin();
        let path = format!("/payments/{order_number}/verify");
        let verified: Result<VerifyResponse, ApiError> =
            self.client.get(&path, &self.identity).await;

        let mut slice = lock(&self.slice);
        let result = match verified {
            Ok(response) => match slice.data() {
                Some(session) if session.order_number == *order_number => {
                    let mut session = session.clone();
                    session.status = response.status;
                    Ok(session)
                }
                // Redirect landings may arrive with no local session; the
                // verified status is all we know about this order.
                _ => Err(ApiError::Client {
                    message: "No payment in progress for this order.".to_string(),
                }),
            },
            Err(err) => Err(err),
        };
        slice.resolve(ticket, result);
        slice.view()
    }

    /// Verify an order's status without requiring a local payment session.
    ///
    /// Used by the success route when the browser arrives via provider
    /// redirect and the in-page session state was never populated.
    ///
    /// # Errors
    ///
    /// Returns a normalized [`ApiError`] if the verification call fails.
    #[instrument(skip(self), fields(order = %order_number))]
    pub async fn verify_status(
        &self,
        order_number: &OrderNumber,
    ) -> Result<PaymentStatus, ApiError> {
        let path = format!("/payments/{order_number}/verify");
        let response: VerifyResponse = self.client.get(&path, &self.identity).await?;
        Ok(response.status)
    }
}
