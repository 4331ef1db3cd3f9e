//! HTTP implementation of the payment gateway capability.
//!
//! Talks to the provider's REST API for server-side confirmation. The
//! provider's own protocol stays a black box; this module only shuttles
//! `{client_secret, method, return_url}` in and `{status, error}` out.

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use driftwood_core::{ClientSecret, PaymentIntentId, PaymentStatus};

use crate::config::ProviderConfig;

use super::{Confirmation, GatewayError, PaymentGateway, PaymentMethod};

/// Gateway over the payment provider's REST API.
#[derive(Clone)]
pub struct ProviderGateway {
    inner: Arc<ProviderGatewayInner>,
}

struct ProviderGatewayInner {
    client: reqwest::Client,
    api_url: String,
    secret_key: SecretString,
}

#[derive(Debug, Serialize)]
struct ConfirmRequest<'a> {
    client_secret: &'a str,
    payment_method_type: &'a str,
    return_url: &'a str,
}

#[derive(Debug, Deserialize)]
struct ConfirmResponse {
    status: PaymentStatus,
    payment_intent_id: PaymentIntentId,
    error: Option<ProviderError>,
}

#[derive(Debug, Deserialize)]
struct ProviderError {
    message: Option<String>,
}

/// Body shape of non-2xx provider responses.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: Option<ProviderError>,
}

#[derive(Debug, Deserialize)]
struct WalletProbeResponse {
    available: bool,
}

impl ProviderGateway {
    /// Create a gateway from provider configuration.
    #[must_use]
    pub fn new(config: &ProviderConfig) -> Self {
        Self {
            inner: Arc::new(ProviderGatewayInner {
                client: reqwest::Client::new(),
                api_url: config.api_url.trim_end_matches('/').to_string(),
                secret_key: config.secret_key.clone(),
            }),
        }
    }

    /// Extract the intent id from a client secret of the form
    /// `pi_xxx_secret_yyy`.
    fn intent_id(client_secret: &ClientSecret) -> &str {
        client_secret
            .as_str()
            .split_once("_secret")
            .map_or(client_secret.as_str(), |(intent, _)| intent)
    }
}

impl PaymentGateway for ProviderGateway {
    fn is_ready(&self) -> bool {
        !self.inner.secret_key.expose_secret().is_empty()
    }

    #[instrument(skip(self, client_secret), fields(method = %method))]
    async fn confirm(
        &self,
        client_secret: &ClientSecret,
        method: PaymentMethod,
        return_url: &str,
    ) -> Result<Confirmation, GatewayError> {
        if !self.is_ready() {
            return Err(GatewayError::NotReady);
        }

        let url = format!(
            "{}/v1/payment_intents/{}/confirm",
            self.inner.api_url,
            Self::intent_id(client_secret)
        );

        let response = self
            .inner
            .client
            .post(&url)
            .bearer_auth(self.inner.secret_key.expose_secret())
            .json(&ConfirmRequest {
                client_secret: client_secret.as_str(),
                payment_method_type: method.as_str(),
                return_url,
            })
            .send()
            .await?;

        let status = response.status();
        let body_text = response.text().await?;

        // Declines come back as non-2xx with an error envelope.
        if !status.is_success() {
            let message = serde_json::from_str::<ErrorEnvelope>(&body_text)
                .ok()
                .and_then(|body| body.error)
                .and_then(|error| error.message);
            return Err(GatewayError::Declined { message });
        }

        let body: ConfirmResponse = serde_json::from_str(&body_text)?;

        if let Some(error) = body.error {
            return Err(GatewayError::Declined {
                message: error.message,
            });
        }

        // Terminal status comes from the provider response only; failed
        // confirmations without an error object still surface as declines.
        if body.status == PaymentStatus::Failed {
            return Err(GatewayError::Declined { message: None });
        }

        Ok(Confirmation {
            status: body.status,
            payment_intent_id: body.payment_intent_id,
        })
    }

    #[instrument(skip(self))]
    async fn wallet_available(&self) -> bool {
        if !self.is_ready() {
            return false;
        }

        let url = format!("{}/v1/capabilities/wallet", self.inner.api_url);
        let probe = self
            .inner
            .client
            .get(&url)
            .bearer_auth(self.inner.secret_key.expose_secret())
            .send()
            .await
            .and_then(reqwest::Response::error_for_status);

        match probe {
            Ok(response) => response
                .json::<WalletProbeResponse>()
                .await
                .map(|body| body.available)
                .unwrap_or(false),
            Err(err) => {
                // An unreachable probe means no wallet control at all.
                tracing::debug!("wallet probe failed: {err}");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intent_id_extraction() {
        let secret = ClientSecret::from("pi_3KqX_secret_9fj2");
        assert_eq!(ProviderGateway::intent_id(&secret), "pi_3KqX");
    }

    #[test]
    fn test_intent_id_falls_back_to_whole_secret() {
        let secret = ClientSecret::from("opaque-token");
        assert_eq!(ProviderGateway::intent_id(&secret), "opaque-token");
    }
}
