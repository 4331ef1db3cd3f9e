//! HTTP client for the commerce backend.

use std::sync::Arc;

use reqwest::multipart::Form;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::instrument;

use crate::config::BackendConfig;
use crate::identity::Identity;

use super::ApiError;

/// Header carrying the guest token for unauthenticated visitors.
pub const GUEST_TOKEN_HEADER: &str = "X-Guest-Token";

/// Header carrying the storefront's server-to-server key.
const API_KEY_HEADER: &str = "X-Api-Key";

/// Client for the commerce backend API.
///
/// Thin wrapper over `reqwest` that attaches identity credentials to every
/// request and normalizes responses into [`ApiError`]. Does not retry;
/// failure handling belongs to callers.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: String,
    api_key: SecretString,
}

impl ApiClient {
    /// Create a new backend API client from configuration.
    #[must_use]
    pub fn new(config: &BackendConfig) -> Self {
        Self::with_base_url(config.versioned_url(), config.api_key.clone())
    }

    /// Create a client pointed at an explicit base URL.
    ///
    /// Used by tests to target an in-process stub backend.
    #[must_use]
    pub fn with_base_url(base_url: impl Into<String>, api_key: SecretString) -> Self {
        Self {
            inner: Arc::new(ApiClientInner {
                client: reqwest::Client::new(),
                base_url: base_url.into(),
                api_key,
            }),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.inner.base_url)
    }

    /// Attach the server key plus exactly one identity mode to a request.
    fn authorize(
        &self,
        builder: reqwest::RequestBuilder,
        identity: Option<&Identity>,
    ) -> reqwest::RequestBuilder {
        let builder = builder.header(API_KEY_HEADER, self.inner.api_key.expose_secret());
        match identity {
            Some(Identity::Guest(token)) => builder.header(GUEST_TOKEN_HEADER, token.as_str()),
            Some(Identity::User(credential)) => builder.bearer_auth(credential.token()),
            None => builder,
        }
    }

    /// Send a request and normalize the response.
    async fn send<T: DeserializeOwned>(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> Result<T, ApiError> {
        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            tracing::debug!(
                status = %status,
                body = %body.chars().take(200).collect::<String>(),
                "backend returned non-success status"
            );
            return Err(ApiError::from_status(status, &body));
        }

        Ok(serde_json::from_str(&body)?)
    }

    /// Issue a GET request.
    ///
    /// # Errors
    ///
    /// Returns a normalized [`ApiError`] on transport or status failure.
    #[instrument(skip(self, identity), fields(path = %path))]
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        identity: &Identity,
    ) -> Result<T, ApiError> {
        let builder = self.authorize(self.inner.client.get(self.url(path)), Some(identity));
        self.send(builder).await
    }

    /// Issue a POST request with a JSON body.
    ///
    /// # Errors
    ///
    /// Returns a normalized [`ApiError`] on transport or status failure.
    #[instrument(skip(self, identity, body), fields(path = %path))]
    pub async fn post<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        identity: &Identity,
        body: &B,
    ) -> Result<T, ApiError> {
        let builder = self
            .authorize(self.inner.client.post(self.url(path)), Some(identity))
            .json(body);
        self.send(builder).await
    }

    /// Issue a POST request with no identity attached.
    ///
    /// Only the guest-minting endpoint is called this way; everything else
    /// requires an established identity.
    #[instrument(skip(self, body), fields(path = %path))]
    pub async fn post_anonymous<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let builder = self
            .authorize(self.inner.client.post(self.url(path)), None)
            .json(body);
        self.send(builder).await
    }

    /// Issue a PATCH request with a JSON body.
    ///
    /// # Errors
    ///
    /// Returns a normalized [`ApiError`] on transport or status failure.
    #[instrument(skip(self, identity, body), fields(path = %path))]
    pub async fn patch<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        identity: &Identity,
        body: &B,
    ) -> Result<T, ApiError> {
        let builder = self
            .authorize(self.inner.client.patch(self.url(path)), Some(identity))
            .json(body);
        self.send(builder).await
    }

    /// Issue a PATCH request with a multipart body (profile avatar upload).
    ///
    /// # Errors
    ///
    /// Returns a normalized [`ApiError`] on transport or status failure.
    #[instrument(skip(self, identity, form), fields(path = %path))]
    pub async fn patch_multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        identity: &Identity,
        form: Form,
    ) -> Result<T, ApiError> {
        let builder = self
            .authorize(self.inner.client.patch(self.url(path)), Some(identity))
            .multipart(form);
        self.send(builder).await
    }
}
