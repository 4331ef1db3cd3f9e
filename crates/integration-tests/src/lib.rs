//! Integration test harness for Driftwood.
//!
//! Spins up an in-process stub of the commerce backend and the payment
//! provider on an ephemeral port, so tests exercise the real HTTP client,
//! header handling, and error normalization without any external service.
//!
//! The stub records every request it receives; tests assert on call counts
//! to verify idempotence (for example, that an established identity issues
//! zero network calls).

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::{
    Json, Router,
    extract::{Path, Request, State},
    http::{HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, patch, post},
};
use secrecy::SecretString;
use serde_json::{Value, json};

use driftwood_storefront::api::ApiClient;
use driftwood_storefront::checkout::ProviderGateway;
use driftwood_storefront::config::{BackendConfig, ProviderConfig, StorefrontConfig};
use driftwood_storefront::state::AppState;

/// Unit price the stub catalog charges for every product, in minor units.
pub const UNIT_PRICE_MINOR: i64 = 1250;

/// One cart line held by the stub backend.
#[derive(Debug, Clone)]
struct StubLine {
    id: String,
    product_id: i64,
    quantity: u32,
}

/// Mutable stub state, shared between the server task and the test.
#[derive(Debug)]
struct StubInner {
    requests: Vec<String>,
    guest_serial: u64,
    line_serial: u64,
    lines: Vec<StubLine>,
    wishlist: Vec<i64>,
    profile_valid: bool,
    cart_failing: bool,
    wishlist_failing: bool,
    wallet_available: bool,
    payment_status: String,
    confirm_status: String,
    decline_message: Option<String>,
}

impl Default for StubInner {
    fn default() -> Self {
        Self {
            requests: Vec::new(),
            guest_serial: 0,
            line_serial: 0,
            lines: Vec::new(),
            wishlist: Vec::new(),
            profile_valid: true,
            cart_failing: false,
            wishlist_failing: false,
            wallet_available: false,
            payment_status: "pending".to_string(),
            confirm_status: "succeeded".to_string(),
            decline_message: None,
        }
    }
}

type Shared = Arc<Mutex<StubInner>>;

fn lock(state: &Shared) -> MutexGuard<'_, StubInner> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-process stand-in for the commerce backend plus the payment provider.
pub struct StubBackend {
    addr: SocketAddr,
    state: Shared,
}

impl StubBackend {
    /// Bind an ephemeral port and start serving the stub.
    ///
    /// # Panics
    ///
    /// Panics if the listener cannot be bound; tests have no way to recover.
    pub async fn spawn() -> Self {
        let state: Shared = Arc::new(Mutex::new(StubInner::default()));

        let app = Router::new()
            .route("/accounts/guest", post(mint_guest))
            .route("/accounts/me", get(profile).patch(profile_update))
            .route("/accounts/wishlist", get(wishlist).post(wishlist_add))
            .route("/accounts/wishlist/{id}/remove", post(wishlist_remove))
            .route("/orders/cart", get(cart))
            .route("/orders/cart/items", post(cart_add))
            .route("/orders/cart/items/{id}", patch(cart_update))
            .route("/orders/cart/items/{id}/remove", post(cart_remove))
            .route("/admin/metrics", get(metrics))
            .route("/payments", post(begin_payment))
            .route("/payments/{order}/verify", get(verify_payment))
            .route("/v1/payment_intents/{id}/confirm", post(confirm_intent))
            .route("/v1/capabilities/wallet", get(wallet_probe))
            .layer(middleware::from_fn_with_state(state.clone(), record))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind stub listener");
        let addr = listener.local_addr().expect("stub local addr");

        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve stub");
        });

        Self { addr, state }
    }

    /// Base URL of the stub.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// An [`ApiClient`] pointed at the stub.
    #[must_use]
    pub fn api_client(&self) -> ApiClient {
        ApiClient::with_base_url(
            self.base_url(),
            SecretString::from("sk_test_integration_suite"),
        )
    }

    /// A [`ProviderGateway`] pointed at the stub's provider endpoints.
    #[must_use]
    pub fn gateway(&self) -> ProviderGateway {
        ProviderGateway::new(&ProviderConfig {
            api_url: self.base_url(),
            secret_key: SecretString::from("sk_live_integration_suite"),
            publishable_key: None,
        })
    }

    /// An [`AppState`] whose clients all point at the stub, for driving
    /// route handlers directly.
    #[must_use]
    pub fn app_state(&self) -> AppState {
        self.build_state("sk_live_integration_suite")
    }

    /// An [`AppState`] whose payment gateway has no secret configured and
    /// therefore reports not ready.
    #[must_use]
    pub fn app_state_without_provider(&self) -> AppState {
        self.build_state("")
    }

    fn build_state(&self, provider_secret: &str) -> AppState {
        let config = StorefrontConfig {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 0,
            base_url: "http://shop.test".to_string(),
            backend: BackendConfig {
                api_url: self.base_url(),
                api_version: "v1".to_string(),
                api_key: SecretString::from("sk_test_integration_suite"),
            },
            provider: ProviderConfig {
                api_url: self.base_url(),
                secret_key: SecretString::from(provider_secret),
                publishable_key: None,
            },
            sentry_dsn: None,
            sentry_environment: None,
        };
        let gateway = ProviderGateway::new(&config.provider);
        AppState::with_clients(config, self.api_client(), gateway)
    }

    /// Every request the stub has served, as `"METHOD /path"` strings.
    #[must_use]
    pub fn requests(&self) -> Vec<String> {
        lock(&self.state).requests.clone()
    }

    /// Number of served requests whose `"METHOD /path"` line contains
    /// `needle`.
    #[must_use]
    pub fn hits(&self, needle: &str) -> usize {
        lock(&self.state)
            .requests
            .iter()
            .filter(|line| line.contains(needle))
            .count()
    }

    /// Total number of served requests.
    #[must_use]
    pub fn request_count(&self) -> usize {
        lock(&self.state).requests.len()
    }

    /// Whether `GET /accounts/me` succeeds or returns 401.
    pub fn set_profile_valid(&self, valid: bool) {
        lock(&self.state).profile_valid = valid;
    }

    /// Whether cart endpoints fail with a 500.
    pub fn set_cart_failing(&self, failing: bool) {
        lock(&self.state).cart_failing = failing;
    }

    /// Whether wishlist mutations fail with a 500.
    pub fn set_wishlist_failing(&self, failing: bool) {
        lock(&self.state).wishlist_failing = failing;
    }

    /// What the wallet capability probe reports.
    pub fn set_wallet_available(&self, available: bool) {
        lock(&self.state).wallet_available = available;
    }

    /// Status the verification endpoint reports.
    pub fn set_payment_status(&self, status: &str) {
        lock(&self.state).payment_status = status.to_string();
    }

    /// Status a successful provider confirmation reports.
    pub fn set_confirm_status(&self, status: &str) {
        lock(&self.state).confirm_status = status.to_string();
    }

    /// Make the provider decline confirmations with this message.
    pub fn set_decline_message(&self, message: Option<&str>) {
        lock(&self.state).decline_message = message.map(str::to_string);
    }
}

/// Record middleware: logs `"METHOD /path"` for every request.
async fn record(State(state): State<Shared>, request: Request, next: Next) -> Response {
    let line = format!("{} {}", request.method(), request.uri().path());
    lock(&state).requests.push(line);
    next.run(request).await
}

fn has_identity(headers: &HeaderMap) -> bool {
    headers.contains_key("x-guest-token") || headers.contains_key("authorization")
}

fn has_api_key(headers: &HeaderMap) -> bool {
    headers.contains_key("x-api-key")
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"detail": "Authentication required"})),
    )
        .into_response()
}

fn minor_to_amount(minor: i64) -> String {
    format!("{}.{:02}", minor / 100, minor % 100)
}

fn cart_json(lines: &[StubLine]) -> Value {
    json!({
        "items": lines
            .iter()
            .map(|line| {
                json!({
                    "id": line.id,
                    "product_id": line.product_id,
                    "title": format!("Product {}", line.product_id),
                    "unit_price": {
                        "amount": minor_to_amount(UNIT_PRICE_MINOR),
                        "currency_code": "USD",
                    },
                    "quantity": line.quantity,
                    "image_url": null,
                })
            })
            .collect::<Vec<_>>(),
    })
}

async fn mint_guest(State(state): State<Shared>, headers: HeaderMap) -> Response {
    if !has_api_key(&headers) {
        return unauthorized();
    }
    let mut inner = lock(&state);
    inner.guest_serial += 1;
    let token = format!("gt_stub_{}", inner.guest_serial);
    Json(json!({"guest_token": token})).into_response()
}

async fn profile(State(state): State<Shared>, headers: HeaderMap) -> Response {
    if !has_api_key(&headers) || !has_identity(&headers) {
        return unauthorized();
    }
    if !lock(&state).profile_valid {
        return unauthorized();
    }
    Json(json!({
        "email": "jo@example.com",
        "first_name": "Jo",
        "last_name": "Reyes",
        "phone": null,
        "avatar_url": null,
    }))
    .into_response()
}

async fn profile_update(
    State(state): State<Shared>,
    headers: HeaderMap,
    body: String,
) -> Response {
    if !has_api_key(&headers) || !has_identity(&headers) {
        return unauthorized();
    }
    if !lock(&state).profile_valid {
        return unauthorized();
    }
    // Multipart bodies are accepted but not parsed; the stub echoes a
    // profile with whichever JSON fields it could read.
    let patch: Value = serde_json::from_str(&body).unwrap_or_default();
    Json(json!({
        "email": "jo@example.com",
        "first_name": patch.get("first_name").cloned().unwrap_or(json!("Jo")),
        "last_name": patch.get("last_name").cloned().unwrap_or(json!("Reyes")),
        "phone": patch.get("phone").cloned().unwrap_or(Value::Null),
        "avatar_url": null,
    }))
    .into_response()
}

async fn wishlist(State(state): State<Shared>, headers: HeaderMap) -> Response {
    if !has_identity(&headers) {
        return unauthorized();
    }
    Json(json!({"product_ids": lock(&state).wishlist})).into_response()
}

async fn wishlist_add(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !has_identity(&headers) {
        return unauthorized();
    }
    let mut inner = lock(&state);
    if inner.wishlist_failing {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    if let Some(id) = body.get("product_id").and_then(Value::as_i64)
        && !inner.wishlist.contains(&id)
    {
        inner.wishlist.push(id);
    }
    Json(json!({"product_ids": inner.wishlist})).into_response()
}

async fn wishlist_remove(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Response {
    if !has_identity(&headers) {
        return unauthorized();
    }
    let mut inner = lock(&state);
    if inner.wishlist_failing {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    inner.wishlist.retain(|existing| *existing != id);
    Json(json!({"product_ids": inner.wishlist})).into_response()
}

async fn cart(State(state): State<Shared>, headers: HeaderMap) -> Response {
    if !has_api_key(&headers) || !has_identity(&headers) {
        return unauthorized();
    }
    let inner = lock(&state);
    if inner.cart_failing {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    Json(cart_json(&inner.lines)).into_response()
}

async fn cart_add(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !has_identity(&headers) {
        return unauthorized();
    }
    let mut inner = lock(&state);
    if inner.cart_failing {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    let product_id = body.get("product_id").and_then(Value::as_i64).unwrap_or(0);
    let quantity = body.get("quantity").and_then(Value::as_u64).unwrap_or(1);
    inner.line_serial += 1;
    let id = format!("li_{}", inner.line_serial);
    inner.lines.push(StubLine {
        id,
        product_id,
        quantity: u32::try_from(quantity).unwrap_or(1),
    });
    Json(cart_json(&inner.lines)).into_response()
}

async fn cart_update(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    if !has_identity(&headers) {
        return unauthorized();
    }
    let mut inner = lock(&state);
    if inner.cart_failing {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    let quantity = body.get("quantity").and_then(Value::as_u64).unwrap_or(1);
    for line in &mut inner.lines {
        if line.id == id {
            line.quantity = u32::try_from(quantity).unwrap_or(1);
        }
    }
    Json(cart_json(&inner.lines)).into_response()
}

async fn cart_remove(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    if !has_identity(&headers) {
        return unauthorized();
    }
    let mut inner = lock(&state);
    inner.lines.retain(|line| line.id != id);
    Json(cart_json(&inner.lines)).into_response()
}

async fn metrics(headers: HeaderMap) -> Response {
    if !has_identity(&headers) {
        return unauthorized();
    }
    Json(json!({"total_users": 3, "total_orders": 9})).into_response()
}

async fn begin_payment(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !has_identity(&headers) {
        return unauthorized();
    }
    let order_number = body
        .get("order_number")
        .and_then(Value::as_str)
        .unwrap_or("DW-0")
        .to_string();
    let inner = lock(&state);
    let total_minor =
        i64::from(inner.lines.iter().map(|line| line.quantity).sum::<u32>()) * UNIT_PRICE_MINOR;
    Json(json!({
        "order_number": order_number,
        "payment_intent_id": "pi_stub_1",
        "client_secret": "pi_stub_1_secret_abc",
        "status": "pending",
        "total": {
            "amount": minor_to_amount(total_minor),
            "currency_code": "USD",
        },
    }))
    .into_response()
}

async fn verify_payment(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(_order): Path<String>,
) -> Response {
    if !has_identity(&headers) {
        return unauthorized();
    }
    let status = lock(&state).payment_status.clone();
    Json(json!({"status": status})).into_response()
}

async fn confirm_intent(State(state): State<Shared>, Path(_id): Path<String>) -> Response {
    let inner = lock(&state);
    if let Some(message) = &inner.decline_message {
        return (
            StatusCode::PAYMENT_REQUIRED,
            Json(json!({"error": {"message": message}})),
        )
            .into_response();
    }
    Json(json!({
        "status": inner.confirm_status,
        "payment_intent_id": "pi_stub_1",
        "error": null,
    }))
    .into_response()
}

async fn wallet_probe(State(state): State<Shared>) -> Response {
    Json(json!({"available": lock(&state).wallet_available})).into_response()
}
