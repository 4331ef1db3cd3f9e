//! Cart route handlers.
//!
//! Cart operations use HTMX for dynamic updates without full page reloads.
//! State lives in the backend cart resource, keyed by the session identity;
//! handlers construct a per-request [`CartStore`](crate::stores::CartStore)
//! and render its slice view.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{AppendHeaders, IntoResponse, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use driftwood_core::{LineItemId, ProductId};

use crate::error::Result;
use crate::filters;
use crate::identity::ensure_identity;
use crate::models::flash::{self, Notice};
use crate::state::AppState;
use crate::stores::SliceView;
use crate::stores::cart::Cart;

/// Cart item display data for templates.
#[derive(Clone)]
pub struct CartItemView {
    pub line_id: String,
    pub product_id: i64,
    pub title: String,
    pub quantity: u32,
    pub price: String,
    pub line_price: String,
    pub image_url: Option<String>,
}

/// Cart display data for templates.
#[derive(Clone)]
pub struct CartView {
    pub items: Vec<CartItemView>,
    pub subtotal: String,
    pub item_count: u32,
    pub error: Option<String>,
}

impl CartView {
    /// Create an empty cart view.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            subtotal: "$0.00".to_string(),
            item_count: 0,
            error: None,
        }
    }
}

impl From<SliceView<Cart>> for CartView {
    fn from(view: SliceView<Cart>) -> Self {
        let cart = view.data.unwrap_or_default();
        Self {
            items: cart
                .items
                .iter()
                .map(|line| CartItemView {
                    line_id: line.id.to_string(),
                    product_id: line.product_id.as_i64(),
                    title: line.title.clone(),
                    quantity: line.quantity,
                    price: line.unit_price.display(),
                    line_price: line.line_total().display(),
                    image_url: line.image_url.clone(),
                })
                .collect(),
            subtotal: cart.total().display(),
            item_count: cart.item_count(),
            error: view.error,
        }
    }
}

/// Add to cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub product_id: i64,
    pub quantity: Option<u32>,
}

/// Update cart form data.
#[derive(Debug, Deserialize)]
pub struct UpdateCartForm {
    pub line_id: String,
    pub quantity: u32,
}

/// Remove from cart form data.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartForm {
    pub line_id: String,
}

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub cart: CartView,
    pub notices: Vec<Notice>,
}

/// Cart items fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_items.html")]
pub struct CartItemsTemplate {
    pub cart: CartView,
}

/// Cart count badge fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_count.html")]
pub struct CartCountTemplate {
    pub count: u32,
}

/// Display cart page.
#[instrument(skip(state, session))]
pub async fn show(State(state): State<AppState>, session: Session) -> Result<CartShowTemplate> {
    let identity = ensure_identity(&session, state.api()).await?;
    let store = state.cart_store(identity);
    let cart = CartView::from(store.fetch().await);
    let notices = flash::take_notices(&session).await;

    Ok(CartShowTemplate { cart, notices })
}

/// Add item to cart (HTMX).
///
/// Returns the cart count badge plus an HTMX trigger so other fragments
/// refresh themselves. The badge carries no error text, so a failed add
/// is flashed for the next rendered page instead.
#[instrument(skip(state, session))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<AddToCartForm>,
) -> Result<Response> {
    let identity = ensure_identity(&session, state.api()).await?;
    let store = state.cart_store(identity);

    let view = store
        .add_item(ProductId::new(form.product_id), form.quantity.unwrap_or(1))
        .await;
    let cart = CartView::from(view);

    if let Some(message) = &cart.error {
        flash::push_notice(&session, Notice::error(message.clone())).await;
    }

    Ok((
        AppendHeaders([("HX-Trigger", "cart-updated")]),
        CartCountTemplate {
            count: cart.item_count,
        },
    )
        .into_response())
}

/// Update cart item quantity (HTMX).
#[instrument(skip(state, session))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<UpdateCartForm>,
) -> Result<Response> {
    let identity = ensure_identity(&session, state.api()).await?;
    let store = state.cart_store(identity);

    let view = store
        .update_item(&LineItemId::from(form.line_id.as_str()), form.quantity)
        .await;

    Ok((
        AppendHeaders([("HX-Trigger", "cart-updated")]),
        CartItemsTemplate {
            cart: CartView::from(view),
        },
    )
        .into_response())
}

/// Remove item from cart (HTMX).
#[instrument(skip(state, session))]
pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<RemoveFromCartForm>,
) -> Result<Response> {
    let identity = ensure_identity(&session, state.api()).await?;
    let store = state.cart_store(identity);

    let view = store
        .remove_item(&LineItemId::from(form.line_id.as_str()))
        .await;

    Ok((
        AppendHeaders([("HX-Trigger", "cart-updated")]),
        CartItemsTemplate {
            cart: CartView::from(view),
        },
    )
        .into_response())
}

/// Get cart count badge (HTMX).
#[instrument(skip(state, session))]
pub async fn count(State(state): State<AppState>, session: Session) -> Result<CartCountTemplate> {
    let identity = ensure_identity(&session, state.api()).await?;
    let store = state.cart_store(identity);
    let cart = CartView::from(store.fetch().await);

    Ok(CartCountTemplate {
        count: cart.item_count,
    })
}
