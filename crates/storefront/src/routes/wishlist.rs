//! Wishlist route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::Redirect,
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use driftwood_core::ProductId;

use crate::error::Result;
use crate::filters;
use crate::identity::ensure_identity;
use crate::models::flash::{self, Notice};
use crate::routes::products::ProductView;
use crate::state::AppState;

/// Wishlist page template.
#[derive(Template, WebTemplate)]
#[template(path = "wishlist/index.html")]
pub struct WishlistTemplate {
    pub products: Vec<ProductView>,
    pub error: Option<String>,
    pub notices: Vec<Notice>,
}

/// Wishlist form data.
#[derive(Debug, Deserialize)]
pub struct WishlistForm {
    pub product_id: i64,
}

/// Display the wishlist page.
#[instrument(skip(state, session))]
pub async fn show(State(state): State<AppState>, session: Session) -> Result<WishlistTemplate> {
    let identity = ensure_identity(&session, state.api()).await?;
    let store = state.wishlist_store(identity.clone());

    let view = store.fetch().await;
    let wishlist = view.data.unwrap_or_default();

    // Resolve saved references through the (cached) catalog. A product that
    // went missing upstream is skipped rather than failing the page.
    let mut products = Vec::with_capacity(wishlist.len());
    for product_id in &wishlist.product_ids {
        match state.catalog().get_product(*product_id, &identity).await {
            Ok(product) => products.push(ProductView::from(&product)),
            Err(e) => tracing::warn!("skipping wishlist product {product_id}: {e}"),
        }
    }

    Ok(WishlistTemplate {
        products,
        error: view.error,
        notices: flash::take_notices(&session).await,
    })
}

/// Save a product to the wishlist.
///
/// The store is per-request, so a failure must be flashed here or it is
/// gone by the time the redirected page renders.
#[instrument(skip(state, session))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<WishlistForm>,
) -> Result<Redirect> {
    let identity = ensure_identity(&session, state.api()).await?;
    let store = state.wishlist_store(identity);
    let view = store.add(ProductId::new(form.product_id)).await;

    if let Some(message) = view.error {
        flash::push_notice(&session, Notice::error(message)).await;
    }
    Ok(Redirect::to("/wishlist"))
}

/// Remove a product from the wishlist.
#[instrument(skip(state, session))]
pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<WishlistForm>,
) -> Result<Redirect> {
    let identity = ensure_identity(&session, state.api()).await?;
    let store = state.wishlist_store(identity);
    let view = store.remove(ProductId::new(form.product_id)).await;

    if let Some(message) = view.error {
        flash::push_notice(&session, Notice::error(message)).await;
    }
    Ok(Redirect::to("/wishlist"))
}
