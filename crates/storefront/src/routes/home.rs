//! Home page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::State;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::Result;
use crate::filters;
use crate::identity::ensure_identity;
use crate::routes::products::ProductView;
use crate::state::AppState;

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub featured: Vec<ProductView>,
}

/// Display the home page with a handful of featured products.
#[instrument(skip(state, session))]
pub async fn index(State(state): State<AppState>, session: Session) -> Result<HomeTemplate> {
    let identity = ensure_identity(&session, state.api()).await?;

    // The home page tolerates catalog failures; an empty shelf beats a 502.
    let featured = match state.catalog().get_products(1, &identity).await {
        Ok(page) => page.products.iter().take(4).map(ProductView::from).collect(),
        Err(e) => {
            tracing::warn!("failed to load featured products: {e}");
            Vec::new()
        }
    };

    Ok(HomeTemplate { featured })
}
