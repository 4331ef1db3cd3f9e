//! Product route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::{Path, Query, State};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use driftwood_core::ProductId;

use crate::api::ApiError;
use crate::catalog::Product;
use crate::error::{AppError, Result};
use crate::filters;
use crate::identity::ensure_identity;
use crate::state::AppState;

/// Product display data for templates.
#[derive(Clone)]
pub struct ProductView {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub price: String,
    pub image_url: Option<String>,
    pub available: bool,
}

impl From<&Product> for ProductView {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id.as_i64(),
            title: product.title.clone(),
            description: product.description.clone(),
            price: product.price.display(),
            image_url: product.image_url.clone(),
            available: product.available,
        }
    }
}

/// Pagination query parameters.
#[derive(Debug, Deserialize)]
pub struct PaginationQuery {
    pub page: Option<u32>,
}

/// Product listing page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/index.html")]
pub struct ProductsIndexTemplate {
    pub products: Vec<ProductView>,
    pub current_page: u32,
    pub total_pages: u32,
    pub has_more_pages: bool,
}

/// Product detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/show.html")]
pub struct ProductShowTemplate {
    pub product: ProductView,
}

/// Display product listing page.
#[instrument(skip(state, session))]
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<PaginationQuery>,
) -> Result<ProductsIndexTemplate> {
    let identity = ensure_identity(&session, state.api()).await?;
    let current_page = query.page.unwrap_or(1).max(1);

    let page = state.catalog().get_products(current_page, &identity).await?;

    Ok(ProductsIndexTemplate {
        products: page.products.iter().map(ProductView::from).collect(),
        current_page: page.page,
        total_pages: page.total_pages,
        has_more_pages: page.page < page.total_pages,
    })
}

/// Display product detail page.
#[instrument(skip(state, session))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i64>,
) -> Result<ProductShowTemplate> {
    let identity = ensure_identity(&session, state.api()).await?;

    let product = state
        .catalog()
        .get_product(ProductId::new(id), &identity)
        .await
        .map_err(|err| match err {
            ApiError::Client { .. } => AppError::NotFound(format!("product {id}")),
            other => AppError::Api(other),
        })?;

    Ok(ProductShowTemplate {
        product: ProductView::from(&product),
    })
}
