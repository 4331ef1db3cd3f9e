//! Admin dashboard route handlers.
//!
//! Read-only aggregate metrics, staff only.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::State;
use tracing::instrument;

use crate::error::Result;
use crate::filters;
use crate::identity::{Identity, SessionCredential};
use crate::middleware::auth::RequireStaff;
use crate::state::AppState;

/// Metrics display data for templates.
#[derive(Clone)]
pub struct MetricsView {
    pub total_users: u64,
    pub total_orders: u64,
}

/// Admin dashboard template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/dashboard.html")]
pub struct DashboardTemplate {
    pub metrics: Option<MetricsView>,
    pub error: Option<String>,
}

/// Display the metrics dashboard, refreshing counts on demand.
#[instrument(skip(state))]
pub async fn dashboard(
    State(state): State<AppState>,
    RequireStaff(user): RequireStaff,
) -> Result<DashboardTemplate> {
    let store = state
        .metrics_store(Identity::User(SessionCredential::new(user.token)));

    let view = store.refresh().await;

    Ok(DashboardTemplate {
        metrics: view.data.map(|metrics| MetricsView {
            total_users: metrics.total_users,
            total_orders: metrics.total_orders,
        }),
        error: view.error,
    })
}
