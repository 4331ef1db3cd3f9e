//! Admin metrics store: read-only aggregate counts.

use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::api::{ApiClient, ApiError};
use crate::identity::Identity;

use super::{Slice, SliceView, lock};

/// Aggregate counts for the admin dashboard. No write path.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Metrics {
    pub total_users: u64,
    pub total_orders: u64,
}

/// Store for admin dashboard metrics, refreshed on demand.
pub struct MetricsStore {
    client: ApiClient,
    identity: Identity,
    slice: Mutex<Slice<Metrics>>,
}

impl MetricsStore {
    /// Create a metrics store bound to a staff identity.
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
    pub fn view(&self) -> SliceView<Metrics> {
        lock(&self.slice).view()
    }

    /// Refresh the counts from the backend.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> SliceView<Metrics> {
        let ticket = lock(&self.slice).begin();
        let result: Result<Metrics, ApiError> =
            self.client.get("/admin/metrics", &self.identity).await;
        let mut slice = lock(&self.slice);
        slice.resolve(ticket, result);
        slice.view()
    }
}
