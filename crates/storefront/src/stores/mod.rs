//! Domain stores: client-side state slices synchronized with the backend.
//!
//! Each store owns one slice of state behind a named set of async
//! operations. The per-operation contract is uniform:
//!
//! - begin: `loading = true`, `error = None`
//! - success: replace `data`, clear `loading`
//! - failure: set `error` to a human-readable message, clear `loading`,
//!   leave `data` at its last good value (stale-but-present)
//!
//! Concurrent operations on one slice can race; each begin takes a
//! monotonically increasing ticket and only the response matching the
//! latest ticket is applied, so stale results are discarded
//! deterministically instead of last-completion-wins.
//!
//! Stores are plain injectable containers over an [`ApiClient`](crate::api::ApiClient);
//! no module-level singletons, so tests can construct them in isolation.

pub mod cart;
pub mod metrics;
pub mod payment;
pub mod user;
pub mod wishlist;

pub use cart::CartStore;
pub use metrics::MetricsStore;
pub use payment::PaymentStore;
pub use user::{CredentialStore, UserStore};
pub use wishlist::WishlistStore;

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::api::ApiError;

/// Opaque begin ticket; a resolve only applies if its ticket is still the
/// latest one issued for the slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

/// One slice of store state: `{data, loading, error}` plus the request
/// sequence number.
#[derive(Debug)]
pub struct Slice<T> {
    data: Option<T>,
    loading: bool,
    error: Option<String>,
    seq: u64,
}

impl<T> Default for Slice<T> {
    fn default() -> Self {
        Self {
            data: None,
            loading: false,
            error: None,
            seq: 0,
        }
    }
}

impl<T> Slice<T> {
    /// Mark an operation as in flight and return its ticket.
    pub fn begin(&mut self) -> Ticket {
        self.seq += 1;
        self.loading = true;
        self.error = None;
        Ticket(self.seq)
    }

    /// Apply an operation result if its ticket is still current.
    ///
    /// Returns `true` if the result was applied, `false` if it was stale
    /// and discarded. A stale resolve leaves every field untouched; the
    /// operation holding the latest ticket is responsible for clearing
    /// `loading`.
    pub fn resolve(&mut self, ticket: Ticket, result: Result<T, ApiError>) -> bool {
        if ticket.0 != self.seq {
            tracing::debug!(ticket = ticket.0, latest = self.seq, "discarding stale response");
            return false;
        }

        self.loading = false;
        match result {
            Ok(value) => {
                self.data = Some(value);
                self.error = None;
            }
            Err(err) => {
                // Stale-but-present: data keeps its last good value.
                self.error = Some(err.user_message());
            }
        }
        true
    }

    /// Current data, if any fetch has succeeded.
    pub const fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }

    /// Whether an operation is in flight.
    pub const fn loading(&self) -> bool {
        self.loading
    }

    /// Message from the most recent failed operation, if unresolved.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Drop the data while leaving `error` and `loading` untouched.
    ///
    /// The auth-failure cascade uses this: the cached value is gone but
    /// the failure stays visible to the caller.
    pub fn clear_data(&mut self) {
        self.data = None;
    }

    /// Clear the slice back to its initial state (logout, identity loss).
    pub fn clear(&mut self) {
        self.data = None;
        self.error = None;
        self.loading = false;
    }
}

impl<T: Clone> Slice<T> {
    /// Owned snapshot for rendering.
    pub fn view(&self) -> SliceView<T> {
        SliceView {
            data: self.data.clone(),
            loading: self.loading,
            error: self.error.clone(),
        }
    }
}

/// Owned snapshot of a slice, handed to templates.
#[derive(Debug, Clone)]
pub struct SliceView<T> {
    pub data: Option<T>,
    pub loading: bool,
    pub error: Option<String>,
}

/// Lock helper: slice mutexes are held only to begin or resolve, never
/// across an await, so poisoning cannot leave partial state behind.
pub(crate) fn lock<T>(mutex: &Mutex<Slice<T>>) -> MutexGuard<'_, Slice<T>> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client_error(message: &str) -> ApiError {
        ApiError::Client {
            message: message.to_string(),
        }
    }

    #[test]
    fn test_loading_only_between_begin_and_resolve() {
        let mut slice = Slice::<u32>::default();
        assert!(!slice.loading());

        let ticket = slice.begin();
        assert!(slice.loading());
        assert!(slice.error().is_none());

        assert!(slice.resolve(ticket, Ok(7)));
        assert!(!slice.loading());
        assert_eq!(slice.data(), Some(&7));
    }

    #[test]
    fn test_failure_keeps_last_good_data() {
        let mut slice = Slice::<u32>::default();
        let ticket = slice.begin();
        slice.resolve(ticket, Ok(7));

        let ticket = slice.begin();
        assert!(slice.resolve(ticket, Err(client_error("nope"))));

        assert!(!slice.loading());
        assert_eq!(slice.data(), Some(&7), "data must survive a failed fetch");
        assert_eq!(slice.error(), Some("nope"));
    }

    #[test]
    fn test_begin_clears_previous_error() {
        let mut slice = Slice::<u32>::default();
        let ticket = slice.begin();
        slice.resolve(ticket, Err(client_error("nope")));
        assert!(slice.error().is_some());

        slice.begin();
        assert!(slice.error().is_none());
    }

    #[test]
    fn test_stale_resolve_is_discarded() {
        let mut slice = Slice::<u32>::default();

        let first = slice.begin();
        let second = slice.begin();

        // The late-arriving first response must not clobber anything.
        assert!(!slice.resolve(first, Ok(1)));
        assert!(slice.loading(), "latest operation is still in flight");
        assert!(slice.data().is_none());

        assert!(slice.resolve(second, Ok(2)));
        assert_eq!(slice.data(), Some(&2));
        assert!(!slice.loading());
    }

    #[test]
    fn test_stale_failure_does_not_set_error() {
        let mut slice = Slice::<u32>::default();
        let first = slice.begin();
        let second = slice.begin();

        assert!(!slice.resolve(first, Err(client_error("stale failure"))));
        assert!(slice.error().is_none());

        slice.resolve(second, Ok(2));
        assert!(slice.error().is_none());
        assert_eq!(slice.data(), Some(&2));
    }

    #[test]
    fn test_clear_data_keeps_error() {
        let mut slice = Slice::<u32>::default();
        let ticket = slice.begin();
        slice.resolve(ticket, Ok(3));

        let ticket = slice.begin();
        slice.resolve(ticket, Err(client_error("session expired")));
        slice.clear_data();

        assert!(slice.data().is_none());
        assert_eq!(
            slice.error(),
            Some("session expired"),
            "dropping data must not hide the failure"
        );
        assert!(!slice.loading());
    }

    #[test]
    fn test_clear_resets_everything() {
        let mut slice = Slice::<u32>::default();
        let ticket = slice.begin();
        slice.resolve(ticket, Ok(3));

        slice.clear();
        assert!(slice.data().is_none());
        assert!(slice.error().is_none());
        assert!(!slice.loading());
    }

    #[test]
    fn test_view_snapshots_state() {
        let mut slice = Slice::<u32>::default();
        let ticket = slice.begin();
        slice.resolve(ticket, Ok(9));

        let view = slice.view();
        assert_eq!(view.data, Some(9));
        assert!(!view.loading);
        assert!(view.error.is_none());
    }
}
