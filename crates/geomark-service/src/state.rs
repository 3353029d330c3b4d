//! Shared application state for the query service.

use geomark_db::MarkerStore;

/// State shared by every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The marker store all requests are delegated to.
    pub store: MarkerStore,
}

impl AppState {
    /// Wrap a marker store.
    pub const fn new(store: MarkerStore) -> Self {
        Self { store }
    }
}
