//! The marker store: single source of truth for `id -> Marker`.
//!
//! [`MarkerStore`] owns id assignment, upsert, rectangle queries, and
//! reset on top of a [`MarkerIndex`]. It enforces the data-model rules
//! the index itself does not check:
//!
//! - coordinates must be finite
//! - names must be non-empty
//! - queries never return more than the configured limit

use std::sync::Arc;

use geomark_types::{IdSource, Marker, MarkerId, Rect, UuidIdSource};
use tracing::debug;

use crate::error::DbError;
use crate::index::MarkerIndex;

/// Default maximum number of markers a single query returns.
pub const DEFAULT_QUERY_LIMIT: usize = 1000;

/// Upsert and range-query operations over a spatial index.
///
/// Cheap to clone; clones share the same index and id source.
#[derive(Clone)]
pub struct MarkerStore {
    index: MarkerIndex,
    ids: Arc<dyn IdSource>,
    query_limit: usize,
}

impl core::fmt::Debug for MarkerStore {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MarkerStore")
            .field("backend", &self.index.name())
            .field("query_limit", &self.query_limit)
            .finish_non_exhaustive()
    }
}

impl MarkerStore {
    /// Create a store over `index`, issuing new ids from `ids`.
    pub fn new(index: MarkerIndex, ids: Arc<dyn IdSource>) -> Self {
        Self {
            index,
            ids,
            query_limit: DEFAULT_QUERY_LIMIT,
        }
    }

    /// An empty in-memory store with UUID ids.
    pub fn in_memory() -> Self {
        Self::new(MarkerIndex::memory(), Arc::new(UuidIdSource))
    }

    /// Override the per-query result limit.
    #[must_use]
    pub fn with_query_limit(mut self, query_limit: usize) -> Self {
        self.query_limit = query_limit;
        self
    }

    /// The per-query result limit.
    pub const fn query_limit(&self) -> usize {
        self.query_limit
    }

    /// The underlying index backend.
    pub const fn index(&self) -> &MarkerIndex {
        &self.index
    }

    /// Upsert `marker`, assigning a fresh id first if it has none.
    ///
    /// Returns the record as stored.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::InvalidMarker`] for non-finite coordinates or an
    /// empty name, or any backend error from the index.
    pub async fn put(&self, mut marker: Marker) -> Result<Marker, DbError> {
        if !marker.coordinates.is_finite() {
            return Err(DbError::InvalidMarker {
                id: marker.id,
                reason: String::from("coordinates must be finite numbers"),
            });
        }
        if marker.name.is_empty() {
            return Err(DbError::InvalidMarker {
                id: marker.id,
                reason: String::from("name must not be empty"),
            });
        }
        if marker.id.is_unassigned() {
            marker.id = self.ids.next_id();
        }

        self.index.replace(&marker).await?;
        debug!(id = %marker.id, x = marker.coordinates.x(), y = marker.coordinates.y(), "marker stored");
        Ok(marker)
    }

    /// Markers inside `rect`, at most [`query_limit`](Self::query_limit)
    /// of them, in the index's iteration order.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the backend read fails.
    pub async fn query(&self, rect: &Rect) -> Result<Vec<Marker>, DbError> {
        let markers = self.index.select_rect(rect, self.query_limit).await?;
        debug!(?rect, count = markers.len(), "rectangle query");
        Ok(markers)
    }

    /// Like [`query`](Self::query), from raw `[x0, y0, x1, y1]` values.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::InvalidRect`] for the wrong arity or non-finite
    /// values, or any backend error.
    pub async fn query_values(&self, values: &[f64]) -> Result<Vec<Marker>, DbError> {
        let rect = Rect::from_slice(values)?;
        self.query(&rect).await
    }

    /// Look up one marker by id.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the backend read fails.
    pub async fn get(&self, id: &MarkerId) -> Result<Option<Marker>, DbError> {
        self.index.get(id).await
    }

    /// Number of stored markers.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the backend read fails.
    pub async fn count(&self) -> Result<usize, DbError> {
        self.index.len().await
    }

    /// Remove every marker. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the backend delete fails.
    pub async fn reset(&self) -> Result<(), DbError> {
        self.index.truncate().await?;
        debug!(backend = self.index.name(), "marker store reset");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeSet;

    use geomark_types::{Coordinates, SequentialIdSource};

    use super::*;

    fn store() -> MarkerStore {
        MarkerStore::new(
            MarkerIndex::memory(),
            Arc::new(SequentialIdSource::new("test")),
        )
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[tokio::test]
    async fn put_assigns_id_and_keeps_fields() {
        let store = store();
        let stored = store
            .put(Marker::unassigned(Coordinates::new(1.0, 2.0), "X"))
            .await
            .unwrap();

        assert!(!stored.id.is_unassigned());
        assert!(close(stored.coordinates.x(), 1.0));
        assert!(close(stored.coordinates.y(), 2.0));
        assert_eq!(stored.name, "X");
    }

    #[tokio::test]
    async fn assigned_ids_are_unique() {
        let store = MarkerStore::in_memory();
        let mut seen = BTreeSet::new();
        for i in 0..200_u32 {
            let stored = store
                .put(Marker::unassigned(Coordinates::new(f64::from(i), 0.0), "n"))
                .await
                .unwrap();
            assert!(seen.insert(stored.id));
        }
        assert_eq!(store.count().await.unwrap(), 200);
    }

    #[tokio::test]
    async fn put_with_same_id_replaces() {
        let store = store();
        let first = store
            .put(Marker::unassigned(Coordinates::new(1.0, 1.0), "first"))
            .await
            .unwrap();
        let second = Marker {
            id: first.id.clone(),
            coordinates: Coordinates::new(3.0, 4.0),
            name: String::from("second"),
        };
        store.put(second.clone()).await.unwrap();

        assert_eq!(store.count().await.unwrap(), 1);
        assert_eq!(store.get(&first.id).await.unwrap(), Some(second));
    }

    #[tokio::test]
    async fn round_trip_through_query() {
        let store = store();
        let marker = Marker {
            id: MarkerId::from("cat-1"),
            coordinates: Coordinates::new(299.1, 148.9),
            name: String::from("Барсик"),
        };
        store.put(marker.clone()).await.unwrap();

        let found = store
            .query(&Rect::new(299.0, 148.8, 299.2, 149.0).unwrap())
            .await
            .unwrap();
        assert_eq!(found, vec![marker]);
    }

    #[tokio::test]
    async fn query_on_empty_store_is_empty() {
        let found = store().query_values(&[0.0, 0.0, 10.0, 10.0]).await.unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn query_rejects_wrong_arity() {
        let result = store().query_values(&[0.0, 0.0, 10.0]).await;
        assert!(matches!(result, Err(DbError::InvalidRect(_))));
    }

    #[tokio::test]
    async fn query_never_exceeds_limit() {
        let store = store().with_query_limit(5);
        for i in 0..12_u32 {
            store
                .put(Marker::unassigned(Coordinates::new(f64::from(i) * 0.1, 0.0), "n"))
                .await
                .unwrap();
        }
        let found = store.query_values(&[-1.0, -1.0, 2.0, 1.0]).await.unwrap();
        assert_eq!(found.len(), 5);
    }

    #[tokio::test]
    async fn rejects_non_finite_coordinates() {
        let result = store()
            .put(Marker::unassigned(Coordinates::new(f64::INFINITY, 0.0), "n"))
            .await;
        assert!(matches!(result, Err(DbError::InvalidMarker { .. })));
    }

    #[tokio::test]
    async fn rejects_empty_name() {
        let result = store()
            .put(Marker::unassigned(Coordinates::new(0.0, 0.0), ""))
            .await;
        assert!(matches!(result, Err(DbError::InvalidMarker { .. })));
    }

    #[tokio::test]
    async fn reset_is_idempotent() {
        let store = store();
        store
            .put(Marker::unassigned(Coordinates::new(0.0, 0.0), "n"))
            .await
            .unwrap();
        store.reset().await.unwrap();
        store.reset().await.unwrap();
        assert_eq!(store.count().await.unwrap(), 0);
    }
}
