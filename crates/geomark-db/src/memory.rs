//! In-process spatial index.
//!
//! Records live in a primary `id -> Marker` map. A secondary ordered set
//! keyed by `(x, y, id)` gives rectangle scans: walk the `x` range of the
//! set, keep entries whose `y` falls inside the rectangle.
//!
//! Iteration order is ascending `x`, then `y`, then `id`, which is stable
//! for a given index state.

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use geomark_types::{Marker, MarkerId, Rect};
use tokio::sync::RwLock;

/// An `f64` with a total order. Negative zero is folded into positive zero
/// so that ordering agrees with numeric comparison for every finite value.
#[derive(Debug, Clone, Copy)]
struct OrderedCoord(f64);

impl OrderedCoord {
    fn new(v: f64) -> Self {
        Self(v + 0.0)
    }
}

impl PartialEq for OrderedCoord {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OrderedCoord {}

impl PartialOrd for OrderedCoord {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OrderedCoord {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct SpatialKey {
    x: OrderedCoord,
    y: OrderedCoord,
    id: MarkerId,
}

impl SpatialKey {
    fn of(marker: &Marker) -> Self {
        Self {
            x: OrderedCoord::new(marker.coordinates.x()),
            y: OrderedCoord::new(marker.coordinates.y()),
            id: marker.id.clone(),
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    records: HashMap<MarkerId, Marker>,
    by_x: BTreeSet<SpatialKey>,
}

/// Spatial index held entirely in process memory.
///
/// Cloning yields another handle to the same index.
#[derive(Debug, Clone, Default)]
pub struct MemoryIndex {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `marker`, replacing any record with the same id.
    pub async fn replace(&self, marker: &Marker) {
        let mut inner = self.inner.write().await;
        if let Some(previous) = inner.records.insert(marker.id.clone(), marker.clone()) {
            inner.by_x.remove(&SpatialKey::of(&previous));
        }
        inner.by_x.insert(SpatialKey::of(marker));
    }

    /// Return up to `limit` markers inside `rect`, in index order.
    pub async fn select_rect(&self, rect: &Rect, limit: usize) -> Vec<Marker> {
        let inner = self.inner.read().await;
        let start = SpatialKey {
            x: OrderedCoord::new(rect.min_x()),
            y: OrderedCoord(f64::NEG_INFINITY),
            id: MarkerId::default(),
        };
        let max_x = OrderedCoord::new(rect.max_x());
        let (min_y, max_y) = (rect.min_y(), rect.max_y());

        inner
            .by_x
            .range(start..)
            .take_while(|key| key.x <= max_x)
            .filter(|key| key.y.0 >= min_y && key.y.0 <= max_y)
            .filter_map(|key| inner.records.get(&key.id))
            .take(limit)
            .cloned()
            .collect()
    }

    /// Look up a single marker.
    pub async fn get(&self, id: &MarkerId) -> Option<Marker> {
        self.inner.read().await.records.get(id).cloned()
    }

    /// Number of stored markers.
    pub async fn len(&self) -> usize {
        self.inner.read().await.records.len()
    }

    /// Whether the index holds no markers.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Drop every marker. Both structures are cleared under one write lock.
    pub async fn truncate(&self) {
        let mut inner = self.inner.write().await;
        inner.records.clear();
        inner.by_x.clear();
    }
}
