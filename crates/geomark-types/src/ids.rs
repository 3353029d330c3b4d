//! Marker identifiers and the identifier source.
//!
//! A [`MarkerId`] is an opaque string. Callers may supply their own ids
//! (enabling idempotent re-upsert of an existing marker); when the id is
//! empty the store asks an [`IdSource`] for a fresh one.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// Opaque, store-unique identifier of a marker.
///
/// The empty string means "not yet assigned".
#[derive(
    Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[serde(transparent)]
#[ts(export, export_to = "bindings/")]
pub struct MarkerId(pub String);

impl MarkerId {
    /// Wrap an existing token.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Whether the id still has to be assigned by an [`IdSource`].
    pub const fn is_unassigned(&self) -> bool {
        self.0.is_empty()
    }

    /// Borrow the raw token.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Return the inner token.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl core::fmt::Display for MarkerId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for MarkerId {
    fn from(token: String) -> Self {
        Self(token)
    }
}

impl From<&str> for MarkerId {
    fn from(token: &str) -> Self {
        Self(token.to_owned())
    }
}

impl From<MarkerId> for String {
    fn from(id: MarkerId) -> Self {
        id.0
    }
}

/// Produces globally-unique marker ids.
pub trait IdSource: Send + Sync {
    /// Issue a fresh id, distinct from every id issued before.
    fn next_id(&self) -> MarkerId;
}

/// Time-ordered hex ids backed by UUID v7.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidIdSource;

impl IdSource for UuidIdSource {
    fn next_id(&self) -> MarkerId {
        MarkerId(Uuid::now_v7().simple().to_string())
    }
}

/// Deterministic `prefix-N` ids, for tests and reproducible seeding.
#[derive(Debug)]
pub struct SequentialIdSource {
    prefix: String,
    next: AtomicU64,
}

impl SequentialIdSource {
    /// Start counting from 1 with the given prefix.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: AtomicU64::new(1),
        }
    }
}

impl IdSource for SequentialIdSource {
    fn next_id(&self) -> MarkerId {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        MarkerId(format!("{}-{n}", self.prefix))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;

    #[test]
    fn uuid_ids_are_distinct_hex() {
        let source = UuidIdSource;
        let ids: BTreeSet<MarkerId> = (0..500).map(|_| source.next_id()).collect();
        assert_eq!(ids.len(), 500);
        assert!(ids.iter().all(|id| id.as_str().len() == 32
            && id.as_str().chars().all(|c| c.is_ascii_hexdigit())));
    }

    #[test]
    fn sequential_ids_count_up() {
        let source = SequentialIdSource::new("m");
        assert_eq!(source.next_id().as_str(), "m-1");
        assert_eq!(source.next_id().as_str(), "m-2");
    }

    #[test]
    fn empty_id_is_unassigned() {
        assert!(MarkerId::default().is_unassigned());
        assert!(!MarkerId::from("abc").is_unassigned());
    }

    #[test]
    fn id_serializes_as_plain_string() {
        let json = serde_json::to_string(&MarkerId::from("abc")).ok();
        assert_eq!(json.as_deref(), Some("\"abc\""));
    }
}
