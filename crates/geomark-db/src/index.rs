//! Spatial index dispatch.
//!
//! Uses enum dispatch instead of trait objects because async methods are
//! not dyn-compatible.

use geomark_types::{Marker, MarkerId, Rect};

use crate::dragonfly::{DragonflyConfig, DragonflyIndex};
use crate::error::DbError;
use crate::memory::MemoryIndex;

/// A spatial index backend: `id -> (coordinates, name)` plus rectangle
/// range iteration.
#[derive(Debug, Clone)]
pub enum MarkerIndex {
    /// In-process index.
    Memory(MemoryIndex),
    /// `Dragonfly` (Redis-compatible) index.
    Dragonfly(DragonflyIndex),
}

impl MarkerIndex {
    /// A fresh, empty in-process index.
    pub fn memory() -> Self {
        Self::Memory(MemoryIndex::new())
    }

    /// Connect to a `Dragonfly` index.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the URL is invalid or the connection fails.
    pub async fn dragonfly(config: &DragonflyConfig) -> Result<Self, DbError> {
        Ok(Self::Dragonfly(DragonflyIndex::connect(config).await?))
    }

    /// Human-readable backend name for logging.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Memory(_) => "memory",
            Self::Dragonfly(_) => "dragonfly",
        }
    }

    /// Replace-or-insert `marker` by id.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the backend rejects the write.
    pub async fn replace(&self, marker: &Marker) -> Result<(), DbError> {
        match self {
            Self::Memory(index) => {
                index.replace(marker).await;
                Ok(())
            }
            Self::Dragonfly(index) => index.replace(marker).await,
        }
    }

    /// Up to `limit` markers inside `rect`, in index order.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the backend read fails.
    pub async fn select_rect(&self, rect: &Rect, limit: usize) -> Result<Vec<Marker>, DbError> {
        match self {
            Self::Memory(index) => Ok(index.select_rect(rect, limit).await),
            Self::Dragonfly(index) => index.select_rect(rect, limit).await,
        }
    }

    /// Look up a single marker.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the backend read fails.
    pub async fn get(&self, id: &MarkerId) -> Result<Option<Marker>, DbError> {
        match self {
            Self::Memory(index) => Ok(index.get(id).await),
            Self::Dragonfly(index) => index.get(id).await,
        }
    }

    /// Number of stored markers.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the backend read fails.
    pub async fn len(&self) -> Result<usize, DbError> {
        match self {
            Self::Memory(index) => Ok(index.len().await),
            Self::Dragonfly(index) => index.len().await,
        }
    }

    /// Remove every marker.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the backend delete fails.
    pub async fn truncate(&self) -> Result<(), DbError> {
        match self {
            Self::Memory(index) => {
                index.truncate().await;
                Ok(())
            }
            Self::Dragonfly(index) => index.truncate().await,
        }
    }
}
