//! `Dragonfly` (Redis-compatible) spatial index.
//!
//! Markers are stored in two keys that are always written together inside
//! a `MULTI` transaction.
//!
//! # Key Patterns
//!
//! | Key | Type | Description |
//! |-----|------|-------------|
//! | `geomark:markers` | Hash | `id -> JSON marker record` |
//! | `geomark:markers:x` | Sorted set | `id` scored by its `x` coordinate |
//!
//! A rectangle query walks the `x` range of the sorted set page by page,
//! fetches the matching records, and keeps those whose `y` lies inside the
//! rectangle. Iteration order is ascending `x`, ties broken by id.

use fred::prelude::*;
use geomark_types::{Marker, MarkerId, Rect};

use crate::error::DbError;

/// Hash holding the full marker records.
pub const MARKERS_KEY: &str = "geomark:markers";

/// Sorted set of marker ids scored by `x`.
pub const MARKERS_X_KEY: &str = "geomark:markers:x";

/// Smallest page fetched from the sorted set during a range scan.
const MIN_SCAN_PAGE: usize = 256;

/// Connection settings for a `Dragonfly` instance.
#[derive(Debug, Clone, Default)]
pub struct DragonflyConfig {
    /// Redis URL, `redis://host:port` or `redis://host:port/db`.
    pub url: String,
    /// ACL user name, if the instance requires one.
    pub username: Option<String>,
    /// Password, if the instance requires one.
    pub password: Option<String>,
}

/// Spatial index backed by a `Dragonfly` (Redis-compatible) instance.
#[derive(Clone)]
pub struct DragonflyIndex {
    client: Client,
}

impl core::fmt::Debug for DragonflyIndex {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DragonflyIndex").finish_non_exhaustive()
    }
}

impl DragonflyIndex {
    /// Connect to `Dragonfly` with the given settings.
    ///
    /// Credentials in `config` take precedence over any embedded in the
    /// URL.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Config`] if the URL cannot be parsed.
    /// Returns [`DbError::Dragonfly`] if the connection fails.
    pub async fn connect(config: &DragonflyConfig) -> Result<Self, DbError> {
        let mut redis_config = Config::from_url(&config.url)
            .map_err(|e| DbError::Config(format!("Invalid Dragonfly URL: {e}")))?;
        if let Some(username) = &config.username {
            redis_config.username = Some(username.clone());
        }
        if let Some(password) = &config.password {
            redis_config.password = Some(password.clone());
        }

        let client = Builder::from_config(redis_config).build()?;
        client.init().await?;

        tracing::info!(url = %config.url, "Connected to Dragonfly");
        Ok(Self { client })
    }

    /// Store `marker`, replacing any record with the same id.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Serialization`] if the record cannot be encoded.
    /// Returns [`DbError::Dragonfly`] if the transaction fails.
    pub async fn replace(&self, marker: &Marker) -> Result<(), DbError> {
        let json = serde_json::to_string(marker)?;
        let id = marker.id.as_str();

        let trx = self.client.multi();
        let _: () = trx.hset(MARKERS_KEY, (id, json.as_str())).await?;
        let _: () = trx
            .zadd(
                MARKERS_X_KEY,
                None,
                None,
                false,
                false,
                (marker.coordinates.x(), id),
            )
            .await?;
        let _: () = trx.exec(true).await?;
        Ok(())
    }

    /// Return up to `limit` markers inside `rect`, in index order.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Dragonfly`] if a read fails, or
    /// [`DbError::Serialization`] if a stored record is not valid JSON.
    pub async fn select_rect(&self, rect: &Rect, limit: usize) -> Result<Vec<Marker>, DbError> {
        let mut found = Vec::new();
        if limit == 0 {
            return Ok(found);
        }

        let page = limit.max(MIN_SCAN_PAGE);
        let page_len = i64::try_from(page)
            .map_err(|e| DbError::Config(format!("scan page too large: {e}")))?;
        let mut offset: i64 = 0;

        loop {
            let ids: Vec<String> = self
                .client
                .zrangebyscore(
                    MARKERS_X_KEY,
                    rect.min_x(),
                    rect.max_x(),
                    false,
                    Some((offset, page_len)),
                )
                .await?;
            if ids.is_empty() {
                break;
            }
            let exhausted = ids.len() < page;

            let records: Vec<Option<String>> = self.client.hmget(MARKERS_KEY, ids).await?;
            for record in records.into_iter().flatten() {
                let marker: Marker = serde_json::from_str(&record)?;
                if rect.contains(&marker.coordinates) {
                    found.push(marker);
                    if found.len() >= limit {
                        return Ok(found);
                    }
                }
            }

            if exhausted {
                break;
            }
            offset = offset.saturating_add(page_len);
        }

        Ok(found)
    }

    /// Look up a single marker.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the read or decoding fails.
    pub async fn get(&self, id: &MarkerId) -> Result<Option<Marker>, DbError> {
        let value: Option<String> = self.client.hget(MARKERS_KEY, id.as_str()).await?;
        value
            .map(|s| serde_json::from_str(&s))
            .transpose()
            .map_err(DbError::from)
    }

    /// Number of stored markers.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Dragonfly`] if the read fails.
    pub async fn len(&self) -> Result<usize, DbError> {
        let count: u64 = self.client.hlen(MARKERS_KEY).await?;
        usize::try_from(count).map_err(|e| DbError::Corrupt {
            key: MARKERS_KEY.to_owned(),
            reason: format!("length does not fit in usize: {e}"),
        })
    }

    /// Drop every marker by deleting both keys in one command.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Dragonfly`] if the delete fails.
    pub async fn truncate(&self) -> Result<(), DbError> {
        let _: u32 = self.client.del(vec![MARKERS_KEY, MARKERS_X_KEY]).await?;
        Ok(())
    }
}
