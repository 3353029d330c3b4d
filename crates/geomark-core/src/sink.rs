//! Where the simulator sends its writes.
//!
//! [`MarkerSink`] abstracts over "something that accepts a put and a
//! reset". The simulator binary implements it over HTTP; tests and
//! in-process runs use [`MarkerStore`] directly.

use std::future::Future;
use std::time::Duration;

use geomark_db::{DbError, MarkerStore};
use geomark_types::Marker;
use tracing::warn;

/// Errors a sink can report.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// The in-process store rejected the operation.
    #[error("store error: {0}")]
    Store(#[from] DbError),

    /// The request never got a usable response.
    #[error("transport error: {0}")]
    Transport(String),

    /// The remote side answered with a failure.
    #[error("rejected with status {status}: {body}")]
    Rejected {
        /// HTTP-like status code.
        status: u16,
        /// Response body, usually the error text.
        body: String,
    },

    /// The response could not be understood.
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl SinkError {
    /// Whether repeating the same call could succeed.
    ///
    /// Transport failures and backend errors are transient. A marker or
    /// request the store refuses will be refused again, as will a
    /// response the client cannot parse.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Store(DbError::InvalidMarker { .. } | DbError::InvalidRect(_)) | Self::Malformed(_) => {
                false
            }
            Self::Store(_) => true,
            Self::Rejected { status, body } => {
                *status >= 500
                    && !body.starts_with("bad request")
                    && !body.starts_with("storage error: invalid")
            }
        }
    }
}

/// Destination for simulated marker writes.
pub trait MarkerSink: Send + Sync + 'static {
    /// Upsert one marker and return the record as stored.
    fn put(&self, marker: Marker) -> impl Future<Output = Result<Marker, SinkError>> + Send;

    /// Remove every marker.
    fn reset(&self) -> impl Future<Output = Result<(), SinkError>> + Send;
}

impl MarkerSink for MarkerStore {
    async fn put(&self, marker: Marker) -> Result<Marker, SinkError> {
        Ok(Self::put(self, marker).await?)
    }

    async fn reset(&self) -> Result<(), SinkError> {
        Ok(Self::reset(self).await?)
    }
}

/// How often, and how patiently, a failed sink call is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt. Zero means a single attempt.
    pub max_retries: u32,
    /// Base backoff; retry `n` waits `n * backoff`.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff: Duration::from_millis(100),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub const fn none() -> Self {
        Self {
            max_retries: 0,
            backoff: Duration::ZERO,
        }
    }

    /// Run `op` until it succeeds, fails permanently (see
    /// [`SinkError::is_retryable`]) or the retries are used up, returning
    /// the last error.
    ///
    /// # Errors
    ///
    /// Returns the error from the final attempt.
    pub async fn run<T, F, Fut>(&self, what: &str, mut op: F) -> Result<T, SinkError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, SinkError>>,
    {
        let mut attempt: u32 = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < self.max_retries && e.is_retryable() => {
                    attempt = attempt.saturating_add(1);
                    let delay = self.backoff.saturating_mul(attempt);
                    warn!(
                        operation = what,
                        attempt,
                        max_retries = self.max_retries,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %e,
                        "Sink call failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
