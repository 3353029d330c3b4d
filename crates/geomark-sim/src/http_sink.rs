//! [`MarkerSink`] over the query service's HTTP API.
//!
//! `POST {base}/put` with the marker as JSON, expecting a JSON array whose
//! first element is the stored record. `POST {base}/reset` clears the
//! store. Any non-2xx status becomes [`SinkError::Rejected`] carrying the
//! response text.

use std::time::Duration;

use geomark_core::sink::{MarkerSink, SinkError};
use geomark_types::Marker;

/// HTTP client for a running query service.
#[derive(Debug, Clone)]
pub struct HttpSink {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSink {
    /// Create a sink for the service at `base_url`, with a per-request
    /// `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::Transport`] if the HTTP client cannot be built.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, SinkError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SinkError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
        })
    }

    /// The service base URL, without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post(&self, path: &str, marker: Option<&Marker>) -> Result<reqwest::Response, SinkError> {
        let url = format!("{}{path}", self.base_url);
        let mut request = self.client.post(&url);
        if let Some(marker) = marker {
            request = request.json(marker);
        }

        let response = request
            .send()
            .await
            .map_err(|e| SinkError::Transport(format!("POST {url} failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read error body".to_owned());
            return Err(SinkError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

impl MarkerSink for HttpSink {
    async fn put(&self, marker: Marker) -> Result<Marker, SinkError> {
        let response = self.post("/put", Some(&marker)).await?;
        let stored: Vec<Marker> = response
            .json()
            .await
            .map_err(|e| SinkError::Malformed(format!("put response parse failed: {e}")))?;

        stored
            .into_iter()
            .next()
            .filter(|m| !m.id.is_unassigned())
            .ok_or_else(|| SinkError::Malformed("put response missing stored record".to_owned()))
    }

    async fn reset(&self) -> Result<(), SinkError> {
        self.post("/reset", None).await?;
        Ok(())
    }
}
