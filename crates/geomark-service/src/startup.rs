//! Query service startup helper for running the service in the
//! background.
//!
//! Provides [`spawn_service`] which binds eagerly, so address errors are
//! reported to the caller, and then serves on a background Tokio task.
//! Binding to port `0` and reading [`RunningService::addr`] gives tests
//! and embedders a live service on a free port.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::server::{self, ServerConfig, ServerError};
use crate::state::AppState;

/// A query service running on a background task.
#[derive(Debug)]
pub struct RunningService {
    /// The address actually bound.
    pub addr: SocketAddr,
    /// The serving task. Resolves once the shutdown future fires and
    /// in-flight requests finish.
    pub handle: JoinHandle<()>,
}

impl RunningService {
    /// Base URL for HTTP clients, e.g. `http://127.0.0.1:41234`.
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

/// Bind and spawn the query service.
///
/// # Errors
///
/// Returns [`ServerError::Bind`] if the listener cannot be bound.
pub async fn spawn_service(
    config: &ServerConfig,
    state: Arc<AppState>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<RunningService, ServerError> {
    let listener = server::bind(config).await?;
    let addr = listener
        .local_addr()
        .map_err(|e| ServerError::Bind(format!("no local address: {e}")))?;

    let handle = tokio::spawn(async move {
        if let Err(e) = server::serve(listener, state, shutdown).await {
            tracing::error!(error = %e, "Query service exited with error");
        }
    });

    tracing::info!(%addr, "Query service spawned on background task");
    Ok(RunningService { addr, handle })
}
