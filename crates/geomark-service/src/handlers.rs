//! Endpoint handlers for the query service.
//!
//! Handlers only check the shape of a request. Marker rules (finite
//! coordinates, non-empty names, query limits) are enforced by the
//! [`MarkerStore`](geomark_db::MarkerStore).
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/put` | Upsert one marker, returns `[stored]` |
//! | `GET` | `/list?rect=[x0,y0,x1,y1]` | Markers inside the rectangle |
//! | `POST` | `/reset` | Remove every marker |
//! | `GET` | `/health` | Liveness plus marker count |

use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use geomark_db::DbError;
use geomark_types::Marker;

use crate::error::ServiceError;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// POST /put
// ---------------------------------------------------------------------------

/// Decode a marker from the body and upsert it.
///
/// The response is a JSON array holding the stored record, with its id
/// filled in when the request carried none.
pub async fn put_marker(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<Vec<Marker>>, ServiceError> {
    let marker: Marker = serde_json::from_slice(&body)
        .map_err(|e| ServiceError::Request(format!("invalid marker payload: {e}")))?;
    let stored = state.store.put(marker).await?;
    Ok(Json(vec![stored]))
}

// ---------------------------------------------------------------------------
// GET /list
// ---------------------------------------------------------------------------

/// Return the markers inside `rect`, capped at the store's query limit.
///
/// The query string is taken as raw pairs so that a missing, repeated or
/// undecodable `rect` is reported like any other bad request.
pub async fn list_markers(
    State(state): State<Arc<AppState>>,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Result<Json<Vec<Marker>>, ServiceError> {
    let Query(pairs) = query.map_err(|e| ServiceError::Request(e.body_text()))?;
    let raw = single_rect(&pairs)?;
    let values = parse_rect_values(raw)?;
    let markers = state.store.query_values(&values).await.map_err(|e| match e {
        DbError::InvalidRect(e) => ServiceError::Request(format!("invalid rect: {e}")),
        other => ServiceError::Storage(other),
    })?;
    Ok(Json(markers))
}

fn single_rect(pairs: &[(String, String)]) -> Result<&str, ServiceError> {
    let mut rects = pairs.iter().filter(|(k, _)| k == "rect").map(|(_, v)| v.as_str());
    match (rects.next(), rects.next()) {
        (Some(raw), None) => Ok(raw),
        (None, _) => Err(ServiceError::Request(String::from("missing rect parameter"))),
        (Some(_), Some(_)) => Err(ServiceError::Request(String::from(
            "rect parameter given more than once",
        ))),
    }
}

fn parse_rect_values(raw: &str) -> Result<Vec<f64>, ServiceError> {
    serde_json::from_str(raw)
        .map_err(|e| ServiceError::Request(format!("rect must be a JSON array of numbers: {e}")))
}

// ---------------------------------------------------------------------------
// POST /reset
// ---------------------------------------------------------------------------

/// Remove every marker. Idempotent.
pub async fn reset_markers(
    State(state): State<Arc<AppState>>,
) -> Result<StatusCode, ServiceError> {
    state.store.reset().await?;
    tracing::info!("Marker store reset via API");
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// GET /health
// ---------------------------------------------------------------------------

/// Report liveness and the current marker count.
pub async fn health(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ServiceError> {
    let markers = state.store.count().await?;
    Ok(Json(serde_json::json!({
        "status": "ok",
        "backend": state.store.index().name(),
        "markers": markers,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
        raw.iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[test]
    fn parse_rect_values_accepts_numbers() {
        assert!(matches!(parse_rect_values("[0, 0, 10, 10]"), Ok(v) if v.len() == 4));
    }

    #[test]
    fn parse_rect_values_rejects_bad_input() {
        for raw in ["0,0,1,1", "[\"a\",0,1,1]", "", "{}"] {
            assert!(
                matches!(parse_rect_values(raw), Err(ServiceError::Request(_))),
                "accepted {raw:?}"
            );
        }
    }

    #[test]
    fn exactly_one_rect_is_required() {
        assert!(matches!(single_rect(&pairs(&[("rect", "[0,0,1,1]"), ("x", "1")])), Ok("[0,0,1,1]")));
        assert!(matches!(single_rect(&pairs(&[("x", "1")])), Err(ServiceError::Request(_))));
        assert!(matches!(
            single_rect(&pairs(&[("rect", "[0,0,1,1]"), ("rect", "[0,0,2,2]")])),
            Err(ServiceError::Request(_))
        ));
    }
}
