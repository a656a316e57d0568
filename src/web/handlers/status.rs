// GET /api/status: store counts for the dashboard header.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::web::{api_error, AppState};

pub async fn get_status(State(state): State<AppState>) -> Response {
    match state.db.store_counts().await {
        Ok(counts) => Json(serde_json::json!({
            "historical_links": counts.historical_count(),
            "candidates": counts.candidate_count(),
            "links_by_section": counts.links_by_section,
            "links_without_embedding": counts.links_without_embedding,
            "section_fingerprints": counts.section_fingerprints,
            "cluster_fingerprints": counts.cluster_fingerprints,
            "section_matches": counts.section_matches,
            "cluster_matches": counts.cluster_matches,
            "fingerprints_built_at": counts.fingerprints_built_at,
        }))
        .into_response(),
        Err(e) => api_error(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()),
    }
}
