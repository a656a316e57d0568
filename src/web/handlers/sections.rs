// Section dump handlers.
//
// GET /api/sections?mode=single|clustered          : sections with a dump file
// GET /api/sections/{section}?mode=single|clustered: one section's matches
//
// `single` reads SECTION_JSON_OUTPUT_DIR, `clustered` reads
// CLUSTER_JSON_OUTPUT_DIR. Mode defaults to single.

use std::path::PathBuf;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use tracing::warn;

use crate::output::json;
use crate::web::{api_error, AppState};

#[derive(Deserialize, Default)]
pub struct ModeQuery {
    pub mode: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Mode {
    Single,
    Clustered,
}

impl Mode {
    fn parse(raw: Option<&str>) -> Option<Self> {
        match raw.map(str::to_ascii_lowercase).as_deref() {
            None | Some("single") => Some(Mode::Single),
            Some("clustered") | Some("cluster") => Some(Mode::Clustered),
            _ => None,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Mode::Single => "single",
            Mode::Clustered => "clustered",
        }
    }

    fn dir(self, state: &AppState) -> PathBuf {
        match self {
            Mode::Single => state.config.section_json_dir.clone(),
            Mode::Clustered => state.config.cluster_json_dir.clone(),
        }
    }
}

fn resolve_mode(params: &ModeQuery) -> Result<Mode, Response> {
    Mode::parse(params.mode.as_deref()).ok_or_else(|| {
        api_error(
            StatusCode::BAD_REQUEST,
            "mode must be 'single' or 'clustered'",
        )
    })
}

/// GET /api/sections: list the sections that have a dump.
pub async fn list_sections(
    State(state): State<AppState>,
    Query(params): Query<ModeQuery>,
) -> Response {
    let mode = match resolve_mode(&params) {
        Ok(m) => m,
        Err(resp) => return resp,
    };
    let dir = mode.dir(&state);

    let sections = match json::list_section_files(&dir) {
        Ok(s) => s,
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "Failed to list dumps");
            return api_error(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string());
        }
    };

    let warning = sections.is_empty().then(|| {
        format!(
            "No section files found in {}. Run `sectionmatch {}` with --per-section-json-dir first.",
            dir.display(),
            match mode {
                Mode::Single => "annotate",
                Mode::Clustered => "cluster-annotate",
            }
        )
    });

    Json(serde_json::json!({
        "mode": mode.as_str(),
        "dir": dir.display().to_string(),
        "sections": sections,
        "warning": warning,
    }))
    .into_response()
}

/// GET /api/sections/{section}: one section's matches, sorted by distance.
pub async fn get_section(
    State(state): State<AppState>,
    Path(section): Path<String>,
    Query(params): Query<ModeQuery>,
) -> Response {
    let mode = match resolve_mode(&params) {
        Ok(m) => m,
        Err(resp) => return resp,
    };
    let dir = mode.dir(&state);

    match json::read_section_dump(&dir, &section) {
        Ok(Some(matches)) => Json(serde_json::json!({
            "section": section.to_uppercase(),
            "mode": mode.as_str(),
            "matches": matches,
        }))
        .into_response(),
        Ok(None) => api_error(
            StatusCode::NOT_FOUND,
            &format!("No {} dump for section {section}", mode.as_str()),
        ),
        Err(e) => {
            warn!(section = %section, error = %e, "Failed to read dump");
            api_error(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string())
        }
    }
}
