use axum::Json;
use axum::extract::{Path, State};

use crate::error::ApiError;
use crate::models::{Envelope, Tool};
use crate::state::AppState;
use crate::supabase::Credential;

// POST /tools/{id}/download
//
// The counter is public, so this runs with the service credential whatever
// the caller may do. The increment itself is a single backend RPC; the
// handler never reads, adds and writes back.
pub async fn record_download(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Envelope<Tool>>, ApiError> {
    if id.trim().is_empty() {
        return Err(ApiError::BadRequest("Missing id".to_string()));
    }

    state.supabase.increment_downloads(&id).await?;
    let tool = state.supabase.fetch_tool(Credential::Service, &id).await?;

    tracing::info!(tool_id = %id, downloads = ?tool.downloads, "Download recorded");
    Ok(Json(Envelope::success(tool)))
}
