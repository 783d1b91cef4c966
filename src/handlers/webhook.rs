use axum::Json;
use axum::extract::rejection::JsonRejection;
use serde_json::{Value, json};

use crate::error::ApiError;
use crate::models::{Envelope, ToolCreatedEvent};

// POST /tool-created
//
// Called by the database webhook (or directly) after an insert. The client
// already routes /tool/{id}, so all this does is hand back that path.
pub async fn tool_created(
    payload: Result<Json<ToolCreatedEvent>, JsonRejection>,
) -> Result<Json<Envelope<Value>>, ApiError> {
    let event = payload.map(|Json(e)| e).unwrap_or_default();
    let id = event
        .tool_id()
        .ok_or_else(|| ApiError::BadRequest("Missing tool id in payload".to_string()))?;

    tracing::info!(tool_id = %id, "Tool created webhook");
    Ok(Json(Envelope::success(json!({ "pagePath": format!("/tool/{id}") }))))
}
