use axum::Json;
use serde_json::{Value, json};

use crate::models::Envelope;

// health handler
pub async fn health_handler() -> Json<Envelope<Value>> {
    Json(Envelope::success(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    })))
}
