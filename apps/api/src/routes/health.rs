use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /health
/// Returns a simple status object with service version, model and live session count.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    let active_sessions = state.sessions.len().await;
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "interview-coach",
        "model": state.llm.model(),
        "active_sessions": active_sessions
    }))
}
