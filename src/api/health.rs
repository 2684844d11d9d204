use axum::extract::State;
use axum::Json;
use serde_json::json;

use super::AppState;

pub async fn health() -> Json<serde_json::Value> {
    Json(json!({"status": "ok"}))
}

/// Ready once a project is loaded; reports where the session stands.
pub async fn ready(State(state): State<AppState>) -> Json<serde_json::Value> {
    let session = state.session.lock().await;
    Json(json!({
        "status": "ready",
        "project": session.project().as_i64(),
        "version": session.current_version().as_i64(),
        "nextPhase": session.next_phase(),
    }))
}
