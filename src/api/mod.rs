pub mod health;
pub mod ledger;
pub mod phases;

use crate::engine::Session;
use crate::report::RecordingReporter;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};

/// Shared handler state. Phase requests are serialised through the session
/// mutex.
#[derive(Clone)]
pub struct AppState {
    pub session: Arc<Mutex<Session>>,
    /// The reporter the session writes to, drained into each step response.
    pub reporter: Arc<RecordingReporter>,
}

impl AppState {
    pub fn new(session: Session, reporter: Arc<RecordingReporter>) -> Self {
        Self {
            session: Arc::new(Mutex::new(session)),
            reporter,
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route("/v1/phases", get(phases::get_phases))
        .route("/v1/phases/:name", post(phases::execute_phase))
        .route("/v1/step", post(phases::step))
        .route("/v1/period", post(phases::run_period))
        .route("/v1/timestamps", get(ledger::get_timestamps))
        .route("/v1/ledger", get(ledger::get_ledger))
        .layer(cors)
        .with_state(state)
}
