use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

use super::AppState;
use crate::domain::{TimeStamp, VersionId};
use crate::engine::PhaseId;
use crate::error::AppError;
use crate::report::Report;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseDto {
    pub name: PhaseId,
    pub parent: Option<PhaseId>,
    pub children: Vec<PhaseId>,
    pub successor: PhaseId,
    pub executable: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhasesResponse {
    pub next_phase: PhaseId,
    pub period: i64,
    pub phases: Vec<PhaseDto>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepResponse {
    pub current_version: VersionId,
    pub next_phase: PhaseId,
    pub timestamps: Vec<TimeStamp>,
    pub reports: Vec<Report>,
}

pub async fn get_phases(State(state): State<AppState>) -> Json<PhasesResponse> {
    let session = state.session.lock().await;
    let phases = session
        .graph()
        .phases()
        .map(|d| PhaseDto {
            name: d.id,
            parent: d.parent,
            children: d.children.clone(),
            successor: d.successor,
            executable: d.action.is_some(),
        })
        .collect();

    Json(PhasesResponse {
        next_phase: session.next_phase(),
        period: session.period(),
        phases,
    })
}

pub async fn step(State(state): State<AppState>) -> Result<Json<StepResponse>, AppError> {
    let mut session = state.session.lock().await;
    state.reporter.take();
    let stamp = session.step().await?;
    Ok(Json(StepResponse {
        current_version: session.current_version(),
        next_phase: session.next_phase(),
        timestamps: vec![stamp],
        reports: state.reporter.take(),
    }))
}

pub async fn execute_phase(
    Path(name): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<StepResponse>, AppError> {
    let phase = name
        .parse::<PhaseId>()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let mut session = state.session.lock().await;
    state.reporter.take();
    let timestamps = session.execute(phase).await?;
    Ok(Json(StepResponse {
        current_version: session.current_version(),
        next_phase: session.next_phase(),
        timestamps,
        reports: state.reporter.take(),
    }))
}

pub async fn run_period(State(state): State<AppState>) -> Result<Json<StepResponse>, AppError> {
    let mut session = state.session.lock().await;
    state.reporter.take();
    let timestamps = session.run_period().await?;
    Ok(Json(StepResponse {
        current_version: session.current_version(),
        next_phase: session.next_phase(),
        timestamps,
        reports: state.reporter.take(),
    }))
}
