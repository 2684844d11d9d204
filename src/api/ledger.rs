use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::domain::{Commodity, Global, Industry, Ledger, SocialClass, Stock, TimeStamp, VersionId};
use crate::engine::ComparatorMode;
use crate::error::AppError;

#[derive(Debug, Deserialize)]
pub struct LedgerQuery {
    pub version: Option<i64>,
    pub comparator: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimestampsResponse {
    pub current_version: VersionId,
    pub timestamps: Vec<TimeStamp>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerDto {
    pub version: VersionId,
    pub global: Global,
    pub commodities: Vec<Commodity>,
    pub industries: Vec<Industry>,
    pub classes: Vec<SocialClass>,
    pub stocks: Vec<Stock>,
}

impl LedgerDto {
    fn new(version: VersionId, ledger: Ledger) -> Self {
        Self {
            version,
            global: ledger.global,
            commodities: ledger.commodities.into_values().collect(),
            industries: ledger.industries.into_values().collect(),
            classes: ledger.classes.into_values().collect(),
            stocks: ledger.stocks.into_values().collect(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerResponse {
    pub comparator_mode: ComparatorMode,
    pub ledger: LedgerDto,
    /// The ledger `ledger` is compared against, absent when there is none.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comparator: Option<LedgerDto>,
}

pub async fn get_timestamps(
    State(state): State<AppState>,
) -> Result<Json<TimestampsResponse>, AppError> {
    let session = state.session.lock().await;
    let timestamps = session.timestamps().await?;
    Ok(Json(TimestampsResponse {
        current_version: session.current_version(),
        timestamps,
    }))
}

pub async fn get_ledger(
    Query(params): Query<LedgerQuery>,
    State(state): State<AppState>,
) -> Result<Json<LedgerResponse>, AppError> {
    let mut session = state.session.lock().await;

    if let Some(raw) = params.comparator.as_deref() {
        let mode = raw
            .parse::<ComparatorMode>()
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
        session.set_comparator(mode);
    }

    let version = match params.version {
        Some(v) if v > 0 => VersionId::new(v),
        Some(v) => {
            return Err(AppError::BadRequest(format!(
                "version must be positive, got {}",
                v
            )))
        }
        None => session.current_version(),
    };

    let ledger = session.ledger(Some(version)).await?;
    let comparator = match session.comparator_for(version).await? {
        Some(other) => Some(LedgerDto::new(other, session.ledger(Some(other)).await?)),
        None => None,
    };

    Ok(Json(LedgerResponse {
        comparator_mode: session.comparator(),
        ledger: LedgerDto::new(version, ledger),
        comparator,
    }))
}
