use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    api::state::AppState,
    domain::{HistoryEntry, NoShow},
    error::Result,
};

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub event_id: Option<Uuid>,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    200
}

pub async fn history(
    State(state): State<AppState>,
    Query(params): Query<HistoryQuery>,
) -> Result<Json<Vec<HistoryEntry>>> {
    let entries = state.service_context.history_service
        .list(params.event_id, params.limit.clamp(1, 1000))
        .await?;

    Ok(Json(entries))
}

#[derive(Debug, Serialize)]
pub struct NoShowsRecorded {
    pub recorded: u64,
}

pub async fn record_no_shows(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
) -> Result<Json<NoShowsRecorded>> {
    let recorded = state.service_context.registration_service
        .record_no_shows(event_id)
        .await?;

    Ok(Json(NoShowsRecorded { recorded }))
}

#[derive(Debug, Deserialize)]
pub struct NoShowQuery {
    pub email: Option<String>,
}

pub async fn list_no_shows(
    State(state): State<AppState>,
    Query(params): Query<NoShowQuery>,
) -> Result<Json<Vec<NoShow>>> {
    let no_shows = state.service_context.registration_service
        .list_no_shows(params.email.as_deref())
        .await?;

    Ok(Json(no_shows))
}
