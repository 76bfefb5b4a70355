use axum::{
    extract::{Path, Query, State},
    Json,
};
use uuid::Uuid;

use crate::{
    api::state::AppState,
    domain::{PromoteEntryRequest, Promotion, WaitingListEntry},
    error::Result,
};

pub async fn list(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
) -> Result<Json<Vec<WaitingListEntry>>> {
    let entries = state.service_context.waiting_list_service.list(event_id).await?;
    Ok(Json(entries))
}

pub async fn remove(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<WaitingListEntry>> {
    let entry = state.service_context.waiting_list_service.remove(id).await?;
    Ok(Json(entry))
}

/// `?force=true` promotes even into a full event.
pub async fn promote_entry(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<PromoteEntryRequest>,
) -> Result<Json<Promotion>> {
    let promotion = state.service_context.waiting_list_service
        .promote_entry(id, params.force)
        .await?;

    Ok(Json(promotion))
}

pub async fn promote_available(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
) -> Result<Json<Vec<Promotion>>> {
    let promotions = state.service_context.waiting_list_service
        .promote_available(event_id)
        .await?;

    Ok(Json(promotions))
}
