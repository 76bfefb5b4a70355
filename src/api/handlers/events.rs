use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    api::state::AppState,
    domain::{CreateEventRequest, Event, EventSummary, UpdateEventRequest},
    error::Result,
};

#[derive(Debug, Deserialize)]
pub struct ListParams {
    #[serde(default = "default_include_hidden")]
    include_hidden: bool,
}

fn default_include_hidden() -> bool {
    true
}

pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<Event>>> {
    let events = state.service_context.event_service
        .list(params.include_hidden)
        .await?;

    Ok(Json(events))
}

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<EventSummary>> {
    let summary = state.service_context.event_service.summary(id).await?;
    Ok(Json(summary))
}

pub async fn create(
    State(state): State<AppState>,
    Json(request): Json<CreateEventRequest>,
) -> Result<(StatusCode, Json<Event>)> {
    let event = state.service_context.event_service.create(request).await?;
    Ok((StatusCode::CREATED, Json(event)))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateEventRequest>,
) -> Result<Json<Event>> {
    let event = state.service_context.event_service.update(id, request).await?;
    Ok(Json(event))
}

pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    state.service_context.event_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
