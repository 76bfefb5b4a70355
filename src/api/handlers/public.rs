use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    api::{middleware::auth::CurrentUser, state::AppState},
    domain::{Attendee, CancelRegistrationRequest, EventSummary, Registration, RegistrationOutcome},
    error::{AppError, Result},
};

#[derive(Debug, Deserialize)]
pub struct PublicEventsQuery {
    pub limit: Option<i64>,
}

pub async fn list_events(
    State(state): State<AppState>,
    Query(params): Query<PublicEventsQuery>,
) -> Result<Json<Vec<EventSummary>>> {
    let events = state.service_context.event_service
        .list_upcoming(params.limit.unwrap_or(50).clamp(1, 200))
        .await?;

    let mut summaries = Vec::with_capacity(events.len());
    for event in events {
        summaries.push(state.service_context.event_service.summary(event.id).await?);
    }

    Ok(Json(summaries))
}

pub async fn get_event(
    State(state): State<AppState>,
    user: Option<Extension<CurrentUser>>,
    Path(id): Path<Uuid>,
) -> Result<Json<EventSummary>> {
    let summary = state.service_context.event_service.summary(id).await?;

    let is_admin = user.map(|Extension(u)| u.is_admin).unwrap_or(false);
    if !summary.event.visible && !is_admin {
        return Err(AppError::NotFound("Event not found".to_string()));
    }

    Ok(Json(summary))
}

pub async fn register(
    State(state): State<AppState>,
    user: Option<Extension<CurrentUser>>,
    Path(id): Path<Uuid>,
    Json(attendee): Json<Attendee>,
) -> Result<(StatusCode, Json<RegistrationOutcome>)> {
    let is_admin = user.map(|Extension(u)| u.is_admin).unwrap_or(false);

    let outcome = state.service_context.registration_service
        .register(id, attendee, is_admin)
        .await?;

    let status = match outcome {
        RegistrationOutcome::Registered { .. } => StatusCode::CREATED,
        RegistrationOutcome::Waitlisted { .. } => StatusCode::ACCEPTED,
    };

    Ok((status, Json(outcome)))
}

pub async fn cancel_registration(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<CancelRegistrationRequest>,
) -> Result<Json<Registration>> {
    let registration = state.service_context.registration_service
        .cancel(id, &request.email)
        .await?;

    Ok(Json(registration))
}
