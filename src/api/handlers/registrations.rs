use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::{
    api::state::AppState,
    domain::{MarkPaidRequest, Payment, Registration, RegistrationDetail, SetAttendedRequest},
    error::Result,
};

pub async fn list_for_event(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
) -> Result<Json<Vec<RegistrationDetail>>> {
    let registrations = state.service_context.registration_service
        .list_for_event(event_id)
        .await?;

    Ok(Json(registrations))
}

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<RegistrationDetail>> {
    let registration = state.service_context.registration_service.get(id).await?;
    Ok(Json(registration))
}

pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Registration>> {
    let registration = state.service_context.registration_service.delete(id).await?;
    Ok(Json(registration))
}

pub async fn set_attended(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<SetAttendedRequest>,
) -> Result<Json<Registration>> {
    let registration = state.service_context.registration_service
        .set_attended(id, request.attended)
        .await?;

    Ok(Json(registration))
}

pub async fn mark_paid(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<MarkPaidRequest>,
) -> Result<Json<Payment>> {
    let payment = state.service_context.registration_service
        .mark_paid(id, request.paid)
        .await?;

    Ok(Json(payment))
}
