use axum::{extract::State, Extension, Json};

use crate::{
    api::{middleware::auth::CurrentUser, state::AppState},
    domain::RegistrationDetail,
    error::Result,
};

pub async fn my_registrations(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<Vec<RegistrationDetail>>> {
    let registrations = state.service_context.registration_service
        .list_for_email(&user.email)
        .await?;

    Ok(Json(registrations))
}
