use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::CookieJar;

use crate::{
    api::state::AppState,
    error::AppError,
};

#[derive(Clone, Debug)]
pub struct CurrentUser {
    pub subject: String,
    pub email: String,
    pub name: Option<String>,
    pub is_admin: bool,
}

/// Bearer header first, then the `session` cookie set by the frontend.
fn extract_token(request: &Request, jar: &CookieJar) -> Option<String> {
    request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .or_else(|| jar.get("session").map(|cookie| cookie.value().to_string()))
}

fn authenticate(state: &AppState, request: &Request, jar: &CookieJar) -> Result<CurrentUser, AppError> {
    let token = extract_token(request, jar).ok_or(AppError::Unauthorized)?;
    let claims = state.token_verifier.verify(&token)?;

    Ok(CurrentUser {
        is_admin: state.token_verifier.is_admin(&claims),
        subject: claims.sub,
        email: claims.email,
        name: claims.name,
    })
}

pub async fn require_auth(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user = authenticate(&state, &request, &jar)?;

    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}

pub async fn require_admin(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user = authenticate(&state, &request, &jar)?;

    if !user.is_admin {
        tracing::warn!("Non-admin {} attempted admin access", user.email);
        return Err(AppError::Forbidden);
    }

    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}

pub async fn optional_auth(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    if let Ok(user) = authenticate(&state, &request, &jar) {
        request.extensions_mut().insert(user);
    }

    next.run(request).await
}
