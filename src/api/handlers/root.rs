use axum::{http::StatusCode, Json, response::IntoResponse};
use serde::Serialize;
use serde_json::json;

#[derive(Serialize)]
pub struct ApiInfo {
    pub name: String,
    pub version: String,
    pub description: String,
    pub status: String,
}

pub async fn root() -> impl IntoResponse {
    Json(json!({
        "name": "Roster API",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Event registrations and waiting lists for recreational sport",
        "status": "operational",
        "endpoints": {
            "health": "/health",
            "api": "/api",
            "public": "/public",
            "admin": "/admin"
        }
    }))
}

pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    })))
}

pub async fn api_info() -> impl IntoResponse {
    Json(ApiInfo {
        name: "Roster API".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        description: "Event registrations and waiting lists for recreational sport".to_string(),
        status: "operational".to_string(),
    })
}
