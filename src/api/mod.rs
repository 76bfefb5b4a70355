pub mod handlers;
pub mod middleware;
pub mod state;

use axum::{
    Router,
    routing::{get, post, put},
};
use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    trace::TraceLayer,
};
use std::sync::Arc;

use crate::{
    config::Settings,
    service::ServiceContext,
};
use state::AppState;

pub fn create_app(service_context: Arc<ServiceContext>, settings: Arc<Settings>) -> Router {
    let app_state = AppState::new(service_context, &settings);

    Router::new()
        // Root and health endpoints
        .route("/", get(handlers::root::root))
        .route("/health", get(handlers::root::health_check))
        .route("/api", get(handlers::root::api_info))

        // Signed-in users
        .nest("/api", api_routes(app_state.clone()))

        // Anonymous sign-up surface
        .nest("/public", public_routes(app_state.clone()))

        // Admin routes
        .nest("/admin", admin_routes(app_state.clone()))

        // Add state to the router
        .with_state(app_state)

        // Middleware
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/me/registrations", get(handlers::me::my_registrations))
        .route_layer(axum::middleware::from_fn_with_state(
            state,
            middleware::auth::require_auth,
        ))
}

fn public_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/events", get(handlers::public::list_events))
        .route("/events/:id", get(handlers::public::get_event))
        .route("/events/:id/register", post(handlers::public::register))
        .route("/registrations/:id/cancel", post(handlers::public::cancel_registration))
        // Admins signed in through the same page may see and fill hidden events
        .route_layer(axum::middleware::from_fn_with_state(
            state,
            middleware::auth::optional_auth,
        ))
}

fn admin_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/events", get(handlers::events::list).post(handlers::events::create))
        .route(
            "/events/:id",
            get(handlers::events::get)
                .put(handlers::events::update)
                .delete(handlers::events::delete),
        )
        .route("/events/:id/registrations", get(handlers::registrations::list_for_event))
        .route("/events/:id/waiting-list", get(handlers::waiting_list::list))
        .route("/events/:id/promote", post(handlers::waiting_list::promote_available))
        .route("/events/:id/no-shows", post(handlers::admin::record_no_shows))
        .route(
            "/registrations/:id",
            get(handlers::registrations::get).delete(handlers::registrations::delete),
        )
        .route("/registrations/:id/attendance", put(handlers::registrations::set_attended))
        .route("/registrations/:id/payment", put(handlers::registrations::mark_paid))
        .route("/waiting-list/:id", axum::routing::delete(handlers::waiting_list::remove))
        .route("/waiting-list/:id/promote", post(handlers::waiting_list::promote_entry))
        .route("/history", get(handlers::admin::history))
        .route("/no-shows", get(handlers::admin::list_no_shows))
        .layer(axum::middleware::from_fn_with_state(
            state,
            middleware::auth::require_admin,
        ))
}
