use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::handler::{self, AppState};

/// Build the axum router over a shared service.
pub fn build_router(service: AppState) -> Router {
    Router::new()
        .route("/v1/health", get(handler::health_handler))
        .route("/all", get(handler::all_handler))
        .route("/find/:rollno", get(handler::find_handler))
        .route("/modify/:rollno/:marks", get(handler::modify_handler))
        .route(
            "/add/:name/:year/:board/:mark/:rollno",
            get(handler::add_handler),
        )
        .route("/seed", post(handler::seed_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}
