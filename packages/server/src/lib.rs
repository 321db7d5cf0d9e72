pub mod config;
pub mod entity;
pub mod error;
pub mod extractors;
pub mod gateway;
pub mod judge;
pub mod models;
pub mod routes;
pub mod seed;
pub mod services;
pub mod state;
pub mod store;
pub mod utils;

use axum::http::HeaderValue;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::warn;

use crate::state::AppState;

/// Build the application router.
pub fn build_router(state: AppState) -> axum::Router {
    let origin = match state.config.server.cors_allow_origin.as_str() {
        "*" => AllowOrigin::any(),
        exact => match exact.parse::<HeaderValue>() {
            Ok(value) => AllowOrigin::exact(value),
            Err(_) => {
                warn!(origin = exact, "invalid CORS origin in config, allowing any");
                AllowOrigin::any()
            }
        },
    };
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(Any)
        .allow_headers(Any);

    routes::routes().layer(cors).with_state(state)
}
