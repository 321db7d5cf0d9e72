use axum::routing::get;
use axum::Router;

use crate::gateway::ws;
use crate::state::AppState;

pub const WS_PATH: &str = "/ws";
pub const HEALTHZ_PATH: &str = "/healthz";

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(WS_PATH, get(ws::ws_handler))
        .route(HEALTHZ_PATH, get(healthz))
}

async fn healthz() -> &'static str {
    "ok"
}
