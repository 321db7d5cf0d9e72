use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{info, Level};

use server::config::AppConfig;
use server::judge::{HttpJudgeClient, JudgeClient};
use server::state::{AppState, Ports};
use server::utils::jwt;
use server::{build_router, seed};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    let config = AppConfig::load()?;
    let judge: Arc<dyn JudgeClient> = Arc::new(HttpJudgeClient::new(&config.judge)?);
    let state = AppState::new(config, Ports::in_memory(judge));

    let players = seed::seed_demo_data(state.ratings.as_ref(), state.catalog.as_ref()).await?;
    for player in &players {
        let token = jwt::sign(player.id, &player.username, &state.config.auth.jwt_secret)?;
        info!("Dev token for {}: {}", player.username, token);
    }

    let addr: SocketAddr = format!(
        "{}:{}",
        state.config.server.host, state.config.server.port
    )
    .parse()?;
    let app = build_router(state);

    info!("Server running at http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
