use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// CORS origin; `*` allows any.
    pub cors_allow_origin: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct JudgeConfig {
    /// Base URL of the judge engine (Judge0-compatible).
    pub url: String,
    pub request_timeout_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MatchmakingConfig {
    /// Two players pair only when their rating difference is strictly
    /// below this.
    pub rating_gap: i32,
    /// Ranked match duration in seconds.
    pub match_duration_secs: u64,
    /// Rating points moved from loser to winner on settlement.
    pub rating_stake: i32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RoomsConfig {
    pub default_max_players: u32,
    pub max_players_limit: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub judge: JudgeConfig,
    pub matchmaking: MatchmakingConfig,
    pub rooms: RoomsConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("server.cors_allow_origin", "*")?
            .set_default("auth.jwt_secret", "arena_dev_secret")?
            .set_default("judge.url", "http://localhost:2358")?
            .set_default("judge.request_timeout_ms", 15000)?
            .set_default("matchmaking.rating_gap", 1999)?
            .set_default("matchmaking.match_duration_secs", 600)?
            .set_default("matchmaking.rating_stake", 25)?
            .set_default("rooms.default_max_players", 4)?
            .set_default("rooms.max_players_limit", 4)?
            // Load from config/config.toml
            .add_source(File::with_name("config/config").required(false))
            // Override from environment (e.g., ARENA__AUTH__JWT_SECRET)
            .add_source(Environment::with_prefix("ARENA").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
