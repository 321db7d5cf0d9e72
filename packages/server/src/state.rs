use std::sync::Arc;

use crate::config::AppConfig;
use crate::gateway::{Connections, PubSub};
use crate::judge::JudgeClient;
use crate::services::{DeadlineScheduler, MatchCoordinator, Matchmaker, RoomCoordinator};
use crate::store::{
    LeaderboardStore, MatchStore, MemoryStore, ProblemCatalog, RatingStore, RoomStore,
    SubmissionStore,
};

/// External collaborators the coordinators are wired to.
pub struct Ports {
    pub ratings: Arc<dyn RatingStore>,
    pub catalog: Arc<dyn ProblemCatalog>,
    pub matches: Arc<dyn MatchStore>,
    pub rooms: Arc<dyn RoomStore>,
    pub submissions: Arc<dyn SubmissionStore>,
    pub leaderboard: Arc<dyn LeaderboardStore>,
    pub judge: Arc<dyn JudgeClient>,
}

impl Ports {
    /// Every storage port backed by one shared in-memory store.
    pub fn in_memory(judge: Arc<dyn JudgeClient>) -> Self {
        Self::with_store(Arc::new(MemoryStore::new()), judge)
    }

    pub fn with_store(store: Arc<MemoryStore>, judge: Arc<dyn JudgeClient>) -> Self {
        Self {
            ratings: store.clone(),
            catalog: store.clone(),
            matches: store.clone(),
            rooms: store.clone(),
            submissions: store.clone(),
            leaderboard: store,
            judge,
        }
    }
}

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub connections: Arc<Connections>,
    pub pubsub: Arc<PubSub>,
    pub scheduler: DeadlineScheduler,
    pub matchmaker: Arc<Matchmaker>,
    pub matches: Arc<MatchCoordinator>,
    pub rooms: Arc<RoomCoordinator>,
    pub ratings: Arc<dyn RatingStore>,
    pub catalog: Arc<dyn ProblemCatalog>,
}

impl AppState {
    pub fn new(config: AppConfig, ports: Ports) -> Self {
        let connections = Arc::new(Connections::new());
        let pubsub = Arc::new(PubSub::new(connections.clone()));
        let scheduler = DeadlineScheduler::new();

        let matches = Arc::new(MatchCoordinator::new(
            &config.matchmaking,
            ports.matches.clone(),
            ports.submissions.clone(),
            ports.ratings.clone(),
            ports.catalog.clone(),
            ports.judge.clone(),
            pubsub.clone(),
            scheduler.clone(),
        ));
        let matchmaker = Arc::new(Matchmaker::new(
            &config.matchmaking,
            ports.ratings.clone(),
            ports.catalog.clone(),
            matches.clone(),
            pubsub.clone(),
        ));
        let rooms = Arc::new(RoomCoordinator::new(
            &config.rooms,
            ports.rooms.clone(),
            ports.submissions.clone(),
            ports.leaderboard.clone(),
            ports.catalog.clone(),
            ports.judge.clone(),
            pubsub.clone(),
            scheduler.clone(),
        ));

        Self {
            config: Arc::new(config),
            connections,
            pubsub,
            scheduler,
            matchmaker,
            matches,
            rooms,
            ratings: ports.ratings,
            catalog: ports.catalog,
        }
    }
}
