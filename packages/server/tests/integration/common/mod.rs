use std::net::SocketAddr;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use ::common::{JudgeOutcome, JudgeRequest, Verdict};
use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;
use uuid::Uuid;

use server::config::{
    AppConfig, AuthConfig, JudgeConfig, MatchmakingConfig, RoomsConfig, ServerConfig,
};
use server::entity::leaderboard::LeaderboardEntry;
use server::entity::matches::Match;
use server::entity::player::PlayerProfile;
use server::entity::room::Room;
use server::entity::submission::Submission;
use server::error::AppError;
use server::gateway::connections::ConnectionId;
use server::gateway::dispatch::dispatch as dispatch_event;
use server::gateway::{ClientEvent, ServerEvent, LOBBY_CHANNEL};
use server::judge::{JudgeClient, JudgeError};
use server::state::{AppState, Ports};
use server::store::{
    LeaderboardStore, MatchStore, MemoryStore, RatingStore, RoomStore, StoreError, SubmissionStore,
};
use server::utils::jwt;
use server::{build_router, seed};

pub const EVENT_TIMEOUT: Duration = Duration::from_secs(5);

/// Deterministic judge engine driven by markers in the source code.
///
/// `WRONG` fails the first case, `CRASH` simulates an unreachable engine,
/// `SLOW` passes every case but far over any time budget, and `SLEEP` stalls
/// five seconds before accepting, leaving a window for deadlines to fire.
pub struct FakeJudge;

#[async_trait]
impl JudgeClient for FakeJudge {
    async fn judge(&self, request: JudgeRequest) -> Result<JudgeOutcome, JudgeError> {
        if request.source_code.contains("CRASH") {
            return Err(JudgeError::Transport("connection refused".into()));
        }
        if request.source_code.contains("SLEEP") {
            tokio::time::sleep(Duration::from_secs(5)).await;
            return Ok(JudgeOutcome::accepted(42, 1024));
        }
        if request.source_code.contains("WRONG") {
            return Ok(JudgeOutcome::rejected(
                Verdict::WrongAnswer,
                "expected 3, got 4",
            ));
        }
        if request.source_code.contains("SLOW") {
            return Ok(JudgeOutcome::accepted(10_000_000, 1024));
        }
        Ok(JudgeOutcome::accepted(42, 1024))
    }
}

/// RoomStore wrapper that fails the nth `update` call once, for exercising
/// the compensating-cleanup paths.
pub struct FailingRoomStore {
    inner: Arc<MemoryStore>,
    fail_in: AtomicI64,
}

impl FailingRoomStore {
    pub fn new(inner: Arc<MemoryStore>) -> Arc<Self> {
        Arc::new(Self {
            inner,
            fail_in: AtomicI64::new(-1),
        })
    }

    /// The nth update from now fails (1 = the very next one).
    pub fn fail_on_update(&self, nth: i64) {
        self.fail_in.store(nth, Ordering::SeqCst);
    }
}

#[async_trait]
impl RoomStore for FailingRoomStore {
    async fn insert(&self, doc: Room) -> Result<(), StoreError> {
        RoomStore::insert(self.inner.as_ref(), doc).await
    }

    async fn find(&self, id: Uuid) -> Result<Option<Room>, StoreError> {
        RoomStore::find(self.inner.as_ref(), id).await
    }

    async fn update(&self, doc: &Room) -> Result<(), StoreError> {
        if self.fail_in.fetch_sub(1, Ordering::SeqCst) == 1 {
            return Err(StoreError::Backend("simulated write failure".into()));
        }
        RoomStore::update(self.inner.as_ref(), doc).await
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        RoomStore::delete(self.inner.as_ref(), id).await
    }

    async fn list(&self) -> Result<Vec<Room>, StoreError> {
        RoomStore::list(self.inner.as_ref()).await
    }
}

/// Match store that fails the nth update, for compensating-cleanup tests.
pub struct FailingMatchStore {
    inner: Arc<MemoryStore>,
    fail_in: AtomicI64,
}

impl FailingMatchStore {
    pub fn new(inner: Arc<MemoryStore>) -> Arc<Self> {
        Arc::new(Self {
            inner,
            fail_in: AtomicI64::new(-1),
        })
    }

    /// The nth update from now fails (1 = the very next one).
    pub fn fail_on_update(&self, nth: i64) {
        self.fail_in.store(nth, Ordering::SeqCst);
    }
}

#[async_trait]
impl MatchStore for FailingMatchStore {
    async fn insert(&self, doc: Match) -> Result<(), StoreError> {
        MatchStore::insert(self.inner.as_ref(), doc).await
    }

    async fn find(&self, id: Uuid) -> Result<Option<Match>, StoreError> {
        MatchStore::find(self.inner.as_ref(), id).await
    }

    async fn update(&self, doc: &Match) -> Result<(), StoreError> {
        if self.fail_in.fetch_sub(1, Ordering::SeqCst) == 1 {
            return Err(StoreError::Backend("simulated write failure".into()));
        }
        MatchStore::update(self.inner.as_ref(), doc).await
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        MatchStore::delete(self.inner.as_ref(), id).await
    }
}

pub fn test_config() -> AppConfig {
    AppConfig {
        server: ServerConfig {
            host: "127.0.0.1".into(),
            port: 0,
            cors_allow_origin: "*".into(),
        },
        auth: AuthConfig {
            jwt_secret: "integration_test_secret".into(),
        },
        judge: JudgeConfig {
            url: "http://127.0.0.1:9".into(),
            request_timeout_ms: 1_000,
        },
        matchmaking: MatchmakingConfig {
            rating_gap: 1999,
            match_duration_secs: 600,
            rating_stake: 25,
        },
        rooms: RoomsConfig {
            default_max_players: 4,
            max_players_limit: 4,
        },
    }
}

pub struct TestAppBuilder {
    config: AppConfig,
    store: Arc<MemoryStore>,
    rooms_store: Option<Arc<dyn RoomStore>>,
    matches_store: Option<Arc<dyn MatchStore>>,
    seed: bool,
}

impl TestAppBuilder {
    /// The shared backing store, for wrapping ports before spawn.
    pub fn store(&self) -> Arc<MemoryStore> {
        self.store.clone()
    }

    pub fn config(mut self, mutate: impl FnOnce(&mut AppConfig)) -> Self {
        mutate(&mut self.config);
        self
    }

    pub fn rooms_store(mut self, rooms: Arc<dyn RoomStore>) -> Self {
        self.rooms_store = Some(rooms);
        self
    }

    pub fn matches_store(mut self, matches: Arc<dyn MatchStore>) -> Self {
        self.matches_store = Some(matches);
        self
    }

    pub fn no_seed(mut self) -> Self {
        self.seed = false;
        self
    }

    pub async fn spawn(self) -> TestApp {
        let judge: Arc<dyn JudgeClient> = Arc::new(FakeJudge);
        let mut ports = Ports::with_store(self.store.clone(), judge);
        if let Some(rooms) = self.rooms_store {
            ports.rooms = rooms;
        }
        if let Some(matches) = self.matches_store {
            ports.matches = matches;
        }

        let state = AppState::new(self.config, ports);
        if self.seed {
            seed::seed_demo_data(state.ratings.as_ref(), state.catalog.as_ref())
                .await
                .expect("seeding demo data");
        }

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("binding test listener");
        let addr = listener.local_addr().expect("reading local addr");
        let app = build_router(state.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serving test app");
        });

        TestApp {
            state,
            store: self.store,
            addr,
            http: reqwest::Client::new(),
        }
    }
}

/// In-process application plus a live HTTP listener.
///
/// Players attach straight to the connection registry, so tests drive the
/// dispatch layer without a websocket client and read pushed events from the
/// connection's outbound channel.
pub struct TestApp {
    pub state: AppState,
    pub store: Arc<MemoryStore>,
    pub addr: SocketAddr,
    pub http: reqwest::Client,
}

impl TestApp {
    pub fn builder() -> TestAppBuilder {
        TestAppBuilder {
            config: test_config(),
            store: Arc::new(MemoryStore::new()),
            rooms_store: None,
            matches_store: None,
            seed: true,
        }
    }

    pub async fn spawn() -> Self {
        Self::builder().spawn().await
    }

    /// Registers a connection for a player seeded with the given rating.
    pub async fn connect_player(&self, username: &str, rating: i32) -> TestPlayer {
        let profile = PlayerProfile::new(username, rating);
        self.state
            .ratings
            .insert(profile.clone())
            .await
            .expect("seeding player");
        self.attach(profile.id, username)
    }

    /// Registers a connection for a player with no rating record.
    pub fn connect_guest(&self, username: &str) -> TestPlayer {
        self.attach(Uuid::new_v4(), username)
    }

    fn attach(&self, user_id: Uuid, username: &str) -> TestPlayer {
        let (connection, rx) = self.state.connections.register(user_id, username);
        self.state.pubsub.subscribe(connection, LOBBY_CHANNEL);
        TestPlayer {
            user_id,
            username: username.to_string(),
            connection,
            rx,
        }
    }

    pub async fn dispatch(&self, player: &TestPlayer, event: ClientEvent) -> Result<(), AppError> {
        dispatch_event(
            &self.state,
            player.connection,
            player.user_id,
            &player.username,
            event,
        )
        .await
    }

    /// Dispatches on a background task, for events that block on the judge.
    pub fn dispatch_task(
        &self,
        player: &TestPlayer,
        event: ClientEvent,
    ) -> JoinHandle<Result<(), AppError>> {
        let state = self.state.clone();
        let connection = player.connection;
        let user_id = player.user_id;
        let username = player.username.clone();
        tokio::spawn(
            async move { dispatch_event(&state, connection, user_id, &username, event).await },
        )
    }

    pub fn token_for(&self, user_id: Uuid, username: &str) -> String {
        jwt::sign(user_id, username, &self.state.config.auth.jwt_secret).expect("signing token")
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn match_doc(&self, id: Uuid) -> Option<Match> {
        MatchStore::find(self.store.as_ref(), id)
            .await
            .expect("match lookup")
    }

    pub async fn room_doc(&self, id: Uuid) -> Option<Room> {
        RoomStore::find(self.store.as_ref(), id)
            .await
            .expect("room lookup")
    }

    pub async fn submission_doc(&self, id: Uuid) -> Option<Submission> {
        SubmissionStore::find(self.store.as_ref(), id)
            .await
            .expect("submission lookup")
    }

    pub async fn rating_of(&self, user_id: Uuid) -> i32 {
        RatingStore::find(self.store.as_ref(), user_id)
            .await
            .expect("rating lookup")
            .expect("profile exists")
            .rating
    }

    pub async fn leaderboard_for(&self, problem_id: Uuid) -> Vec<LeaderboardEntry> {
        LeaderboardStore::list_for_problem(self.store.as_ref(), problem_id)
            .await
            .expect("leaderboard lookup")
    }
}

pub struct TestPlayer {
    pub user_id: Uuid,
    pub username: String,
    pub connection: ConnectionId,
    pub rx: UnboundedReceiver<ServerEvent>,
}

impl TestPlayer {
    /// Next pushed event as (name, data).
    pub async fn recv(&mut self) -> (String, Value) {
        let event = tokio::time::timeout(EVENT_TIMEOUT, self.rx.recv())
            .await
            .expect("timed out waiting for an event")
            .expect("connection channel closed");
        event_parts(event)
    }

    /// Skips frames until `name` arrives and returns its data.
    pub async fn expect(&mut self, name: &str) -> Value {
        loop {
            let (got, data) = self.recv().await;
            if got == name {
                return data;
            }
        }
    }

    /// Asserts `name` is not among the currently queued frames. Everything
    /// queued is consumed.
    pub fn assert_not_queued(&mut self, name: &str) {
        while let Ok(event) = self.rx.try_recv() {
            let (got, _) = event_parts(event);
            assert_ne!(got, name, "unexpected {name} frame");
        }
    }

    /// Drains the queue, counting frames with the given name.
    pub fn queued(&mut self, name: &str) -> usize {
        let mut seen = 0;
        while let Ok(event) = self.rx.try_recv() {
            let (got, _) = event_parts(event);
            if got == name {
                seen += 1;
            }
        }
        seen
    }

    pub fn drain(&mut self) {
        while self.rx.try_recv().is_ok() {}
    }
}

fn event_parts(event: ServerEvent) -> (String, Value) {
    let value = serde_json::to_value(&event).expect("event serializes");
    let name = value["event"].as_str().expect("tagged event").to_string();
    let data = value.get("data").cloned().unwrap_or(Value::Null);
    (name, data)
}

pub fn uuid_field(data: &Value, key: &str) -> Uuid {
    data[key]
        .as_str()
        .and_then(|raw| Uuid::parse_str(raw).ok())
        .unwrap_or_else(|| panic!("missing uuid field `{key}` in {data}"))
}
