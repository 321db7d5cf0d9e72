use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::config::MatchmakingConfig;
use crate::error::AppError;
use crate::gateway::connections::ConnectionId;
use crate::gateway::events::{FoundCompetitorPayload, ServerEvent};
use crate::gateway::{match_channel, PubSub};
use crate::services::match_session::MatchCoordinator;
use crate::store::{ProblemCatalog, RatingStore};

/// One player waiting to be paired.
#[derive(Clone, Debug)]
pub struct WaitingEntry {
    pub player_id: Uuid,
    pub username: String,
    pub rating: i32,
    pub connection: ConnectionId,
    pub enqueued_at: DateTime<Utc>,
}

/// What `enqueue` did with the caller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// No compatible opponent (or no open problem for the pairing); the
    /// caller now waits in the pool.
    Queued,
    /// Paired with a waiting opponent; a Pending match was created.
    Paired { match_id: Uuid },
}

/// The waiting pool. One async mutex guards the whole pairing transaction,
/// so two concurrent enqueues can never pick the same opponent.
pub struct Matchmaker {
    pool: Mutex<Vec<WaitingEntry>>,
    rating_gap: i32,
    ratings: Arc<dyn RatingStore>,
    catalog: Arc<dyn ProblemCatalog>,
    matches: Arc<MatchCoordinator>,
    pubsub: Arc<PubSub>,
}

impl Matchmaker {
    pub fn new(
        config: &MatchmakingConfig,
        ratings: Arc<dyn RatingStore>,
        catalog: Arc<dyn ProblemCatalog>,
        matches: Arc<MatchCoordinator>,
        pubsub: Arc<PubSub>,
    ) -> Self {
        Self {
            pool: Mutex::new(Vec::new()),
            rating_gap: config.rating_gap,
            ratings,
            catalog,
            matches,
            pubsub,
        }
    }

    /// Pairs the caller with the first waiting player within the rating gap,
    /// or parks them in the pool.
    ///
    /// The problem is drawn from the band of the lower-rated player before
    /// the opponent is committed; if that band has no open problem the
    /// opponent keeps waiting and the caller queues up behind them.
    #[instrument(skip(self), fields(player = %player_id, username = %username))]
    pub async fn enqueue(
        &self,
        player_id: Uuid,
        username: &str,
        connection: ConnectionId,
    ) -> Result<EnqueueOutcome, AppError> {
        let rating = self
            .ratings
            .find(player_id)
            .await?
            .map(|p| p.rating)
            .unwrap_or(0);

        let mut pool = self.pool.lock().await;
        // A re-enqueue (reconnect, double click) replaces the stale entry.
        pool.retain(|e| e.player_id != player_id);

        let entry = WaitingEntry {
            player_id,
            username: username.to_string(),
            rating,
            connection,
            enqueued_at: Utc::now(),
        };

        let candidate = pool
            .iter()
            .position(|e| (rating - e.rating).abs() < self.rating_gap);
        let Some(index) = candidate else {
            pool.push(entry);
            info!(waiting = pool.len(), "queued for matchmaking");
            return Ok(EnqueueOutcome::Queued);
        };

        let floor = rating.min(pool[index].rating);
        let band = self.catalog.band_for(floor).await?;
        let problem = match band {
            Some(band) => self.catalog.pick_open_in_band(&band.name).await?,
            None => None,
        };
        let Some(problem) = problem else {
            // Nothing to play on for this pairing. The opponent keeps their
            // place in line and the caller waits behind them.
            pool.push(entry);
            info!(waiting = pool.len(), "no open problem for pairing, queued");
            return Ok(EnqueueOutcome::Queued);
        };

        let opponent = pool.remove(index);
        let paired = match self.matches.create_pending(problem.id).await {
            Ok(doc) => doc,
            Err(err) => {
                pool.insert(index, opponent);
                return Err(err);
            }
        };
        drop(pool);

        let channel = match_channel(paired.id);
        self.pubsub.subscribe(connection, &channel);
        self.pubsub.subscribe(opponent.connection, &channel);
        self.pubsub.publish(
            &channel,
            &ServerEvent::FoundCompetitor(FoundCompetitorPayload {
                room_id: paired.id,
                match_id: paired.id,
            }),
        );
        info!(
            match_id = %paired.id,
            opponent = %opponent.username,
            problem = %problem.id,
            "paired players"
        );
        Ok(EnqueueOutcome::Paired { match_id: paired.id })
    }

    /// Drops the player from the pool. Safe to call when they are not in it.
    pub async fn cancel(&self, player_id: Uuid) {
        let mut pool = self.pool.lock().await;
        pool.retain(|e| e.player_id != player_id);
    }

    pub async fn waiting_count(&self) -> usize {
        self.pool.lock().await.len()
    }
}
