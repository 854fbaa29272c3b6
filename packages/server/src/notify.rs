//! Best-effort realtime notifications.
//!
//! Events are wrapped in an [`EventEnvelope`] and handed to a [`Notifier`].
//! Delivery failures are logged and reported to the caller as a
//! [`Delivery`] value; they never fail the operation that emitted them.

use async_trait::async_trait;
use common::{Event, EventEnvelope, Room};
use redis::aio::MultiplexedConnection;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::store::RankingEntry;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn publish(&self, envelope: &EventEnvelope) -> Result<(), NotifyError>;
}

/// Publishes JSON envelopes on channel `{prefix}:{room}`.
#[derive(Clone)]
pub struct RedisNotifier {
    conn: MultiplexedConnection,
    prefix: String,
}

impl RedisNotifier {
    pub fn new(conn: MultiplexedConnection, prefix: impl Into<String>) -> Self {
        Self {
            conn,
            prefix: prefix.into(),
        }
    }

    pub fn channel(&self, room: Room) -> String {
        format!("{}:{}", self.prefix, room)
    }
}

#[async_trait]
impl Notifier for RedisNotifier {
    async fn publish(&self, envelope: &EventEnvelope) -> Result<(), NotifyError> {
        let payload = serde_json::to_string(envelope)?;
        let mut conn = self.conn.clone();
        let receivers: i64 = redis::cmd("PUBLISH")
            .arg(self.channel(envelope.room))
            .arg(payload)
            .query_async(&mut conn)
            .await?;
        debug!(topic = %envelope.topic, room = %envelope.room, receivers, "Published event");
        Ok(())
    }
}

/// In-process fan-out. Publishing with no subscribers succeeds.
#[derive(Clone)]
pub struct BroadcastNotifier {
    tx: broadcast::Sender<EventEnvelope>,
}

impl BroadcastNotifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.tx.subscribe()
    }
}

impl Default for BroadcastNotifier {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl Notifier for BroadcastNotifier {
    async fn publish(&self, envelope: &EventEnvelope) -> Result<(), NotifyError> {
        // send only fails when nobody is listening
        let _ = self.tx.send(envelope.clone());
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Delivered,
    Failed,
}

/// Publish `event`, logging instead of propagating any failure.
pub async fn publish_best_effort<E: Event>(notifier: &dyn Notifier, event: &E) -> Delivery {
    let envelope = event.to_envelope();
    match notifier.publish(&envelope).await {
        Ok(()) => Delivery::Delivered,
        Err(e) => {
            warn!(
                topic = %envelope.topic,
                room = %envelope.room,
                error = %e,
                "Failed to publish realtime event"
            );
            Delivery::Failed
        }
    }
}

/// A user's solved-problem set grew.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserStatsChanged {
    pub user_id: i32,
    pub problem_id: i32,
    pub submission_id: i32,
    pub solved_count: usize,
}

impl Event for UserStatsChanged {
    fn topic(&self) -> &'static str {
        "user-stats-changed"
    }

    fn room(&self) -> Room {
        Room::User(self.user_id)
    }
}

/// Where one user finished in a finalized contest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Standing {
    pub rank: u32,
    pub score: f64,
    pub problems_solved: u32,
    pub streak: u32,
}

/// Sent once per ranked user, then once to the contest room with no standing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardFinalized {
    pub contest_id: i32,
    pub audience: Room,
    pub standing: Option<Standing>,
}

impl Event for LeaderboardFinalized {
    fn topic(&self) -> &'static str {
        "leaderboard-finalized"
    }

    fn room(&self) -> Room {
        self.audience
    }
}

/// Fresh realtime rankings for a running contest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardUpdated {
    pub contest_id: i32,
    pub rankings: Vec<RankingEntry>,
}

impl Event for LeaderboardUpdated {
    fn topic(&self) -> &'static str {
        "leaderboard-updated"
    }

    fn room(&self) -> Room {
        Room::Contest(self.contest_id)
    }
}
