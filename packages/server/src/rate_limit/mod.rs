//! Sliding-window request throttle for submit and run.
//!
//! Each `(action, client)` pair owns a window of timestamped entries. A
//! request is admitted while fewer than `max_requests` entries fall inside
//! the last `window`. The check and the insert are separate store calls, so
//! concurrent requests can overshoot the limit slightly.

pub mod memory;
pub mod redis;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

use crate::config::RateLimitConfig;

pub use memory::MemoryWindowStore;
pub use self::redis::RedisWindowStore;

#[derive(Debug, Error)]
pub enum RateLimitError {
    #[error("redis error: {0}")]
    Redis(#[from] ::redis::RedisError),

    #[error("window store unavailable: {0}")]
    Unavailable(String),
}

/// What is left in a window after pruning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WindowSnapshot {
    pub count: u64,
    /// Timestamp (ms) of the oldest surviving entry.
    pub oldest_ms: Option<i64>,
}

/// Backing storage for per-key windows.
#[async_trait]
pub trait WindowStore: Send + Sync {
    /// Drop entries with a timestamp at or below `cutoff_ms` and describe
    /// what remains.
    async fn prune_and_count(&self, key: &str, cutoff_ms: i64)
    -> Result<WindowSnapshot, RateLimitError>;

    /// Add `member` at `now_ms` and expire the whole key after `ttl`.
    async fn record(
        &self,
        key: &str,
        member: &str,
        now_ms: i64,
        ttl: Duration,
    ) -> Result<(), RateLimitError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    Limited { retry_after_secs: u64 },
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed)
    }
}

#[derive(Clone)]
pub struct SlidingWindowLimiter {
    store: Arc<dyn WindowStore>,
    enabled: bool,
    window: Duration,
    max_requests: u32,
    key_prefix: String,
}

impl SlidingWindowLimiter {
    pub fn new(store: Arc<dyn WindowStore>, config: &RateLimitConfig) -> Self {
        Self {
            store,
            enabled: config.enabled,
            window: Duration::from_secs(config.window_secs),
            max_requests: config.max_requests,
            key_prefix: config.key_prefix.clone(),
        }
    }

    pub fn key(&self, action: &str, client: &str) -> String {
        format!("{}:{}:{}", self.key_prefix, action, client)
    }

    pub async fn check(&self, action: &str, client: &str) -> Decision {
        self.check_at(action, client, Utc::now().timestamp_millis())
            .await
    }

    /// Admit or reject one request at `now_ms`.
    ///
    /// Store failures admit the request.
    pub async fn check_at(&self, action: &str, client: &str, now_ms: i64) -> Decision {
        if !self.enabled {
            return Decision::Allowed;
        }

        let key = self.key(action, client);
        match self.try_check(&key, now_ms).await {
            Ok(decision) => decision,
            Err(e) => {
                warn!(key = %key, error = %e, "Rate limit store failed, allowing request");
                Decision::Allowed
            }
        }
    }

    async fn try_check(&self, key: &str, now_ms: i64) -> Result<Decision, RateLimitError> {
        let window_ms = self.window.as_millis() as i64;
        let snapshot = self
            .store
            .prune_and_count(key, now_ms - window_ms)
            .await?;

        if snapshot.count >= u64::from(self.max_requests) {
            let oldest = snapshot.oldest_ms.unwrap_or(now_ms);
            let wait_ms = (oldest + window_ms - now_ms).max(0);
            // Round up so the client never retries a moment too early.
            let retry_after_secs = ((wait_ms + 999) / 1000).max(1) as u64;
            return Ok(Decision::Limited { retry_after_secs });
        }

        let member = format!("{}-{}", now_ms, Uuid::new_v4());
        self.store.record(key, &member, now_ms, self.window).await?;
        Ok(Decision::Allowed)
    }
}
