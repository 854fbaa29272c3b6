use std::collections::BTreeSet;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::debug;

use super::{RateLimitError, WindowSnapshot, WindowStore};

/// Process-local window store.
///
/// Each key expires `ttl` after its latest entry, like `EXPIRE` on the Redis
/// store. Expired keys are evicted by a sweep that runs from `record` at most
/// once per `ttl`.
#[derive(Default)]
pub struct MemoryWindowStore {
    windows: DashMap<String, Window>,
    next_sweep_ms: AtomicI64,
}

#[derive(Default)]
struct Window {
    // (timestamp_ms, member), ordered by time
    entries: BTreeSet<(i64, String)>,
    expires_at_ms: i64,
}

impl MemoryWindowStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries currently held for `key`, including ones not yet pruned.
    pub fn len(&self, key: &str) -> usize {
        self.windows.get(key).map_or(0, |w| w.entries.len())
    }

    /// Number of keys held, expired or not.
    pub fn key_count(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    /// Drop every key whose expiry is at or before `now_ms`.
    pub fn sweep_expired(&self, now_ms: i64) -> usize {
        let before = self.windows.len();
        self.windows.retain(|_, w| w.expires_at_ms > now_ms);
        before.saturating_sub(self.windows.len())
    }
}

fn ttl_ms(ttl: Duration) -> i64 {
    i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX)
}

#[async_trait]
impl WindowStore for MemoryWindowStore {
    async fn prune_and_count(
        &self,
        key: &str,
        cutoff_ms: i64,
    ) -> Result<WindowSnapshot, RateLimitError> {
        let Some(mut window) = self.windows.get_mut(key) else {
            return Ok(WindowSnapshot::default());
        };

        // Keep everything strictly newer than the cutoff.
        let kept = window.entries.split_off(&(cutoff_ms + 1, String::new()));
        window.entries = kept;

        let snapshot = WindowSnapshot {
            count: window.entries.len() as u64,
            oldest_ms: window.entries.first().map(|(ts, _)| *ts),
        };
        let empty = window.entries.is_empty();
        drop(window);

        if empty {
            self.windows.remove_if(key, |_, w| w.entries.is_empty());
        }
        Ok(snapshot)
    }

    async fn record(
        &self,
        key: &str,
        member: &str,
        now_ms: i64,
        ttl: Duration,
    ) -> Result<(), RateLimitError> {
        let ttl_ms = ttl_ms(ttl).max(1);

        let due = self.next_sweep_ms.load(Ordering::Relaxed);
        if now_ms >= due
            && self
                .next_sweep_ms
                .compare_exchange(
                    due,
                    now_ms.saturating_add(ttl_ms),
                    Ordering::Relaxed,
                    Ordering::Relaxed,
                )
                .is_ok()
        {
            let evicted = self.sweep_expired(now_ms);
            if evicted > 0 {
                debug!(evicted, "Evicted idle rate-limit windows");
            }
        }

        let mut window = self.windows.entry(key.to_string()).or_default();
        window.entries.insert((now_ms, member.to_string()));
        window.expires_at_ms = now_ms.saturating_add(ttl_ms);
        Ok(())
    }
}
