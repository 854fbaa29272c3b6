use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::task::JoinHandle;
use tracing::info;
use uuid::Uuid;

struct Entry<V> {
    value: V,
    expires_at: Instant,
}

/// Short-lived values keyed by generated id.
///
/// Entries become invisible to `get` once their TTL passes and are dropped
/// for good by `sweep_expired`, normally driven by [`spawn_sweeper`].
pub struct SessionStore<V> {
    entries: DashMap<String, Entry<V>>,
    ttl: Duration,
}

impl<V: Clone> SessionStore<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// Store `value` under a fresh id and return the id.
    pub fn insert(&self, value: V) -> String {
        let id = Uuid::now_v7().to_string();
        self.entries.insert(
            id.clone(),
            Entry {
                value,
                expires_at: Instant::now() + self.ttl,
            },
        );
        id
    }

    pub fn get(&self, id: &str) -> Option<V> {
        let entry = self.entries.get(id)?;
        (Instant::now() < entry.expires_at).then(|| entry.value.clone())
    }

    /// Drop every expired entry, returning how many were removed.
    pub fn sweep_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| now < entry.expires_at);
        before.saturating_sub(self.entries.len())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Periodically sweep `store` until the task is aborted.
pub fn spawn_sweeper<V>(
    store: Arc<SessionStore<V>>,
    name: &'static str,
    every: Duration,
) -> JoinHandle<()>
where
    V: Clone + Send + Sync + 'static,
{
    tokio::spawn(async move {
        // interval panics on a zero period
        let mut interval = tokio::time::interval(every.max(Duration::from_millis(1)));

        loop {
            interval.tick().await;
            let removed = store.sweep_expired();
            if removed > 0 {
                info!(store = name, removed, "Swept expired session entries");
            }
        }
    })
}
