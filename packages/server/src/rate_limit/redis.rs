use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;

use super::{RateLimitError, WindowSnapshot, WindowStore};

/// Window store on Redis sorted sets: one set per key, scored by the
/// request timestamp in milliseconds.
#[derive(Clone)]
pub struct RedisWindowStore {
    conn: MultiplexedConnection,
}

impl RedisWindowStore {
    pub fn new(conn: MultiplexedConnection) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl WindowStore for RedisWindowStore {
    async fn prune_and_count(
        &self,
        key: &str,
        cutoff_ms: i64,
    ) -> Result<WindowSnapshot, RateLimitError> {
        let mut conn = self.conn.clone();

        redis::cmd("ZREMRANGEBYSCORE")
            .arg(key)
            .arg("-inf")
            .arg(cutoff_ms)
            .query_async::<()>(&mut conn)
            .await?;

        let count: u64 = redis::cmd("ZCARD").arg(key).query_async(&mut conn).await?;
        if count == 0 {
            return Ok(WindowSnapshot::default());
        }

        let oldest: Vec<(String, f64)> = redis::cmd("ZRANGE")
            .arg(key)
            .arg(0)
            .arg(0)
            .arg("WITHSCORES")
            .query_async(&mut conn)
            .await?;

        Ok(WindowSnapshot {
            count,
            oldest_ms: oldest.first().map(|(_, score)| *score as i64),
        })
    }

    async fn record(
        &self,
        key: &str,
        member: &str,
        now_ms: i64,
        ttl: Duration,
    ) -> Result<(), RateLimitError> {
        let mut conn = self.conn.clone();

        redis::cmd("ZADD")
            .arg(key)
            .arg(now_ms)
            .arg(member)
            .query_async::<()>(&mut conn)
            .await?;

        redis::cmd("EXPIRE")
            .arg(key)
            .arg(ttl.as_secs().max(1))
            .query_async::<()>(&mut conn)
            .await?;

        Ok(())
    }
}
