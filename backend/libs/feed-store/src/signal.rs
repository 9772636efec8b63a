//! Regeneration signal
//!
//! A per-subject flag set while a precompute is in flight. The flag always
//! carries a TTL so a crashed or hung worker cannot leave it set forever.

use crate::{StoreKey, StoreMetrics, StoreResult, Subject};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::time::Duration;
use tracing::debug;

#[async_trait]
pub trait RegenerationSignal: Send + Sync {
    /// Set the flag; it expires on its own after `ttl`
    async fn mark(&self, subject: &Subject, ttl: Duration) -> StoreResult<()>;

    async fn clear(&self, subject: &Subject) -> StoreResult<()>;

    async fn is_regenerating(&self, subject: &Subject) -> StoreResult<bool>;
}

/// Redis `SET EX` / `DEL` / `EXISTS` backed signal
#[derive(Clone)]
pub struct RedisRegenerationSignal {
    conn: ConnectionManager,
    metrics: StoreMetrics,
}

impl RedisRegenerationSignal {
    pub fn new(conn: ConnectionManager) -> Self {
        Self {
            conn,
            metrics: StoreMetrics::new(),
        }
    }
}

/// `SET EX 0` is rejected by Redis
fn ttl_secs(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}

#[async_trait]
impl RegenerationSignal for RedisRegenerationSignal {
    async fn mark(&self, subject: &Subject, ttl: Duration) -> StoreResult<()> {
        let key = StoreKey::regeneration(subject);
        let mut conn = self.conn.clone();
        conn.set_ex::<_, _, ()>(key.as_str(), 1, ttl_secs(ttl))
            .await
            .map_err(|e| self.metrics.record_error("signal_mark", e))?;

        debug!(subject = %subject, ttl_secs = ttl_secs(ttl), "Regeneration signal set");
        self.metrics.record_write("signal_mark");
        Ok(())
    }

    async fn clear(&self, subject: &Subject) -> StoreResult<()> {
        let key = StoreKey::regeneration(subject);
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(key.as_str())
            .await
            .map_err(|e| self.metrics.record_error("signal_clear", e))?;

        debug!(subject = %subject, "Regeneration signal cleared");
        self.metrics.record_write("signal_clear");
        Ok(())
    }

    async fn is_regenerating(&self, subject: &Subject) -> StoreResult<bool> {
        let key = StoreKey::regeneration(subject);
        let mut conn = self.conn.clone();
        let exists: bool = conn
            .exists(key.as_str())
            .await
            .map_err(|e| self.metrics.record_error("signal_read", e))?;

        self.metrics.record_read("signal_read");
        Ok(exists)
    }
}
