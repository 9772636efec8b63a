/// Active accounts registry
///
/// Accounts whose feeds are worth keeping warm. Backed by a sorted set
/// scored by last-seen timestamp; the request layer records activity.
use crate::error::Result;
use async_trait::async_trait;
use feed_store::StoreKey;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

#[async_trait]
pub trait ActiveAccounts: Send + Sync {
    /// Most recently active accounts first
    async fn active_accounts(&self, limit: usize) -> Result<Vec<u64>>;
}

#[derive(Clone)]
pub struct RedisActiveAccounts {
    conn: ConnectionManager,
}

impl RedisActiveAccounts {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl ActiveAccounts for RedisActiveAccounts {
    async fn active_accounts(&self, limit: usize) -> Result<Vec<u64>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let mut conn = self.conn.clone();
        let ids: Vec<u64> = conn
            .zrevrange(StoreKey::active_accounts().as_str(), 0, limit as isize - 1)
            .await?;
        Ok(ids)
    }
}
