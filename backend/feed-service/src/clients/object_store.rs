/// Object store
///
/// Bulk lookup of status objects by identifier and resolution of external
/// references to local identifiers. The Redis implementation keeps statuses
/// as JSON under `v1:status:{id}` and an external-reference index under
/// `v1:status:uri:{reference}`.
use crate::error::Result;
use crate::models::{Status, TrendCandidate};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use feed_store::{ContentId, StoreKey};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::{debug, warn};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch the statuses that still exist; result order is unspecified
    async fn bulk_fetch(&self, ids: &[ContentId]) -> Result<Vec<Status>>;

    /// Map an external reference to a local id, creating the local copy from
    /// the remote payload when needed. `Ok(None)` when it cannot be resolved.
    async fn resolve_or_create(&self, candidate: &TrendCandidate) -> Result<Option<ContentId>>;
}

/// Time-ordered id: creation milliseconds in the high bits, a sequence in the low 16
pub fn snowflake_id(created_at: DateTime<Utc>, sequence: u64) -> ContentId {
    let millis = created_at.timestamp_millis().max(0) as u64;
    (millis << 16) | (sequence & 0xffff)
}

/// Cache-tier object store in Redis
#[derive(Clone)]
pub struct RedisObjectStore {
    conn: ConnectionManager,
}

impl RedisObjectStore {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }

    /// Store (or overwrite) a status object
    pub async fn put(&self, status: &Status) -> Result<()> {
        let json = serde_json::to_string(status)?;
        let mut conn = self.conn.clone();
        conn.set::<_, _, ()>(StoreKey::status(status.id).as_str(), json)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for RedisObjectStore {
    async fn bulk_fetch(&self, ids: &[ContentId]) -> Result<Vec<Status>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let keys: Vec<String> = ids
            .iter()
            .map(|id| StoreKey::status(*id).as_str().to_string())
            .collect();
        let mut conn = self.conn.clone();
        let values: Vec<Option<String>> = redis::cmd("MGET")
            .arg(&keys)
            .query_async(&mut conn)
            .await?;

        let statuses: Vec<Status> = values
            .into_iter()
            .flatten()
            .filter_map(|json| match serde_json::from_str::<Status>(&json) {
                Ok(status) => Some(status),
                Err(e) => {
                    warn!(error = %e, "Skipping undecodable cached status");
                    None
                }
            })
            .collect();

        debug!(requested = ids.len(), found = statuses.len(), "Bulk status fetch");
        Ok(statuses)
    }

    async fn resolve_or_create(&self, candidate: &TrendCandidate) -> Result<Option<ContentId>> {
        let uri_key = StoreKey::status_uri(&candidate.reference);
        let mut conn = self.conn.clone();

        if let Some(id) = conn.get::<_, Option<ContentId>>(uri_key.as_str()).await? {
            return Ok(Some(id));
        }

        let Some(remote) = &candidate.remote else {
            debug!(reference = %candidate.reference, "Unresolvable reference without payload");
            return Ok(None);
        };

        let sequence: u64 = conn.incr(StoreKey::status_sequence().as_str(), 1).await?;
        let id = snowflake_id(remote.created_at, sequence);
        self.put(&remote.to_local(id)).await?;

        let claimed: Option<String> = redis::cmd("SET")
            .arg(uri_key.as_str())
            .arg(id)
            .arg("NX")
            .query_async(&mut conn)
            .await?;

        if claimed.is_some() {
            debug!(reference = %candidate.reference, id, "Created local status");
            return Ok(Some(id));
        }

        // Another worker resolved the same reference first
        conn.del::<_, ()>(StoreKey::status(id).as_str()).await?;
        let winner: Option<ContentId> = conn.get(uri_key.as_str()).await?;
        Ok(winner)
    }
}
