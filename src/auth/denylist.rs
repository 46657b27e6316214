use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tokio::task::JoinHandle;
use tokio::time;

/// Store of logged-out tokens, each kept until its natural expiry.
#[async_trait]
pub trait RevocationStore: Send + Sync {
    async fn is_revoked(&self, token: &str) -> anyhow::Result<bool>;
    async fn revoke(&self, token: &str, ttl_secs: u64) -> anyhow::Result<()>;
    /// Drop process-local entries past their expiry. Returns how many went.
    fn evict_expired(&self) -> usize;
}

fn retain_live(entries: &DashMap<String, Instant>) -> usize {
    let now = Instant::now();
    let before = entries.len();
    entries.retain(|_, expires_at| *expires_at > now);
    before.saturating_sub(entries.len())
}

/// Periodically sweep expired entries out of `store`'s local tier.
pub fn spawn_eviction(store: Arc<dyn RevocationStore>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = time::interval(every);
        loop {
            interval.tick().await;
            let removed = store.evict_expired();
            if removed > 0 {
                tracing::debug!(removed, "evicted expired denylist entries");
            }
        }
    })
}

fn key(token: &str) -> String {
    format!("denylist:{}", token)
}

/// Redis-backed denylist with a local tier for positive hits.
///
/// A revoked token never becomes valid again before it expires, so caching
/// a hit locally until that expiry is always safe. Misses always go to Redis
/// so a revocation done by another replica is seen immediately.
#[derive(Clone)]
pub struct RedisDenylist {
    local: Arc<DashMap<String, Instant>>,
    redis: ConnectionManager,
}

impl RedisDenylist {
    pub fn new(redis: ConnectionManager) -> Self {
        Self {
            local: Arc::new(DashMap::new()),
            redis,
        }
    }

    pub async fn connect(url: &str) -> anyhow::Result<Self> {
        let client = redis::Client::open(url)?;
        let manager = ConnectionManager::new(client).await?;
        Ok(Self::new(manager))
    }

    pub async fn ping(&self) -> anyhow::Result<()> {
        let mut conn = self.redis.clone();
        redis::cmd("PING").query_async::<_, String>(&mut conn).await?;
        Ok(())
    }
}

#[async_trait]
impl RevocationStore for RedisDenylist {
    async fn is_revoked(&self, token: &str) -> anyhow::Result<bool> {
        let key = key(token);
        if let Some(expires_at) = self.local.get(&key) {
            if Instant::now() < *expires_at {
                return Ok(true);
            }
        }
        self.local.remove(&key);

        let mut conn = self.redis.clone();
        let exists: bool = conn.exists(&key).await?;
        if exists {
            let ttl_secs: i64 = match conn.ttl(&key).await {
                Ok(ttl) => ttl,
                Err(e) => {
                    tracing::warn!(error = %e, "denylist TTL lookup failed, caching hit for 1s");
                    1
                }
            };
            let ttl = Duration::from_secs(ttl_secs.max(1) as u64);
            self.local.insert(key, Instant::now() + ttl);
        }
        Ok(exists)
    }

    async fn revoke(&self, token: &str, ttl_secs: u64) -> anyhow::Result<()> {
        let key = key(token);
        let ttl_secs = ttl_secs.max(1);
        let mut conn = self.redis.clone();
        conn.set_ex::<_, _, ()>(&key, "true", ttl_secs).await?;
        self.local
            .insert(key, Instant::now() + Duration::from_secs(ttl_secs));
        Ok(())
    }

    fn evict_expired(&self) -> usize {
        retain_live(&self.local)
    }
}

/// Process-local denylist.
#[derive(Clone, Default)]
pub struct MemoryDenylist {
    entries: Arc<DashMap<String, Instant>>,
}

impl MemoryDenylist {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl RevocationStore for MemoryDenylist {
    async fn is_revoked(&self, token: &str) -> anyhow::Result<bool> {
        let key = key(token);
        let live = match self.entries.get(&key) {
            Some(expires_at) => Instant::now() < *expires_at,
            None => return Ok(false),
        };
        if !live {
            self.entries.remove(&key);
        }
        Ok(live)
    }

    async fn revoke(&self, token: &str, ttl_secs: u64) -> anyhow::Result<()> {
        self.entries.insert(
            key(token),
            Instant::now() + Duration::from_secs(ttl_secs.max(1)),
        );
        Ok(())
    }

    fn evict_expired(&self) -> usize {
        retain_live(&self.entries)
    }
}
