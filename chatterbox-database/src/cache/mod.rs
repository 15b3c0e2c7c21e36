mod redis_store;

use std::future::Future;
use std::time::Duration;

use anyhow::Context as _;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use redis_store::RedisCacheStore;

/// How long a cached transcript stays valid when no write invalidates it.
pub const HISTORY_CACHE_TTL: Duration = Duration::from_secs(300);

#[derive(Clone, Debug)]
enum CacheBackend {
    /// Every read misses and every write is dropped.
    Disabled,
    Redis(RedisCacheStore),
}

#[derive(Clone, Debug)]
pub struct CacheService {
    key_prefix: String,
    backend: CacheBackend,
}

impl CacheService {
    pub fn disabled(prefix: impl Into<String>) -> Self {
        Self {
            key_prefix: prefix.into(),
            backend: CacheBackend::Disabled,
        }
    }

    pub fn redis(redis_url: &str, prefix: impl Into<String>) -> anyhow::Result<Self> {
        Ok(Self {
            key_prefix: prefix.into(),
            backend: CacheBackend::Redis(RedisCacheStore::from_url(redis_url)?),
        })
    }

    pub fn is_redis_enabled(&self) -> bool {
        matches!(self.backend, CacheBackend::Redis(_))
    }

    pub async fn ping(&self) -> anyhow::Result<()> {
        match &self.backend {
            CacheBackend::Disabled => Ok(()),
            CacheBackend::Redis(store) => store.ping().await,
        }
    }

    pub fn key(&self, suffix: impl AsRef<str>) -> String {
        format!("{}:{}", self.key_prefix, suffix.as_ref())
    }

    async fn fetch_bytes(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>> {
        match &self.backend {
            CacheBackend::Disabled => Ok(None),
            CacheBackend::Redis(store) => store.get(key).await,
        }
    }

    async fn store_bytes(&self, key: &str, payload: Vec<u8>, ttl: Duration) -> anyhow::Result<()> {
        match &self.backend {
            CacheBackend::Disabled => Ok(()),
            CacheBackend::Redis(store) => store.set(key, payload, ttl.as_secs().max(1)).await,
        }
    }

    pub async fn get_json<T>(&self, key: &str) -> anyhow::Result<Option<T>>
    where
        T: DeserializeOwned,
    {
        self.fetch_bytes(key)
            .await?
            .map(|bytes| {
                serde_json::from_slice(&bytes)
                    .with_context(|| format!("cached value under `{key}` is not valid JSON"))
            })
            .transpose()
    }

    pub async fn set_json<T>(&self, key: &str, value: &T, ttl: Duration) -> anyhow::Result<()>
    where
        T: Serialize,
    {
        let payload = serde_json::to_vec(value)
            .with_context(|| format!("failed to encode cache value for `{key}`"))?;
        self.store_bytes(key, payload, ttl).await
    }

    /// Current value of a generation counter; 0 when unset or caching is off.
    pub async fn counter(&self, key: &str) -> anyhow::Result<u64> {
        match &self.backend {
            CacheBackend::Disabled => Ok(0),
            CacheBackend::Redis(store) => store.get_counter(key).await,
        }
    }

    pub async fn bump_counter(&self, key: &str) -> anyhow::Result<u64> {
        match &self.backend {
            CacheBackend::Disabled => Ok(0),
            CacheBackend::Redis(store) => store.incr(key).await,
        }
    }

    /// Read-through lookup. Cache errors never fail the call; the loader's
    /// result is returned and the next reader tries the cache again.
    pub async fn get_or_load_json<T, F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        loader: F,
    ) -> anyhow::Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        match self.get_json::<T>(key).await {
            Ok(Some(hit)) => {
                debug!(cache_key = key, "cache hit");
                return Ok(hit);
            }
            Ok(None) => debug!(cache_key = key, "cache miss"),
            Err(e) => warn!(?e, cache_key = key, "cache read failed; loading from postgres"),
        }

        let fresh = loader().await?;
        if let Err(e) = self.set_json(key, &fresh, ttl).await {
            warn!(?e, cache_key = key, "cache write failed; serving uncached value");
        }
        Ok(fresh)
    }
}

fn chat_history_generation_key(cache: &CacheService) -> String {
    cache.key("chat:history:generation")
}

/// Snapshot key for one write generation of `chat_messages`. A snapshot
/// loaded before a write lands under the old generation and is never read
/// again, so a slow reader cannot republish a stale transcript.
pub fn chat_history_key(cache: &CacheService, generation: u64) -> String {
    cache.key(format!("chat:history:g{generation}"))
}

/// Snapshot key for the current generation, or `None` when the counter is
/// unreadable and the cache must be bypassed.
pub async fn current_chat_history_key(cache: &CacheService) -> Option<String> {
    let generation_key = chat_history_generation_key(cache);
    match cache.counter(&generation_key).await {
        Ok(generation) => Some(chat_history_key(cache, generation)),
        Err(e) => {
            warn!(?e, cache_key = %generation_key, "history generation unreadable; bypassing cache");
            None
        }
    }
}

/// Start a new generation after any write to `chat_messages`. Failures are
/// logged; the TTL bounds how stale a reader can get.
pub async fn invalidate_chat_history(cache: &CacheService) {
    let generation_key = chat_history_generation_key(cache);
    match cache.bump_counter(&generation_key).await {
        Ok(generation) => debug!(generation, "history cache generation advanced"),
        Err(e) => warn!(?e, cache_key = %generation_key, "cache invalidation failed"),
    }
}
