//! Redis response cache with connection management.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, Script};

use elemental_core::domain::Document;
use elemental_core::ports::{CacheError, CacheGeneration, ResponseCache};

use super::ResponseCacheConfig;

/// Redis connection configuration.
#[derive(Debug, Clone)]
pub struct RedisConfig {
    /// Redis URL (e.g., redis://localhost:6379)
    pub url: String,
    /// Connection timeout
    pub connect_timeout: Duration,
    /// Whether to fallback to in-memory adapters if Redis is unavailable
    pub fallback_to_memory: bool,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379".to_string(),
            connect_timeout: Duration::from_secs(5),
            fallback_to_memory: true,
        }
    }
}

impl RedisConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            url: std::env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            connect_timeout: Duration::from_secs(
                std::env::var("REDIS_CONNECT_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(5),
            ),
            fallback_to_memory: std::env::var("REDIS_FALLBACK_TO_MEMORY")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(true),
        }
    }

    /// Open a managed connection, bounded by `connect_timeout`.
    pub async fn connect(&self) -> Result<ConnectionManager, redis::RedisError> {
        let client = Client::open(self.url.as_str())?;
        tokio::time::timeout(self.connect_timeout, ConnectionManager::new(client))
            .await
            .map_err(|_| {
                redis::RedisError::from((redis::ErrorKind::IoError, "Connection timed out"))
            })?
    }
}

/// Store the snapshot only if the key's generation still matches.
/// KEYS: entry, generation. ARGV: seen generation, json, ttl ms.
const PUT_SCRIPT: &str = r#"
local current = redis.call('GET', KEYS[2]) or '0'
if current ~= ARGV[1] then
    return 0
end
redis.call('SET', KEYS[1], ARGV[2], 'PX', ARGV[3])
return 1
"#;

/// Redis-backed response cache. Entries expire server-side after the TTL.
///
/// Each key has a generation counter that `invalidate` increments. The
/// counters carry no expiry, so a reader stalled for any length of time
/// still cannot store a snapshot older than the last invalidation.
pub struct RedisResponseCache {
    conn: ConnectionManager,
    ttl: Duration,
    key_prefix: String,
    put: Script,
}

impl RedisResponseCache {
    pub async fn new(redis: RedisConfig, config: ResponseCacheConfig) -> Result<Self, CacheError> {
        let conn = redis
            .connect()
            .await
            .map_err(|e| CacheError::Connection(e.to_string()))?;

        tracing::info!(url = %redis.url, ttl_secs = config.ttl.as_secs(), "Connected to Redis cache");

        Ok(Self {
            conn,
            ttl: config.ttl,
            key_prefix: "cache".to_string(),
            put: Script::new(PUT_SCRIPT),
        })
    }

    /// Create from environment configuration.
    pub async fn from_env() -> Result<Self, CacheError> {
        Self::new(RedisConfig::from_env(), ResponseCacheConfig::from_env()).await
    }

    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    /// The owner is length-prefixed so ids containing `:` cannot collide.
    fn make_key(&self, owner: &str, resource_id: &str) -> String {
        format!("{}:{}:{}:{}", self.key_prefix, owner.len(), owner, resource_id)
    }

    fn generation_key(&self, owner: &str, resource_id: &str) -> String {
        format!("{}:gen:{}:{}:{}", self.key_prefix, owner.len(), owner, resource_id)
    }
}

#[async_trait]
impl ResponseCache for RedisResponseCache {
    async fn get(&self, owner: &str, resource_id: &str) -> Option<Document> {
        let key = self.make_key(owner, resource_id);
        let mut conn = self.conn.clone();

        let raw = match conn.get::<_, Option<String>>(&key).await {
            Ok(value) => value?,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Redis GET failed");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(doc) => Some(doc),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Dropping undecodable cache entry");
                None
            }
        }
    }

    async fn generation(&self, owner: &str, resource_id: &str) -> CacheGeneration {
        let key = self.generation_key(owner, resource_id);
        let mut conn = self.conn.clone();

        match conn.get::<_, Option<u64>>(&key).await {
            Ok(value) => CacheGeneration::new(value.unwrap_or(0)),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Redis generation read failed");
                CacheGeneration::UNKNOWN
            }
        }
    }

    async fn put(
        &self,
        owner: &str,
        resource_id: &str,
        document: &Document,
        seen: CacheGeneration,
    ) -> Result<bool, CacheError> {
        let Some(seen) = seen.value() else {
            return Ok(false);
        };
        let value =
            serde_json::to_string(document).map_err(|e| CacheError::Serialization(e.to_string()))?;
        let mut conn = self.conn.clone();

        let stored: i64 = self
            .put
            .key(self.make_key(owner, resource_id))
            .key(self.generation_key(owner, resource_id))
            .arg(seen)
            .arg(value)
            .arg(self.ttl.as_millis() as u64)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| CacheError::Operation(e.to_string()))?;
        Ok(stored == 1)
    }

    async fn invalidate(&self, owner: &str, resource_id: &str) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let _: () = redis::pipe()
            .atomic()
            .del(self.make_key(owner, resource_id))
            .ignore()
            .incr(self.generation_key(owner, resource_id), 1)
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(|e| CacheError::Operation(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    async fn get_test_cache(ttl: Duration) -> Option<RedisResponseCache> {
        let redis = RedisConfig {
            url: std::env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6389".to_string()),
            connect_timeout: Duration::from_secs(1),
            fallback_to_memory: false,
        };
        let config = ResponseCacheConfig {
            ttl,
            ..Default::default()
        };

        RedisResponseCache::new(redis, config)
            .await
            .ok()
            .map(|c| c.with_key_prefix(format!("test_cache:{}", uuid::Uuid::new_v4())))
    }

    async fn fill(cache: &impl ResponseCache, owner: &str, resource_id: &str, doc: &Document) {
        let seen = cache.generation(owner, resource_id).await;
        assert!(cache.put(owner, resource_id, doc, seen).await.unwrap());
    }

    fn document() -> Document {
        Document {
            id: "p1".to_string(),
            fields: serde_json::Map::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_redis_cache_put_get_invalidate() {
        let cache = match get_test_cache(Duration::from_secs(60)).await {
            Some(c) => c,
            None => {
                tracing::warn!("Redis not available, skipping test");
                return;
            }
        };

        let doc = document();
        fill(&cache, "u1", "p1", &doc).await;
        assert_eq!(cache.get("u1", "p1").await, Some(doc));

        cache.invalidate("u1", "p1").await.unwrap();
        assert_eq!(cache.get("u1", "p1").await, None);
    }

    #[tokio::test]
    async fn test_redis_cache_refuses_snapshot_older_than_invalidation() {
        let cache = match get_test_cache(Duration::from_secs(60)).await {
            Some(c) => c,
            None => return,
        };

        let seen = cache.generation("u1", "p1").await;
        cache.invalidate("u1", "p1").await.unwrap();
        assert!(!cache.put("u1", "p1", &document(), seen).await.unwrap());
        assert_eq!(cache.get("u1", "p1").await, None);

        fill(&cache, "u1", "p1", &document()).await;
        assert!(cache.get("u1", "p1").await.is_some());
    }

    #[tokio::test]
    async fn test_key_parts_containing_separator_do_not_collide() {
        let cache = match get_test_cache(Duration::from_secs(60)).await {
            Some(c) => c,
            None => return,
        };

        assert_ne!(cache.make_key("a:b", "c"), cache.make_key("a", "b:c"));
        fill(&cache, "a:b", "c", &document()).await;
        assert!(cache.get("a", "b:c").await.is_none());
    }

    #[tokio::test]
    async fn test_redis_cache_ttl() {
        let cache = match get_test_cache(Duration::from_secs(1)).await {
            Some(c) => c,
            None => return,
        };

        fill(&cache, "u1", "p1", &document()).await;
        assert!(cache.get("u1", "p1").await.is_some());

        // Wait for expiration
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(cache.get("u1", "p1").await.is_none());
    }
}
