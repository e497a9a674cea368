//! In-memory response cache - used as fallback when Redis is unavailable.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;

use elemental_core::clock::{Clock, SystemClock};
use elemental_core::domain::Document;
use elemental_core::ports::{CacheError, CacheGeneration, CacheKey, ResponseCache};

#[derive(Debug, Clone)]
pub struct ResponseCacheConfig {
    /// An entry is served while `now - stored_at < ttl`.
    pub ttl: Duration,
    /// Upper bound on held entries.
    pub max_entries: usize,
}

impl Default for ResponseCacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(300),
            max_entries: 10_000,
        }
    }
}

impl ResponseCacheConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            ttl: std::env::var("CACHE_TTL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.ttl),
            max_entries: std::env::var("CACHE_MAX_ENTRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n: &usize| *n > 0)
                .unwrap_or(defaults.max_entries),
        }
    }
}

struct CacheEntry {
    document: Document,
    stored_at: Instant,
}

#[derive(Default)]
struct Inner {
    entries: HashMap<CacheKey, CacheEntry>,
    /// Bumped on every invalidation; generations are readings of it.
    epoch: u64,
    /// Epoch of the latest invalidation per key.
    invalidated: HashMap<CacheKey, u64>,
    /// Snapshots taken before this epoch are refused for every key. Raised
    /// when `invalidated` is cleared to keep it bounded.
    floor: u64,
}

impl Inner {
    fn is_stale(&self, key: &CacheKey, seen: u64) -> bool {
        seen < self.floor || self.invalidated.get(key).is_some_and(|&at| at > seen)
    }
}

/// Bounded TTL cache over a mutex-guarded map.
///
/// Expired entries are dropped when read. When the map is full, expired
/// entries are purged first, then the oldest entry is evicted.
/// Note: Data is lost on process restart.
pub struct InMemoryResponseCache<C: Clock = SystemClock> {
    inner: Mutex<Inner>,
    config: ResponseCacheConfig,
    clock: C,
}

impl InMemoryResponseCache<SystemClock> {
    pub fn new(config: ResponseCacheConfig) -> Self {
        Self::with_clock(config, SystemClock)
    }
}

impl Default for InMemoryResponseCache<SystemClock> {
    fn default() -> Self {
        Self::new(ResponseCacheConfig::default())
    }
}

impl<C: Clock> InMemoryResponseCache<C> {
    pub fn with_clock(config: ResponseCacheConfig, clock: C) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            config,
            clock,
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_fresh(&self, entry: &CacheEntry, now: Instant) -> bool {
        now.duration_since(entry.stored_at) < self.config.ttl
    }

    fn make_room(&self, entries: &mut HashMap<CacheKey, CacheEntry>, now: Instant) {
        entries.retain(|_, e| self.is_fresh(e, now));
        while entries.len() >= self.config.max_entries {
            let oldest = entries
                .iter()
                .min_by_key(|(_, e)| e.stored_at)
                .map(|(k, _)| k.clone());
            match oldest {
                Some(key) => {
                    entries.remove(&key);
                }
                None => break,
            }
        }
    }
}

#[async_trait]
impl<C: Clock> ResponseCache for InMemoryResponseCache<C> {
    async fn get(&self, owner: &str, resource_id: &str) -> Option<Document> {
        let key = CacheKey::new(owner, resource_id);
        let now = self.clock.now();

        let mut inner = self.inner.lock();
        let entry = inner.entries.get(&key)?;
        if self.is_fresh(entry, now) {
            return Some(entry.document.clone());
        }

        inner.entries.remove(&key);
        None
    }

    async fn generation(&self, _owner: &str, _resource_id: &str) -> CacheGeneration {
        CacheGeneration::new(self.inner.lock().epoch)
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
        let key = CacheKey::new(owner, resource_id);
        let now = self.clock.now();

        let mut inner = self.inner.lock();
        if inner.is_stale(&key, seen) {
            return Ok(false);
        }
        if !inner.entries.contains_key(&key) && inner.entries.len() >= self.config.max_entries {
            self.make_room(&mut inner.entries, now);
        }
        inner.entries.insert(
            key,
            CacheEntry {
                document: document.clone(),
                stored_at: now,
            },
        );

        Ok(true)
    }

    async fn invalidate(&self, owner: &str, resource_id: &str) -> Result<(), CacheError> {
        let key = CacheKey::new(owner, resource_id);

        let mut inner = self.inner.lock();
        inner.entries.remove(&key);
        inner.epoch += 1;
        let epoch = inner.epoch;
        if inner.invalidated.len() >= self.config.max_entries {
            inner.invalidated.clear();
            inner.floor = epoch;
        }
        inner.invalidated.insert(key, epoch);
        Ok(())
    }
}
