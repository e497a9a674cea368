//! Redis document store.
//!
//! Each document is a hash: one JSON-encoded value per top-level field plus
//! `__id`, `__created_at` and `__updated_at`. A sorted set per user and
//! collection indexes document ids by creation order.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Script};
use serde_json::Value;
use uuid::Uuid;

use elemental_core::StoreError;
use elemental_core::domain::{Collection, DocPath, Document, Fields};
use elemental_core::ports::{BoundedIncrement, DocumentStore, Query};

use crate::cache::RedisConfig;

const META_ID: &str = "__id";
const META_CREATED_AT: &str = "__created_at";
const META_UPDATED_AT: &str = "__updated_at";

/// Write fields into a document hash in one step.
/// ARGV: mode (create|merge|replace|update), id, now, score, then field/value pairs.
/// Returns the resulting hash, or an empty array when `update` finds nothing.
const WRITE_SCRIPT: &str = r#"
local mode = ARGV[1]
local exists = redis.call('EXISTS', KEYS[1]) == 1
if mode == 'update' and not exists then
    return {}
end

local created = ARGV[3]
if exists then
    created = redis.call('HGET', KEYS[1], '__created_at') or ARGV[3]
    if mode == 'replace' then
        redis.call('DEL', KEYS[1])
    end
else
    redis.call('ZADD', KEYS[2], ARGV[4], ARGV[2])
end

redis.call('HSET', KEYS[1], '__id', ARGV[2], '__created_at', created, '__updated_at', ARGV[3])
for i = 5, #ARGV, 2 do
    redis.call('HSET', KEYS[1], ARGV[i], ARGV[i + 1])
end
return redis.call('HGETALL', KEYS[1])
"#;

/// ARGV: field, by, id, now, score. Returns the new value.
const INCREMENT_SCRIPT: &str = r#"
if redis.call('EXISTS', KEYS[1]) == 0 then
    redis.call('ZADD', KEYS[2], ARGV[5], ARGV[3])
    redis.call('HSET', KEYS[1], '__id', ARGV[3], '__created_at', ARGV[4])
end
local value = redis.call('HINCRBY', KEYS[1], ARGV[1], ARGV[2])
redis.call('HSET', KEYS[1], '__updated_at', ARGV[4])
return value
"#;

/// ARGV: field, ceiling, id, now, score. Returns {applied, value}.
const INCREMENT_BELOW_SCRIPT: &str = r#"
local current = tonumber(redis.call('HGET', KEYS[1], ARGV[1]) or '0') or 0
if current >= tonumber(ARGV[2]) then
    return {0, current}
end
if redis.call('EXISTS', KEYS[1]) == 0 then
    redis.call('ZADD', KEYS[2], ARGV[5], ARGV[3])
    redis.call('HSET', KEYS[1], '__id', ARGV[3], '__created_at', ARGV[4])
end
local value = redis.call('HINCRBY', KEYS[1], ARGV[1], 1)
redis.call('HSET', KEYS[1], '__updated_at', ARGV[4])
return {1, value}
"#;

/// Redis-backed document store shared by every server process.
pub struct RedisDocumentStore {
    conn: ConnectionManager,
    key_prefix: String,
    write: Script,
    increment: Script,
    increment_below: Script,
}

impl RedisDocumentStore {
    pub async fn new(config: RedisConfig) -> Result<Self, StoreError> {
        let conn = config
            .connect()
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        tracing::info!(url = %config.url, "Connected to Redis document store");

        Ok(Self {
            conn,
            key_prefix: "doc".to_string(),
            write: Script::new(WRITE_SCRIPT),
            increment: Script::new(INCREMENT_SCRIPT),
            increment_below: Script::new(INCREMENT_BELOW_SCRIPT),
        })
    }

    /// Create from environment configuration.
    pub async fn from_env() -> Result<Self, StoreError> {
        Self::new(RedisConfig::from_env()).await
    }

    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    fn doc_key(&self, path: &DocPath) -> String {
        format!("{}:{}", self.key_prefix, path)
    }

    fn index_key(&self, user_id: &str, collection: Collection) -> String {
        format!("{}:idx:{}:{}", self.key_prefix, user_id, collection)
    }

    async fn write(
        &self,
        mode: &str,
        path: &DocPath,
        fields: Fields,
    ) -> Result<Option<Document>, StoreError> {
        let now = Utc::now();
        let mut invocation = self.write.prepare_invoke();
        invocation
            .key(self.doc_key(path))
            .key(self.index_key(&path.user_id, path.collection))
            .arg(mode)
            .arg(&path.doc_id)
            .arg(now.to_rfc3339())
            .arg(now.timestamp_micros());
        for (name, value) in &fields {
            invocation.arg(name).arg(serde_json::to_string(value)?);
        }

        let mut conn = self.conn.clone();
        let flat: Vec<String> = invocation
            .invoke_async(&mut conn)
            .await
            .map_err(query_error)?;

        Ok(decode_document(pairs(flat)))
    }
}

fn query_error(err: redis::RedisError) -> StoreError {
    if err.is_connection_dropped() || err.is_io_error() || err.is_timeout() {
        StoreError::Connection(err.to_string())
    } else {
        StoreError::Query(err.to_string())
    }
}

fn pairs(flat: Vec<String>) -> HashMap<String, String> {
    let mut map = HashMap::with_capacity(flat.len() / 2);
    let mut iter = flat.into_iter();
    while let (Some(k), Some(v)) = (iter.next(), iter.next()) {
        map.insert(k, v);
    }
    map
}

fn parse_timestamp(raw: Option<&String>) -> DateTime<Utc> {
    raw.and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(Utc::now)
}

/// Rebuild a document from its hash. `None` for an empty hash.
fn decode_document(mut hash: HashMap<String, String>) -> Option<Document> {
    let id = hash.remove(META_ID)?;
    let created_at = parse_timestamp(hash.get(META_CREATED_AT));
    let updated_at = hash
        .get(META_UPDATED_AT)
        .map(|raw| parse_timestamp(Some(raw)))
        .unwrap_or(created_at);

    let fields: Fields = hash
        .into_iter()
        .filter(|(k, _)| !k.starts_with("__"))
        .map(|(k, raw)| {
            let value = serde_json::from_str(&raw).unwrap_or(Value::String(raw));
            (k, value)
        })
        .collect();

    Some(Document {
        id,
        fields,
        created_at,
        updated_at,
    })
}

#[async_trait]
impl DocumentStore for RedisDocumentStore {
    async fn get(&self, path: &DocPath) -> Result<Option<Document>, StoreError> {
        let mut conn = self.conn.clone();
        let hash: HashMap<String, String> = conn
            .hgetall(self.doc_key(path))
            .await
            .map_err(query_error)?;
        Ok(decode_document(hash))
    }

    async fn create(
        &self,
        user_id: &str,
        collection: Collection,
        fields: Fields,
    ) -> Result<Document, StoreError> {
        let path = DocPath::new(user_id, collection, Uuid::new_v4().to_string());
        self.write("create", &path, fields)
            .await?
            .ok_or_else(|| StoreError::Query("Created document vanished".to_string()))
    }

    async fn set(
        &self,
        path: &DocPath,
        fields: Fields,
        merge: bool,
    ) -> Result<Document, StoreError> {
        let mode = if merge { "merge" } else { "replace" };
        self.write(mode, path, fields)
            .await?
            .ok_or_else(|| StoreError::Query("Written document vanished".to_string()))
    }

    async fn update(&self, path: &DocPath, fields: Fields) -> Result<Document, StoreError> {
        self.write("update", path, fields)
            .await?
            .ok_or(StoreError::NotFound)
    }

    async fn delete(&self, path: &DocPath) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let _: () = redis::pipe()
            .atomic()
            .del(self.doc_key(path))
            .ignore()
            .zrem(self.index_key(&path.user_id, path.collection), &path.doc_id)
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(query_error)?;
        Ok(())
    }

    async fn atomic_increment(
        &self,
        path: &DocPath,
        field: &str,
        by: i64,
    ) -> Result<i64, StoreError> {
        let now = Utc::now();
        let mut conn = self.conn.clone();
        self.increment
            .key(self.doc_key(path))
            .key(self.index_key(&path.user_id, path.collection))
            .arg(field)
            .arg(by)
            .arg(&path.doc_id)
            .arg(now.to_rfc3339())
            .arg(now.timestamp_micros())
            .invoke_async(&mut conn)
            .await
            .map_err(query_error)
    }

    async fn increment_below(
        &self,
        path: &DocPath,
        field: &str,
        ceiling: i64,
    ) -> Result<BoundedIncrement, StoreError> {
        let now = Utc::now();
        let mut conn = self.conn.clone();
        let reply: Vec<i64> = self
            .increment_below
            .key(self.doc_key(path))
            .key(self.index_key(&path.user_id, path.collection))
            .arg(field)
            .arg(ceiling)
            .arg(&path.doc_id)
            .arg(now.to_rfc3339())
            .arg(now.timestamp_micros())
            .invoke_async(&mut conn)
            .await
            .map_err(query_error)?;

        match reply.as_slice() {
            [1, value] => Ok(BoundedIncrement::Applied(*value)),
            [0, value] => Ok(BoundedIncrement::AtCeiling(*value)),
            other => Err(StoreError::Query(format!(
                "unexpected bounded increment reply {other:?}"
            ))),
        }
    }

    async fn query(
        &self,
        user_id: &str,
        collection: Collection,
        query: &Query,
    ) -> Result<Vec<Document>, StoreError> {
        let mut conn = self.conn.clone();
        let ids: Vec<String> = conn
            .zrange(self.index_key(user_id, collection), 0, -1)
            .await
            .map_err(query_error)?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut pipe = redis::pipe();
        for id in &ids {
            pipe.hgetall(self.doc_key(&DocPath::new(user_id, collection, id.as_str())));
        }
        let hashes: Vec<HashMap<String, String>> =
            pipe.query_async(&mut conn).await.map_err(query_error)?;

        let docs = hashes
            .into_iter()
            .filter_map(decode_document)
            .filter(|d| query.matches(d))
            .collect();
        Ok(query.finish(docs))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use super::*;

    #[test]
    fn test_decode_document_restores_types() {
        let hash = pairs(vec![
            "__id".into(),
            "p1".into(),
            "__created_at".into(),
            "2026-01-02T03:04:05+00:00".into(),
            "count".into(),
            "7".into(),
            "name".into(),
            "\"Soap\"".into(),
            "legacy".into(),
            "not json".into(),
        ]);

        let doc = decode_document(hash).unwrap();
        assert_eq!(doc.id, "p1");
        assert_eq!(doc.get_u64("count"), Some(7));
        assert_eq!(doc.get_str("name"), Some("Soap"));
        assert_eq!(doc.get_str("legacy"), Some("not json"));
        assert_eq!(doc.updated_at, doc.created_at);
    }

    #[test]
    fn test_decode_empty_hash_is_none() {
        assert!(decode_document(HashMap::new()).is_none());
    }

    async fn get_test_store() -> Option<RedisDocumentStore> {
        let config = RedisConfig {
            url: std::env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6389".to_string()),
            connect_timeout: Duration::from_secs(1),
            fallback_to_memory: false,
        };
        RedisDocumentStore::new(config)
            .await
            .ok()
            .map(|s| s.with_key_prefix(format!("test_doc:{}", Uuid::new_v4())))
    }

    #[tokio::test]
    async fn test_redis_store_crud_and_increment() {
        let store = match get_test_store().await {
            Some(s) => s,
            None => {
                tracing::warn!("Redis not available, skipping test");
                return;
            }
        };

        let user = DocPath::user("u1");
        let Value::Object(fields) = json!({"email": "a@b.c"}) else {
            unreachable!()
        };
        store.set(&user, fields, true).await.unwrap();
        let Value::Object(plan) = json!({"plan": "pro"}) else {
            unreachable!()
        };
        let doc = store.set(&user, plan, true).await.unwrap();
        assert_eq!(doc.get_str("email"), Some("a@b.c"));
        assert_eq!(doc.get_str("plan"), Some("pro"));

        let usage = DocPath::new("u1", Collection::Usage, "ai_generations");
        assert_eq!(store.atomic_increment(&usage, "count", 1).await.unwrap(), 1);
        assert_eq!(store.atomic_increment(&usage, "count", 1).await.unwrap(), 2);
        let usage_doc = store.get(&usage).await.unwrap().unwrap();
        assert_eq!(usage_doc.get_u64("count"), Some(2));
        assert_eq!(
            store.increment_below(&usage, "count", 3).await.unwrap(),
            BoundedIncrement::Applied(3)
        );
        assert_eq!(
            store.increment_below(&usage, "count", 3).await.unwrap(),
            BoundedIncrement::AtCeiling(3)
        );

        let missing = DocPath::new("u1", Collection::Projects, "nope");
        assert!(matches!(
            store.update(&missing, Fields::new()).await,
            Err(StoreError::NotFound)
        ));

        let project = store
            .create("u1", Collection::Projects, Fields::new())
            .await
            .unwrap();
        let listed = store
            .query("u1", Collection::Projects, &Query::new())
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);

        store
            .delete(&DocPath::new("u1", Collection::Projects, project.id))
            .await
            .unwrap();
        let listed = store
            .query("u1", Collection::Projects, &Query::new())
            .await
            .unwrap();
        assert!(listed.is_empty());
    }
}
