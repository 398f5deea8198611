//! Redis-backed [`KvStore`].
//!
//! All keys are written under a namespace prefix so several deployments can
//! share one Redis instance.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, RedisError, Script};
use warden_core::error::StoreError;
use warden_core::kv::KvStore;

/// `INCR` and set the expiry only when the counter was just created, atomically.
const INCR_WITH_TTL: &str = r"
local value = redis.call('INCR', KEYS[1])
if value == 1 then
    redis.call('PEXPIRE', KEYS[1], ARGV[1])
end
return value
";

/// Default namespace for every key.
const DEFAULT_NAMESPACE: &str = "warden";

/// Redis [`KvStore`] over a multiplexed connection.
#[derive(Clone)]
pub struct RedisKv {
    conn: MultiplexedConnection,
    namespace: String,
    incr_script: Script,
}

impl RedisKv {
    /// Connect to `url` (e.g. `redis://127.0.0.1:6379`).
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(url).map_err(backend)?;
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(backend)?;
        Ok(Self {
            conn,
            namespace: DEFAULT_NAMESPACE.to_string(),
            incr_script: Script::new(INCR_WITH_TTL),
        })
    }

    /// Replace the key namespace.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    fn key(&self, key: &str) -> String {
        format!("{}:{key}", self.namespace)
    }
}

fn backend(err: RedisError) -> StoreError {
    StoreError::Backend(format!("redis: {err}"))
}

/// Redis expiries are whole milliseconds and must be at least 1.
fn millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}

#[async_trait]
impl KvStore for RedisKv {
    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let _: () = conn
            .pset_ex(self.key(key), value, millis(ttl))
            .await
            .map_err(backend)?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.conn.clone();
        conn.get(self.key(key)).await.map_err(backend)
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let _: () = conn.del(self.key(key)).await.map_err(backend)?;
        Ok(())
    }

    async fn incr_with_ttl(&self, key: &str, ttl: Duration) -> Result<i64, StoreError> {
        let mut conn = self.conn.clone();
        let value: i64 = self
            .incr_script
            .key(self.key(key))
            .arg(millis(ttl))
            .invoke_async(&mut conn)
            .await
            .map_err(backend)?;
        Ok(value)
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>, StoreError> {
        let mut conn = self.conn.clone();
        let pttl: i64 = conn.pttl(self.key(key)).await.map_err(backend)?;
        Ok(match pttl {
            // -2: no such key.
            -2 => None,
            // -1: key without expiry. Nothing here writes one, but report it as present.
            -1 => Some(Duration::MAX),
            ms => Some(Duration::from_millis(ms.max(0) as u64)),
        })
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(backend)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn millis_rounds_sub_millisecond_ttls_up() {
        assert_eq!(millis(Duration::ZERO), 1);
        assert_eq!(millis(Duration::from_micros(10)), 1);
        assert_eq!(millis(Duration::from_secs(2)), 2000);
    }

    #[test]
    fn invalid_url_is_a_backend_error() {
        let err = redis::Client::open("not a url").map_err(backend).unwrap_err();
        assert!(matches!(err, StoreError::Backend(msg) if msg.starts_with("redis:")));
    }
}
