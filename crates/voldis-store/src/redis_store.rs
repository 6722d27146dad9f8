use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client, IntoConnectionInfo};
use tracing::{debug, instrument};

use voldis_config::StoreConfig;
use voldis_core::{Store, StoreError};

/// Redis-backed store client.
///
/// Holds one multiplexed connection shared by every task; each operation is a
/// fresh round trip. The store is the single source of truth and must reflect
/// concurrent writers from other connections, so nothing is cached here.
pub struct RedisStore {
    conn: MultiplexedConnection,
    addr: String,
}

impl RedisStore {
    /// Connect to the store described by `config`, selecting the configured
    /// database index and authenticating if a password is set.
    pub async fn connect(config: &StoreConfig) -> Result<Self, StoreError> {
        let mut info = config
            .url
            .as_str()
            .into_connection_info()
            .map_err(|e| StoreError::Protocol(format!("invalid store URL '{}': {}", config.url, e)))?;
        info.redis.db = config.db;
        if let Some(password) = &config.password {
            info.redis.password = Some(password.clone());
        }

        let client = Client::open(info)
            .map_err(|e| StoreError::Protocol(format!("invalid store URL '{}': {}", config.url, e)))?;
        let conn = client
            .get_multiplexed_tokio_connection()
            .await
            .map_err(|e| StoreError::ConnectionFailed {
                addr: config.url.clone(),
                source: Box::new(e),
            })?;

        debug!("Connected to store at {} (db {})", config.url, config.db);
        Ok(RedisStore {
            conn,
            addr: config.url.clone(),
        })
    }

    fn round_trip_err(&self, e: redis::RedisError) -> StoreError {
        StoreError::Unavailable(format!("{}: {}", self.addr, e))
    }
}

#[async_trait]
impl Store for RedisStore {
    #[instrument(skip(self), fields(store = "redis", key = %key))]
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let mut conn = self.conn.clone();
        let value: Option<Vec<u8>> = conn.get(key).await.map_err(|e| self.round_trip_err(e))?;
        Ok(value)
    }

    #[instrument(skip(self, value), fields(store = "redis", key = %key, size = value.len()))]
    async fn set(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let _: () = conn.set(key, value).await.map_err(|e| self.round_trip_err(e))?;
        Ok(())
    }

    #[instrument(skip(self), fields(store = "redis", key = %key))]
    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let _: () = conn.del(key).await.map_err(|e| self.round_trip_err(e))?;
        Ok(())
    }

    #[instrument(skip(self), fields(store = "redis"))]
    async fn keys(&self) -> Result<Vec<String>, StoreError> {
        let mut conn = self.conn.clone();
        let keys: Vec<String> = conn.keys("*").await.map_err(|e| self.round_trip_err(e))?;
        Ok(keys)
    }

    #[instrument(skip(self), fields(store = "redis"))]
    async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| self.round_trip_err(e))?;
        Ok(())
    }
}
