//! Redis-backed word store: one Redis set per category.

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, ConnectionAddr, ConnectionInfo, RedisConnectionInfo};
use tokio::sync::OnceCell;
use tracing::debug;

use crate::config::StoreConfig;
use crate::core::word_bank::{StoreError, WordStore};

/// Word sets stored as Redis sets, read with `SMEMBERS` / `SRANDMEMBER`.
///
/// One multiplexed connection is opened on first use and shared by every
/// later command.
pub struct RedisWordStore {
    client: redis::Client,
    config: StoreConfig,
    conn: OnceCell<MultiplexedConnection>,
}

impl RedisWordStore {
    /// Create a store from connection settings. No connection is opened
    /// until the first command.
    pub fn new(config: StoreConfig) -> Result<Self, StoreError> {
        let client = redis::Client::open(connection_info(&config)).map_err(unavailable)?;
        Ok(Self {
            client,
            config,
            conn: OnceCell::new(),
        })
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Add words to a set (`SADD`). Returns how many were new.
    pub async fn add_words(&self, key: &str, words: &[String]) -> Result<usize, StoreError> {
        if words.is_empty() {
            return Ok(0);
        }
        let mut conn = self.connection().await?;
        let added: usize = conn
            .sadd(self.config.key(key), words)
            .await
            .map_err(unavailable)?;
        debug!(key, added, "added words");
        Ok(added)
    }

    /// Remove a whole set (`DEL`).
    pub async fn clear(&self, key: &str) -> Result<bool, StoreError> {
        let mut conn = self.connection().await?;
        let deleted: u64 = conn.del(self.config.key(key)).await.map_err(unavailable)?;
        Ok(deleted > 0)
    }

    async fn connection(&self) -> Result<MultiplexedConnection, StoreError> {
        let conn = self
            .conn
            .get_or_try_init(|| async {
                debug!(host = %self.config.host, port = self.config.port, "connecting to redis");
                self.client
                    .get_multiplexed_async_connection()
                    .await
                    .map_err(unavailable)
            })
            .await?;
        Ok(conn.clone())
    }
}

fn connection_info(config: &StoreConfig) -> ConnectionInfo {
    ConnectionInfo {
        addr: ConnectionAddr::Tcp(config.host.clone(), config.port),
        redis: RedisConnectionInfo {
            db: config.db,
            password: config.password().map(str::to_string),
            ..RedisConnectionInfo::default()
        },
    }
}

fn unavailable(err: redis::RedisError) -> StoreError {
    StoreError::Unavailable(err.to_string())
}

#[async_trait]
impl WordStore for RedisWordStore {
    async fn all_members(&self, key: &str) -> Result<Vec<String>, StoreError> {
        let mut conn = self.connection().await?;
        conn.smembers(self.config.key(key))
            .await
            .map_err(unavailable)
    }

    async fn random_member(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.connection().await?;
        conn.srandmember(self.config.key(key))
            .await
            .map_err(unavailable)
    }
}
