use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands};
use std::time::Duration;
use tracing::{info, warn};

use crate::error::{MailError, Result};
use crate::store::CounterStore;

/// Redis client configuration
#[derive(Debug, Clone)]
pub struct RedisConfig {
    pub url: String,
    pub connection_timeout: Duration,
    pub command_timeout: Duration,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379".to_string(),
            connection_timeout: Duration::from_secs(5),
            command_timeout: Duration::from_secs(1),
        }
    }
}

/// Redis-backed counter store.
///
/// Batches go through a MULTI/EXEC pipeline so each `increment_batch` call is
/// serialized against concurrent callers at the level of the whole batch.
#[derive(Clone)]
pub struct RedisCounterStore {
    connection: ConnectionManager,
}

impl RedisCounterStore {
    /// Connect to Redis and verify the connection with a PING
    pub async fn new(config: RedisConfig) -> Result<Self> {
        info!("Creating Redis counter store for URL: {}", config.url);

        let client = redis::Client::open(config.url.clone()).map_err(|e| {
            warn!("Failed to create Redis client: {}", e);
            MailError::Store(e)
        })?;

        let connection = match tokio::time::timeout(
            config.connection_timeout,
            client.get_connection_manager(),
        )
        .await
        {
            Ok(Ok(conn)) => conn,
            Ok(Err(e)) => {
                warn!("Failed to create connection manager: {}", e);
                return Err(MailError::Store(e));
            }
            Err(_) => {
                warn!(
                    "Timeout while creating connection manager ({}s)",
                    config.connection_timeout.as_secs()
                );
                return Err(MailError::Config(
                    "Timeout while creating Redis connection manager".to_string(),
                ));
            }
        };

        let mut conn = connection.clone();
        match tokio::time::timeout(
            config.command_timeout,
            redis::cmd("PING").query_async::<_, ()>(&mut conn),
        )
        .await
        {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                warn!("Redis PING failed: {}", e);
                return Err(MailError::Store(e));
            }
            Err(_) => {
                warn!("Redis PING timeout ({}s)", config.command_timeout.as_secs());
                return Err(MailError::Config(
                    "Timeout while testing Redis connection".to_string(),
                ));
            }
        }

        info!("Redis counter store initialized");
        Ok(Self { connection })
    }
}

#[async_trait]
impl CounterStore for RedisCounterStore {
    async fn increment_batch(&self, entries: &[(String, u64)]) -> Result<Vec<u64>> {
        if entries.is_empty() {
            return Ok(vec![]);
        }

        let mut conn = self.connection.clone();
        let mut pipe = redis::pipe();
        pipe.atomic();

        for (key, ttl_secs) in entries {
            pipe.incr(key, 1u64).expire(key, *ttl_secs as i64);
        }

        let results: Vec<redis::Value> = pipe
            .query_async(&mut conn)
            .await
            .map_err(MailError::Store)?;

        // Every INCR result is followed by its EXPIRE result
        let mut counts = Vec::with_capacity(entries.len());
        for i in (0..results.len()).step_by(2) {
            if let redis::Value::Int(count) = &results[i] {
                counts.push(*count as u64);
            } else {
                return Err(MailError::Store(redis::RedisError::from((
                    redis::ErrorKind::TypeError,
                    "Expected integer response from pipeline INCR",
                ))));
            }
        }

        Ok(counts)
    }

    async fn get_counter(&self, key: &str) -> Result<Option<u64>> {
        let mut conn = self.connection.clone();
        let count: Option<u64> = conn.get(key).await.map_err(MailError::Store)?;
        Ok(count)
    }

    async fn put_value(&self, key: &str, value: &str, ttl_secs: u64) -> Result<()> {
        let mut conn = self.connection.clone();
        redis::cmd("SETEX")
            .arg(key)
            .arg(ttl_secs)
            .arg(value)
            .query_async::<_, ()>(&mut conn)
            .await
            .map_err(MailError::Store)?;
        Ok(())
    }

    async fn get_value(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.connection.clone();
        let value: Option<String> = conn.get(key).await.map_err(MailError::Store)?;
        Ok(value)
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.connection.clone();
        let _: () = conn.del(key).await.map_err(MailError::Store)?;
        Ok(())
    }

    async fn health_check(&self) -> Result<()> {
        let mut conn = self.connection.clone();
        redis::cmd("PING")
            .query_async::<_, ()>(&mut conn)
            .await
            .map_err(MailError::Store)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redis_config_defaults() {
        let config = RedisConfig::default();
        assert_eq!(config.url, "redis://localhost:6379");
        assert_eq!(config.connection_timeout, Duration::from_secs(5));
        assert_eq!(config.command_timeout, Duration::from_secs(1));
    }
}
