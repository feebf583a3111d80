//! Redis cache module
//!
//! Redis is optional for the marketplace. It backs token revocation on
//! logout; when `REDIS_URL` is unset the services run without it.

use anyhow::Result;
use redis::{AsyncCommands, Client};
use tracing::info;

/// Configuration for Redis connection
#[derive(Debug, Clone)]
pub struct RedisConfig {
    /// Redis connection URL (e.g., "redis://localhost:6379")
    pub url: String,
    /// Prefix applied to every key written through the pool
    pub key_prefix: String,
}

impl RedisConfig {
    /// Read the Redis configuration from the environment
    ///
    /// Returns `None` when `REDIS_URL` is unset or empty.
    ///
    /// # Environment Variables
    /// - `REDIS_URL`: Redis connection URL
    /// - `REDIS_KEY_PREFIX`: Key namespace (default: "marketplace")
    pub fn from_env() -> Option<Self> {
        let url = std::env::var("REDIS_URL").ok().filter(|u| !u.trim().is_empty())?;
        let key_prefix =
            std::env::var("REDIS_KEY_PREFIX").unwrap_or_else(|_| "marketplace".to_string());

        Some(RedisConfig { url, key_prefix })
    }
}

/// Redis connection pool
#[derive(Clone)]
pub struct RedisPool {
    client: Client,
    key_prefix: String,
}

impl RedisPool {
    /// Initialize a new Redis connection pool
    pub async fn new(config: &RedisConfig) -> Result<Self> {
        let client = Client::open(config.url.clone())?;
        info!("Redis client initialized with URL: {}", config.url);
        Ok(RedisPool {
            client,
            key_prefix: config.key_prefix.clone(),
        })
    }

    async fn get_connection(&self) -> Result<redis::aio::MultiplexedConnection> {
        let conn = self.client.get_multiplexed_async_connection().await?;
        Ok(conn)
    }

    fn namespaced(&self, key: &str) -> String {
        format!("{}:{}", self.key_prefix, key)
    }

    /// Set a key-value pair in Redis with optional TTL
    pub async fn set(&self, key: &str, value: &str, ttl_seconds: Option<u64>) -> Result<()> {
        let mut conn = self.get_connection().await?;
        let key = self.namespaced(key);

        match ttl_seconds {
            Some(ttl) => {
                let _: () = conn.set_ex(key, value, ttl.max(1)).await?;
            }
            None => {
                let _: () = conn.set(key, value).await?;
            }
        }

        Ok(())
    }

    /// Get a value from Redis by key
    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.get_connection().await?;
        let value: Option<String> = conn.get(self.namespaced(key)).await?;
        Ok(value)
    }

    /// Whether the key is present
    pub async fn exists(&self, key: &str) -> Result<bool> {
        let mut conn = self.get_connection().await?;
        let found: bool = conn.exists(self.namespaced(key)).await?;
        Ok(found)
    }

    /// Delete a key from Redis
    pub async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.get_connection().await?;
        let _: u64 = conn.del(self.namespaced(key)).await?;
        Ok(())
    }

    /// Check if Redis is reachable
    pub async fn health_check(&self) -> Result<bool> {
        let mut conn = self.get_connection().await?;
        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(pong == "PONG")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_redis_config_is_optional() {
        unsafe {
            std::env::remove_var("REDIS_URL");
        }
        assert!(RedisConfig::from_env().is_none());

        unsafe {
            std::env::set_var("REDIS_URL", "redis://localhost:6379");
            std::env::remove_var("REDIS_KEY_PREFIX");
        }
        let config = RedisConfig::from_env().expect("REDIS_URL is set");
        assert_eq!(config.url, "redis://localhost:6379");
        assert_eq!(config.key_prefix, "marketplace");

        unsafe {
            std::env::remove_var("REDIS_URL");
        }
    }

    #[tokio::test]
    #[ignore = "requires a running Redis"]
    async fn test_set_get_delete() -> Result<()> {
        let config = RedisConfig {
            url: "redis://localhost:6379".to_string(),
            key_prefix: "marketplace-test".to_string(),
        };

        let pool = RedisPool::new(&config).await?;
        assert!(pool.health_check().await?);

        pool.set("test_key", "test_value", Some(5)).await?;
        assert_eq!(pool.get("test_key").await?, Some("test_value".to_string()));
        assert!(pool.exists("test_key").await?);

        pool.delete("test_key").await?;
        assert_eq!(pool.get("test_key").await?, None);

        Ok(())
    }
}
