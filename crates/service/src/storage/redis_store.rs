use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands};
use tracing::info;

use super::KvStore;
use crate::errors::StorageError;

/// Redis backend over a multiplexed, auto-reconnecting connection.
#[derive(Clone)]
pub struct RedisKvStore {
    conn: ConnectionManager,
}

impl RedisKvStore {
    /// Connect to `url` (`redis://host:port/db`).
    pub async fn connect(url: &str) -> Result<Self, StorageError> {
        let client = redis::Client::open(url).map_err(StorageError::backend)?;
        let conn = ConnectionManager::new(client).await.map_err(StorageError::backend)?;
        info!("connected to redis");
        Ok(Self { conn })
    }
}

#[async_trait]
impl KvStore for RedisKvStore {
    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        let mut conn = self.conn.clone();
        let found: bool = conn.exists(key).await.map_err(StorageError::backend)?;
        Ok(found)
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(key).await.map_err(StorageError::backend)?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StorageError> {
        let mut conn = self.conn.clone();
        let _: () = conn.set(key, value).await.map_err(StorageError::backend)?;
        Ok(())
    }

    async fn set_if_absent(&self, key: &str, value: String) -> Result<bool, StorageError> {
        let mut conn = self.conn.clone();
        // SET NX answers OK when written and nil when the key already exists
        let reply: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .query_async(&mut conn)
            .await
            .map_err(StorageError::backend)?;
        Ok(reply.is_some())
    }

    async fn delete(&self, key: &str) -> Result<bool, StorageError> {
        let mut conn = self.conn.clone();
        let removed: u64 = conn.del(key).await.map_err(StorageError::backend)?;
        Ok(removed > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn redis_store_point_ops() -> Result<(), anyhow::Error> {
        let Ok(url) = std::env::var("REDIS_URL") else { return Ok(()); };
        let store = RedisKvStore::connect(&url).await?;
        let key = format!("authkv_test:{}", uuid::Uuid::new_v4());

        assert!(!store.exists(&key).await?);
        assert!(store.set_if_absent(&key, "1".into()).await?);
        assert!(!store.set_if_absent(&key, "2".into()).await?);
        assert_eq!(store.get(&key).await?.as_deref(), Some("1"));
        store.set(&key, "3".into()).await?;
        assert_eq!(store.get(&key).await?.as_deref(), Some("3"));
        assert!(store.delete(&key).await?);
        assert!(!store.exists(&key).await?);
        Ok(())
    }
}
