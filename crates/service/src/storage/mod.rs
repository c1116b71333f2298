//! Storage abstractions for the service layer
//!
//! `KvStore` is the seam between the credential adapter and whatever holds
//! the bytes: a process-local map, a JSON file, or Redis.

use async_trait::async_trait;

use crate::errors::StorageError;

pub mod json_map_store;
pub mod memory;
#[cfg(feature = "redis")]
pub mod redis_store;

pub use json_map_store::FileKvStore;
pub use memory::MemoryKvStore;
#[cfg(feature = "redis")]
pub use redis_store::RedisKvStore;

/// Point operations on opaque string keys and values.
/// No transactions, no secondary indexes, no expiry.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn exists(&self, key: &str) -> Result<bool, StorageError>;
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    async fn set(&self, key: &str, value: String) -> Result<(), StorageError>;
    /// Write only when the key is absent; returns whether the write happened.
    async fn set_if_absent(&self, key: &str, value: String) -> Result<bool, StorageError>;
    /// Remove a key; returns whether it existed.
    async fn delete(&self, key: &str) -> Result<bool, StorageError>;
}

/// Backends that misbehave on purpose, for exercising error paths.
#[cfg(test)]
pub(crate) mod faulty {
    use std::time::Duration;

    use super::*;

    /// Every call fails as if the server were unreachable.
    pub struct DownKvStore;

    #[async_trait]
    impl KvStore for DownKvStore {
        async fn exists(&self, _key: &str) -> Result<bool, StorageError> { Err(refused()) }
        async fn get(&self, _key: &str) -> Result<Option<String>, StorageError> { Err(refused()) }
        async fn set(&self, _key: &str, _value: String) -> Result<(), StorageError> { Err(refused()) }
        async fn set_if_absent(&self, _key: &str, _value: String) -> Result<bool, StorageError> { Err(refused()) }
        async fn delete(&self, _key: &str) -> Result<bool, StorageError> { Err(refused()) }
    }

    fn refused() -> StorageError {
        StorageError::Backend("connection refused".into())
    }

    /// Every call sleeps before answering with an empty result.
    pub struct StalledKvStore(pub Duration);

    #[async_trait]
    impl KvStore for StalledKvStore {
        async fn exists(&self, _key: &str) -> Result<bool, StorageError> {
            tokio::time::sleep(self.0).await;
            Ok(false)
        }
        async fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
            tokio::time::sleep(self.0).await;
            Ok(None)
        }
        async fn set(&self, _key: &str, _value: String) -> Result<(), StorageError> {
            tokio::time::sleep(self.0).await;
            Ok(())
        }
        async fn set_if_absent(&self, _key: &str, _value: String) -> Result<bool, StorageError> {
            tokio::time::sleep(self.0).await;
            Ok(true)
        }
        async fn delete(&self, _key: &str) -> Result<bool, StorageError> {
            tokio::time::sleep(self.0).await;
            Ok(false)
        }
    }
}
