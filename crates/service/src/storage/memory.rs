use async_trait::async_trait;
use dashmap::{mapref::entry::Entry, DashMap};

use super::KvStore;
use crate::errors::StorageError;

/// Process-local backend. Contents are lost on restart.
#[derive(Default)]
pub struct MemoryKvStore {
    entries: DashMap<String, String>,
}

impl MemoryKvStore {
    pub fn new() -> Self { Self::default() }

    pub fn len(&self) -> usize { self.entries.len() }

    pub fn is_empty(&self) -> bool { self.entries.is_empty() }
}

#[async_trait]
impl KvStore for MemoryKvStore {
    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.entries.contains_key(key))
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.get(key).map(|v| v.value().clone()))
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StorageError> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    async fn set_if_absent(&self, key: &str, value: String) -> Result<bool, StorageError> {
        match self.entries.entry(key.to_string()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(value);
                Ok(true)
            }
        }
    }

    async fn delete(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.entries.remove(key).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_store_point_ops() -> Result<(), anyhow::Error> {
        let store = MemoryKvStore::new();
        assert!(store.is_empty());
        assert!(!store.exists("user:a").await?);
        assert_eq!(store.get("user:a").await?, None);

        store.set("user:a", "1".into()).await?;
        assert!(store.exists("user:a").await?);
        assert_eq!(store.get("user:a").await?.as_deref(), Some("1"));

        // plain set overwrites, conditional set does not
        store.set("user:a", "2".into()).await?;
        assert!(!store.set_if_absent("user:a", "3".into()).await?);
        assert_eq!(store.get("user:a").await?.as_deref(), Some("2"));
        assert!(store.set_if_absent("user:b", "4".into()).await?);
        assert_eq!(store.len(), 2);

        assert!(store.delete("user:a").await?);
        assert!(!store.delete("user:a").await?);
        assert!(!store.exists("user:a").await?);
        Ok(())
    }
}
