use std::{future::Future, sync::Arc, time::Duration};

use tracing::warn;

use super::domain::UserRecord;
use crate::errors::StorageError;
use crate::storage::KvStore;

/// Round-trip budget used when the caller does not configure one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(2000);

const USER_KEY_PREFIX: &str = "user:";

/// Credential store adapter over an injected key-value backend.
///
/// Every backend call is bounded by `timeout`; nothing is retried.
#[derive(Clone)]
pub struct CredentialStore {
    backend: Arc<dyn KvStore>,
    timeout: Duration,
}

impl CredentialStore {
    pub fn new(backend: Arc<dyn KvStore>, timeout: Duration) -> Self {
        Self { backend, timeout }
    }

    pub fn with_default_timeout(backend: Arc<dyn KvStore>) -> Self {
        Self::new(backend, DEFAULT_TIMEOUT)
    }

    /// Store key for a username. Case-sensitive: `Alice` and `alice` differ.
    pub fn user_key(username: &str) -> String {
        format!("{USER_KEY_PREFIX}{username}")
    }

    async fn bounded<T, F>(&self, op: &'static str, fut: F) -> Result<T, StorageError>
    where
        F: Future<Output = Result<T, StorageError>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(res) => {
                if let Err(e) = &res {
                    warn!(op, error = %e, "store call failed");
                }
                res
            }
            Err(_) => {
                let ms = self.timeout.as_millis() as u64;
                warn!(op, timeout_ms = ms, "store call timed out");
                Err(StorageError::Timeout(ms))
            }
        }
    }

    pub async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        self.bounded("exists", self.backend.exists(key)).await
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.bounded("get", self.backend.get(key)).await
    }

    pub async fn set(&self, key: &str, value: String) -> Result<(), StorageError> {
        self.bounded("set", self.backend.set(key, value)).await
    }

    pub async fn set_if_absent(&self, key: &str, value: String) -> Result<bool, StorageError> {
        self.bounded("set_if_absent", self.backend.set_if_absent(key, value)).await
    }

    pub async fn delete(&self, key: &str) -> Result<bool, StorageError> {
        self.bounded("delete", self.backend.delete(key)).await
    }

    /// Load and decode the record for `username`.
    pub async fn find_user(&self, username: &str) -> Result<Option<UserRecord>, StorageError> {
        let key = Self::user_key(username);
        match self.get(&key).await? {
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|e| StorageError::Corrupt(format!("{key}: {e}"))),
            None => Ok(None),
        }
    }

    /// Write a new record; `false` means the username was already taken.
    pub async fn insert_user(&self, record: &UserRecord) -> Result<bool, StorageError> {
        let value = serde_json::to_string(record).map_err(StorageError::backend)?;
        self.set_if_absent(&Self::user_key(&record.username), value).await
    }

    pub async fn delete_user(&self, username: &str) -> Result<bool, StorageError> {
        self.delete(&Self::user_key(username)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::faulty::{DownKvStore, StalledKvStore};
    use crate::storage::MemoryKvStore;
    use chrono::Utc;

    fn record(username: &str) -> UserRecord {
        UserRecord { username: username.into(), password_hash: "digest".into(), created_at: Utc::now() }
    }

    #[test]
    fn key_is_prefixed_username() {
        assert_eq!(CredentialStore::user_key("alice"), "user:alice");
        assert_ne!(CredentialStore::user_key("Alice"), CredentialStore::user_key("alice"));
    }

    #[tokio::test]
    async fn user_records_round_trip_through_backend() -> Result<(), anyhow::Error> {
        let backend = Arc::new(MemoryKvStore::new());
        let store = CredentialStore::with_default_timeout(backend.clone());

        assert!(store.find_user("alice").await?.is_none());
        assert!(store.insert_user(&record("alice")).await?);
        assert!(!store.insert_user(&record("alice")).await?);
        assert!(store.exists("user:alice").await?);

        let raw = backend.get("user:alice").await?.unwrap();
        assert!(raw.contains("\"passwordHash\":\"digest\""));
        assert_eq!(store.find_user("alice").await?.unwrap().username, "alice");

        assert!(store.delete_user("alice").await?);
        assert!(store.find_user("alice").await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn undecodable_record_is_corrupt() -> Result<(), anyhow::Error> {
        let store = CredentialStore::with_default_timeout(Arc::new(MemoryKvStore::new()));
        store.set("user:mallory", "not json".into()).await?;
        let err = store.find_user("mallory").await.unwrap_err();
        assert!(matches!(err, StorageError::Corrupt(_)));
        Ok(())
    }

    #[tokio::test]
    async fn backend_failure_propagates() {
        let store = CredentialStore::with_default_timeout(Arc::new(DownKvStore));
        assert!(matches!(store.exists("user:a").await, Err(StorageError::Backend(_))));
        assert!(matches!(store.find_user("a").await, Err(StorageError::Backend(_))));
    }

    #[tokio::test]
    async fn slow_backend_times_out() {
        let store = CredentialStore::new(
            Arc::new(StalledKvStore(Duration::from_millis(500))),
            Duration::from_millis(20),
        );
        assert!(matches!(store.get("user:a").await, Err(StorageError::Timeout(20))));
    }
}
