use thiserror::Error;

/// Infrastructure failures raised by key-value backends.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("backend error: {0}")]
    Backend(String),
    #[error("backend did not answer within {0} ms")]
    Timeout(u64),
    #[error("corrupt value: {0}")]
    Corrupt(String),
}

impl StorageError {
    pub fn backend(e: impl std::fmt::Display) -> Self { Self::Backend(e.to_string()) }
}
