//! Credential service core.
//! - Key-value storage backends behind the `KvStore` trait.
//! - Credential store adapter, password hashing and token signing.
//! - The authentication workflow, independent of any web framework.

pub mod errors;
pub mod storage;
pub mod auth;
