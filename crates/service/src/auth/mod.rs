//! Auth module: domain types, credential store adapter, hashing and token
//! capabilities, and the service that orchestrates them.
//!
//! Registration and login live here; the HTTP layer only validates input and
//! maps `AuthError` to responses.

pub mod domain;
pub mod errors;
pub mod hasher;
pub mod repository;
pub mod service;
pub mod token;
pub mod validation;

pub use repository::CredentialStore;
pub use service::AuthService;
