//! Password hashing capabilities.
//!
//! Hashing is CPU-bound; the service runs these calls on the blocking pool.

use std::sync::Arc;

use argon2::{
    password_hash::{Error as PasswordHashError, PasswordHasher as _, PasswordVerifier, SaltString},
    Argon2, PasswordHash,
};
use rand::rngs::OsRng;

use super::errors::AuthError;

/// Salted one-way hash with a matching verify routine.
pub trait PasswordHasher: Send + Sync {
    /// Short algorithm name, used in logs.
    fn algorithm(&self) -> &'static str;

    fn hash(&self, plaintext: &str) -> Result<String, AuthError>;

    /// `Ok(false)` on mismatch; `Err` only when `digest` cannot be parsed.
    /// Digests of the other supported scheme are verified with that scheme,
    /// so changing the configured algorithm keeps existing users working.
    fn verify(&self, plaintext: &str, digest: &str) -> Result<bool, AuthError>;
}

fn is_bcrypt_digest(digest: &str) -> bool {
    digest.starts_with("$2")
}

fn is_argon2_digest(digest: &str) -> bool {
    digest.starts_with("$argon2")
}

/// bcrypt with a fixed work factor.
#[derive(Debug, Clone, Copy)]
pub struct BcryptHasher {
    cost: u32,
}

impl BcryptHasher {
    pub const DEFAULT_COST: u32 = 10;

    pub fn new(cost: u32) -> Self { Self { cost } }

    pub fn cost(&self) -> u32 { self.cost }
}

impl Default for BcryptHasher {
    fn default() -> Self { Self::new(Self::DEFAULT_COST) }
}

impl PasswordHasher for BcryptHasher {
    fn algorithm(&self) -> &'static str { "bcrypt" }

    fn hash(&self, plaintext: &str) -> Result<String, AuthError> {
        bcrypt::hash(plaintext, self.cost).map_err(|e| AuthError::HashError(e.to_string()))
    }

    fn verify(&self, plaintext: &str, digest: &str) -> Result<bool, AuthError> {
        if is_argon2_digest(digest) {
            return Argon2Hasher.verify(plaintext, digest);
        }
        bcrypt::verify(plaintext, digest).map_err(|e| AuthError::HashError(e.to_string()))
    }
}

/// argon2id with the crate's default parameters, PHC string output.
#[derive(Debug, Clone, Copy, Default)]
pub struct Argon2Hasher;

impl PasswordHasher for Argon2Hasher {
    fn algorithm(&self) -> &'static str { "argon2" }

    fn hash(&self, plaintext: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(plaintext.as_bytes(), &salt)
            .map(|h| h.to_string())
            .map_err(|e| AuthError::HashError(e.to_string()))
    }

    fn verify(&self, plaintext: &str, digest: &str) -> Result<bool, AuthError> {
        if is_bcrypt_digest(digest) {
            return bcrypt::verify(plaintext, digest).map_err(|e| AuthError::HashError(e.to_string()));
        }
        let parsed = PasswordHash::new(digest).map_err(|e| AuthError::HashError(e.to_string()))?;
        match Argon2::default().verify_password(plaintext.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(PasswordHashError::Password) => Ok(false),
            Err(e) => Err(AuthError::HashError(e.to_string())),
        }
    }
}

/// Build the hasher named by configuration (`bcrypt` or `argon2`).
pub fn hasher_for(algorithm: &str, bcrypt_cost: u32) -> Result<Arc<dyn PasswordHasher>, AuthError> {
    match algorithm {
        "bcrypt" => Ok(Arc::new(BcryptHasher::new(bcrypt_cost))),
        "argon2" => Ok(Arc::new(Argon2Hasher)),
        other => Err(AuthError::Validation(format!("unsupported password algorithm: {other}"))),
    }
}
