use std::sync::Arc;

use chrono::Utc;
use tokio::sync::OnceCell;
use tracing::{debug, info, instrument, warn};

use super::domain::{AuthSession, LoginInput, RegisterInput, Registered, TokenPayload, UserRecord};
use super::errors::AuthError;
use super::hasher::PasswordHasher;
use super::repository::CredentialStore;
use super::token::TokenSigner;

/// Plaintext behind the digest verified for unknown usernames.
const DECOY_PASSWORD: &str = "decoy-password-never-issued";

/// Auth business service independent of web framework
pub struct AuthService {
    store: CredentialStore,
    hasher: Arc<dyn PasswordHasher>,
    signer: Arc<dyn TokenSigner>,
    // hashed on first use; unknown usernames are verified against it
    decoy_digest: OnceCell<String>,
}

impl AuthService {
    pub fn new(store: CredentialStore, hasher: Arc<dyn PasswordHasher>, signer: Arc<dyn TokenSigner>) -> Self {
        Self { store, hasher, signer, decoy_digest: OnceCell::new() }
    }

    pub fn store(&self) -> &CredentialStore { &self.store }

    pub fn signer(&self) -> &dyn TokenSigner { self.signer.as_ref() }

    /// Register a new user with a hashed password.
    ///
    /// # Examples
    /// ```
    /// use std::sync::Arc;
    /// use service::auth::{AuthService, CredentialStore};
    /// use service::auth::domain::RegisterInput;
    /// use service::auth::hasher::BcryptHasher;
    /// use service::auth::token::{JwtSigner, DEFAULT_TTL};
    /// use service::storage::MemoryKvStore;
    ///
    /// let store = CredentialStore::with_default_timeout(Arc::new(MemoryKvStore::new()));
    /// let svc = AuthService::new(store, Arc::new(BcryptHasher::default()), Arc::new(JwtSigner::new("secret", DEFAULT_TTL)));
    /// let input = RegisterInput { username: "alice".into(), password: "Secret123!".into() };
    /// let out = tokio_test::block_on(svc.register(input)).unwrap();
    /// assert_eq!(out.username, "alice");
    /// ```
    #[instrument(skip(self, input), fields(username = %input.username))]
    pub async fn register(&self, input: RegisterInput) -> Result<Registered, AuthError> {
        let RegisterInput { username, password } = input;
        let key = CredentialStore::user_key(&username);

        // cheap rejection before paying for the hash
        if self.store.exists(&key).await? {
            debug!("username already taken");
            return Err(AuthError::AlreadyExists);
        }

        let hasher = Arc::clone(&self.hasher);
        let password_hash = tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| AuthError::HashError(e.to_string()))??;

        let record = UserRecord { username, password_hash, created_at: Utc::now() };
        if !self.store.insert_user(&record).await? {
            debug!("username claimed by a concurrent registration");
            return Err(AuthError::AlreadyExists);
        }

        info!(username = %record.username, algorithm = self.hasher.algorithm(), "user_registered");
        Ok(Registered { username: record.username })
    }

    /// Authenticate a user and issue a token.
    ///
    /// An unknown username and a wrong password fail with the same
    /// `AuthError::InvalidCredentials`.
    ///
    /// # Examples
    /// ```
    /// use std::sync::Arc;
    /// use service::auth::{AuthService, CredentialStore};
    /// use service::auth::domain::{LoginInput, RegisterInput};
    /// use service::auth::hasher::BcryptHasher;
    /// use service::auth::token::{JwtSigner, DEFAULT_TTL};
    /// use service::storage::MemoryKvStore;
    ///
    /// let store = CredentialStore::with_default_timeout(Arc::new(MemoryKvStore::new()));
    /// let svc = AuthService::new(store, Arc::new(BcryptHasher::default()), Arc::new(JwtSigner::new("secret", DEFAULT_TTL)));
    /// let _ = tokio_test::block_on(svc.register(RegisterInput { username: "u".into(), password: "Passw0rd!".into() }));
    /// let session = tokio_test::block_on(svc.authenticate(LoginInput { username: "u".into(), password: "Passw0rd!".into() })).unwrap();
    /// assert_eq!(session.username, "u");
    /// assert_eq!(session.token.split('.').count(), 3);
    /// ```
    #[instrument(skip(self, input), fields(username = %input.username))]
    pub async fn authenticate(&self, input: LoginInput) -> Result<AuthSession, AuthError> {
        let LoginInput { username, password } = input;

        let Some(user) = self.store.find_user(&username).await? else {
            debug!("no such user");
            // same verify cost as a wrong password
            if let Err(e) = self.verify_decoy(password).await {
                warn!(error = %e, "decoy verification failed");
            }
            return Err(AuthError::InvalidCredentials);
        };

        if !self.verify_blocking(password, user.password_hash.clone()).await? {
            debug!("password mismatch");
            return Err(AuthError::InvalidCredentials);
        }

        let token = self.signer.sign(&TokenPayload { username: user.username.clone() })?;
        info!(username = %user.username, "user_authenticated");
        Ok(AuthSession { token, username: user.username })
    }

    async fn verify_blocking(&self, password: String, digest: String) -> Result<bool, AuthError> {
        let hasher = Arc::clone(&self.hasher);
        tokio::task::spawn_blocking(move || hasher.verify(&password, &digest))
            .await
            .map_err(|e| AuthError::HashError(e.to_string()))?
    }

    async fn verify_decoy(&self, password: String) -> Result<(), AuthError> {
        let digest = self
            .decoy_digest
            .get_or_try_init(|| async {
                let hasher = Arc::clone(&self.hasher);
                tokio::task::spawn_blocking(move || hasher.hash(DECOY_PASSWORD))
                    .await
                    .map_err(|e| AuthError::HashError(e.to_string()))?
            })
            .await?
            .clone();
        self.verify_blocking(password, digest).await.map(|_| ())
    }
}
