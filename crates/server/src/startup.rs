use std::{net::SocketAddr, sync::Arc};

use axum::Router;
use configs::{AppConfig, StoreConfig};
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::errors::StartupError;
use crate::routes::{self, AppState};
use service::{
    auth::{hasher::hasher_for, token::JwtSigner, AuthService, CredentialStore},
    storage::{FileKvStore, KvStore, MemoryKvStore},
};

fn build_cors() -> CorsLayer {
    CorsLayer::very_permissive()
}

#[cfg(feature = "redis")]
async fn open_redis(url: &str) -> Result<Arc<dyn KvStore>, StartupError> {
    let store = service::storage::RedisKvStore::connect(url)
        .await
        .map_err(|e| StartupError::Backend(e.to_string()))?;
    Ok(Arc::new(store))
}

#[cfg(not(feature = "redis"))]
async fn open_redis(_url: &str) -> Result<Arc<dyn KvStore>, StartupError> {
    Err(StartupError::InvalidConfig(
        "store.backend = \"redis\" needs a build with the `redis` feature".into(),
    ))
}

/// Open the key-value backend named by `store.backend`.
pub async fn open_backend(cfg: &StoreConfig) -> Result<Arc<dyn KvStore>, StartupError> {
    match cfg.backend.as_str() {
        "memory" => {
            warn!("using in-memory store; registrations are lost on restart");
            Ok(Arc::new(MemoryKvStore::new()))
        }
        "file" => {
            common::env::ensure_data_dir(&cfg.path).await?;
            let store = FileKvStore::open(&cfg.path)
                .await
                .map_err(|e| StartupError::Backend(e.to_string()))?;
            info!(path = %cfg.path, "using file store");
            Ok(store)
        }
        "redis" => open_redis(&cfg.url).await,
        other => Err(StartupError::InvalidConfig(format!("unknown store backend `{other}`"))),
    }
}

/// Wire the auth service from configuration and an already opened backend.
pub fn build_auth_service(cfg: &AppConfig, backend: Arc<dyn KvStore>) -> Result<AuthService, StartupError> {
    let ttl = cfg.auth.token_ttl()?;
    let hasher = hasher_for(&cfg.auth.password_algorithm, cfg.auth.bcrypt_cost)
        .map_err(|e| StartupError::InvalidConfig(e.to_string()))?;
    let signer = Arc::new(JwtSigner::new(&cfg.auth.jwt_secret, ttl));
    let store = CredentialStore::new(backend, cfg.store.timeout());
    Ok(AuthService::new(store, hasher, signer))
}

/// Build the router for a validated configuration.
pub async fn build_app(cfg: &AppConfig) -> Result<Router, StartupError> {
    if cfg.auth.uses_dev_secret() {
        warn!("JWT_SECRET not configured; using the development secret");
    }
    let backend = open_backend(&cfg.store).await?;
    let auth = build_auth_service(cfg, backend)?;
    info!(
        backend = %cfg.store.backend,
        algorithm = %cfg.auth.password_algorithm,
        token_ttl_secs = cfg.auth.token_ttl()?.as_secs(),
        "auth service ready"
    );
    let state = AppState { auth: Arc::new(auth) };
    Ok(routes::build_router(state, build_cors()))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "cannot listen for Ctrl+C; shutdown only by termination");
        std::future::pending::<()>().await;
    }
    info!("received Ctrl+C, shutting down");
}

/// Public entry: build the app and run the HTTP server until Ctrl+C.
pub async fn run(cfg: AppConfig) -> anyhow::Result<()> {
    let app = build_app(&cfg).await?;

    let addr: SocketAddr = format!("{}:{}", cfg.server.host, cfg.server.port).parse()?;
    info!(%addr, "starting server");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}
