use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;

/// Longest accepted token lifetime (one year).
pub const MAX_TOKEN_TTL: Duration = Duration::from_secs(365 * 86_400);

/// Secret used when neither `config.toml` nor `JWT_SECRET` provide one.
pub const DEV_JWT_SECRET: &str = "dev-secret-change-me";

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub worker_threads: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "127.0.0.1".into(), port: 8080, worker_threads: Some(4) }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub jwt_secret: String,
    #[serde(default = "default_expires_in")]
    pub jwt_expires_in: String,
    #[serde(default = "default_password_algorithm")]
    pub password_algorithm: String,
    #[serde(default = "default_bcrypt_cost")]
    pub bcrypt_cost: u32,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            jwt_expires_in: default_expires_in(),
            password_algorithm: default_password_algorithm(),
            bcrypt_cost: default_bcrypt_cost(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_backend")]
    pub backend: String,
    #[serde(default = "default_store_path")]
    pub path: String,
    #[serde(default)]
    pub url: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            path: default_store_path(),
            url: String::new(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

fn default_expires_in() -> String { "1h".into() }
fn default_password_algorithm() -> String { "bcrypt".into() }
fn default_bcrypt_cost() -> u32 { 10 }
fn default_backend() -> String { "memory".into() }
fn default_store_path() -> String { "data/users.json".into() }
fn default_timeout_ms() -> u64 { 2000 }

pub fn load_default() -> Result<AppConfig> {
    let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    load_from_file(&path)
}

pub fn load_from_file(path: &str) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    parse(&content)
}

pub fn parse(content: &str) -> Result<AppConfig> {
    let cfg: AppConfig = toml::from_str(content)?;
    Ok(cfg)
}

/// Parse an expiry such as `3600`, `90s`, `30m`, `1h` or `7d`.
pub fn parse_duration(raw: &str) -> Result<Duration> {
    let s = raw.trim();
    if s.is_empty() {
        return Err(anyhow!("empty duration"));
    }
    let (digits, unit) = match s.char_indices().find(|(_, c)| !c.is_ascii_digit()) {
        Some((idx, _)) => s.split_at(idx),
        None => (s, "s"),
    };
    let n: u64 = digits.parse().with_context(|| format!("invalid duration `{raw}`"))?;
    let scale: u64 = match unit.trim() {
        "s" => 1,
        "m" => 60,
        "h" => 3600,
        "d" => 86_400,
        other => return Err(anyhow!("unknown duration unit `{other}` in `{raw}`")),
    };
    let secs = n
        .checked_mul(scale)
        .ok_or_else(|| anyhow!("duration `{raw}` is too large"))?;
    if secs == 0 {
        return Err(anyhow!("duration `{raw}` must be positive"));
    }
    Ok(Duration::from_secs(secs))
}

impl AppConfig {
    /// Load `CONFIG_PATH` (or `config.toml`), fall back to defaults when the
    /// file is absent, then apply environment overrides and validate.
    pub fn load_and_validate() -> Result<Self> {
        let mut cfg = match load_default() {
            Ok(cfg) => cfg,
            Err(e) if is_not_found(&e) => AppConfig::default(),
            Err(e) => return Err(e.context("failed to load configuration file")),
        };
        cfg.apply_env();
        cfg.normalize_and_validate()?;
        Ok(cfg)
    }

    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from any lookup; split out so tests need not touch
    /// the process environment.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("SERVER_HOST") { self.server.host = v; }
        if let Some(p) = lookup("SERVER_PORT").and_then(|v| v.parse().ok()) { self.server.port = p; }
        if let Some(w) = lookup("TOKIO_WORKER_THREADS").and_then(|v| v.parse().ok()) {
            self.server.worker_threads = Some(w);
        }
        if let Some(v) = lookup("JWT_SECRET") { self.auth.jwt_secret = v; }
        if let Some(v) = lookup("JWT_EXPIRES_IN") { self.auth.jwt_expires_in = v; }
        if let Some(v) = lookup("PASSWORD_ALGORITHM") { self.auth.password_algorithm = v; }
        if let Some(v) = lookup("STORE_BACKEND") { self.store.backend = v; }
        if let Some(v) = lookup("STORE_PATH") { self.store.path = v; }
        if let Some(v) = lookup("REDIS_URL") { self.store.url = v; }
        if let Some(t) = lookup("STORE_TIMEOUT_MS").and_then(|v| v.parse().ok()) { self.store.timeout_ms = t; }
    }

    pub fn normalize_and_validate(&mut self) -> Result<()> {
        self.server.normalize()?;
        self.auth.normalize()?;
        self.store.normalize()?;
        Ok(())
    }
}

fn is_not_found(e: &anyhow::Error) -> bool {
    e.downcast_ref::<std::io::Error>()
        .map(|io| io.kind() == std::io::ErrorKind::NotFound)
        .unwrap_or(false)
}

impl ServerConfig {
    fn normalize(&mut self) -> Result<()> {
        if self.host.trim().is_empty() {
            self.host = "127.0.0.1".to_string();
        }
        if self.port == 0 {
            return Err(anyhow!("server.port must be within 1..=65535"));
        }
        match self.worker_threads {
            Some(0) | None => self.worker_threads = Some(4),
            Some(_) => {}
        }
        Ok(())
    }
}

impl AuthConfig {
    fn normalize(&mut self) -> Result<()> {
        if self.jwt_secret.trim().is_empty() {
            self.jwt_secret = DEV_JWT_SECRET.to_string();
        }
        self.token_ttl()?;
        self.password_algorithm = self.password_algorithm.trim().to_lowercase();
        match self.password_algorithm.as_str() {
            "bcrypt" | "argon2" => {}
            other => return Err(anyhow!("auth.password_algorithm `{other}` is not one of bcrypt, argon2")),
        }
        if !(4..=31).contains(&self.bcrypt_cost) {
            return Err(anyhow!("auth.bcrypt_cost must be within 4..=31"));
        }
        Ok(())
    }

    pub fn token_ttl(&self) -> Result<Duration> {
        let ttl = parse_duration(&self.jwt_expires_in).context("auth.jwt_expires_in")?;
        if ttl > MAX_TOKEN_TTL {
            return Err(anyhow!(
                "auth.jwt_expires_in `{}` exceeds the {}s ceiling",
                self.jwt_expires_in,
                MAX_TOKEN_TTL.as_secs()
            ));
        }
        Ok(ttl)
    }

    pub fn uses_dev_secret(&self) -> bool {
        self.jwt_secret == DEV_JWT_SECRET
    }
}

impl StoreConfig {
    fn normalize(&mut self) -> Result<()> {
        self.backend = self.backend.trim().to_lowercase();
        match self.backend.as_str() {
            "memory" => {}
            "file" => {
                if self.path.trim().is_empty() {
                    return Err(anyhow!("store.path is required for the file backend"));
                }
            }
            "redis" => {
                let lower = self.url.to_lowercase();
                if !(lower.starts_with("redis://") || lower.starts_with("rediss://")) {
                    return Err(anyhow!("store.url must start with redis:// or rediss:// (or set REDIS_URL)"));
                }
            }
            other => return Err(anyhow!("store.backend `{other}` is not one of memory, file, redis")),
        }
        if self.timeout_ms == 0 {
            return Err(anyhow!("store.timeout_ms must be positive"));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_validate() {
        let mut cfg = AppConfig::default();
        cfg.normalize_and_validate().unwrap();
        assert_eq!(cfg.server.port, 8080);
        assert_eq!(cfg.auth.bcrypt_cost, 10);
        assert_eq!(cfg.auth.token_ttl().unwrap(), Duration::from_secs(3600));
        assert_eq!(cfg.store.backend, "memory");
        assert!(cfg.auth.uses_dev_secret());
    }

    #[test]
    fn parses_toml_sections() {
        let mut cfg = parse(
            r#"
            [server]
            host = "0.0.0.0"
            port = 9000

            [auth]
            jwt_secret = "s3cret"
            jwt_expires_in = "30m"
            password_algorithm = "Argon2"

            [store]
            backend = "file"
            path = "tmp/users.json"
            "#,
        )
        .unwrap();
        cfg.normalize_and_validate().unwrap();
        assert_eq!(cfg.server.host, "0.0.0.0");
        assert_eq!(cfg.server.worker_threads, Some(4));
        assert_eq!(cfg.auth.password_algorithm, "argon2");
        assert_eq!(cfg.auth.token_ttl().unwrap(), Duration::from_secs(1800));
        assert_eq!(cfg.store.path, "tmp/users.json");
        assert_eq!(cfg.store.timeout(), Duration::from_millis(2000));
    }

    #[test]
    fn env_overrides_win() {
        let env: HashMap<&str, &str> = [
            ("JWT_SECRET", "from-env"),
            ("SERVER_PORT", "7000"),
            ("STORE_BACKEND", "redis"),
            ("REDIS_URL", "redis://127.0.0.1:6379"),
        ]
        .into_iter()
        .collect();
        let mut cfg = AppConfig::default();
        cfg.apply_overrides(|k| env.get(k).map(|v| v.to_string()));
        cfg.normalize_and_validate().unwrap();
        assert_eq!(cfg.auth.jwt_secret, "from-env");
        assert_eq!(cfg.server.port, 7000);
        assert_eq!(cfg.store.backend, "redis");
    }

    #[test]
    fn rejects_bad_values() {
        let mut cfg = AppConfig::default();
        cfg.store.backend = "etcd".into();
        assert!(cfg.normalize_and_validate().is_err());

        let mut cfg = AppConfig::default();
        cfg.store.backend = "redis".into();
        assert!(cfg.normalize_and_validate().is_err());

        let mut cfg = AppConfig::default();
        cfg.auth.password_algorithm = "md5".into();
        assert!(cfg.normalize_and_validate().is_err());

        let mut cfg = AppConfig::default();
        cfg.auth.bcrypt_cost = 3;
        assert!(cfg.normalize_and_validate().is_err());

        let mut cfg = AppConfig::default();
        cfg.store.timeout_ms = 0;
        assert!(cfg.normalize_and_validate().is_err());
    }

    #[test]
    fn duration_units() {
        assert_eq!(parse_duration("3600").unwrap(), Duration::from_secs(3600));
        assert_eq!(parse_duration("45s").unwrap(), Duration::from_secs(45));
        assert_eq!(parse_duration("2h").unwrap(), Duration::from_secs(7200));
        assert_eq!(parse_duration("1d").unwrap(), Duration::from_secs(86_400));
        assert!(parse_duration("").is_err());
        assert!(parse_duration("0s").is_err());
        assert!(parse_duration("1w").is_err());
        assert!(parse_duration("h").is_err());
        assert!(parse_duration("999999999999999999d").is_err());
        assert!(parse_duration("18446744073709551616").is_err());
    }

    #[test]
    fn token_ttl_has_a_ceiling() {
        let mut cfg = AppConfig::default();
        cfg.auth.jwt_expires_in = "365d".into();
        cfg.normalize_and_validate().unwrap();
        assert_eq!(cfg.auth.token_ttl().unwrap(), MAX_TOKEN_TTL);

        let env: HashMap<&str, &str> = [("JWT_EXPIRES_IN", "18446744073709551615")].into_iter().collect();
        let mut cfg = AppConfig::default();
        cfg.apply_overrides(|k| env.get(k).map(|v| v.to_string()));
        assert!(cfg.normalize_and_validate().is_err());

        let mut cfg = AppConfig::default();
        cfg.auth.jwt_expires_in = "366d".into();
        assert!(cfg.normalize_and_validate().is_err());
    }
}
