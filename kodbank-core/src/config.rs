//! Configuration management
//!
//! Settings live in `<data_dir>/settings.json`:
//! ```json
//! {
//!   "dbFile": "kodbank.duckdb",
//!   "sessionTtlSecs": 3600,
//!   "tokenSecret": "…",
//!   "maxInitialBalance": "10000.00",
//!   "poolSize": 4,
//!   "poolTimeoutMs": 5000,
//!   "lockTimeoutMs": 5000,
//!   "passwordHashing": { "timeCost": 2, "memoryCost": 19456, "parallelism": 1 }
//! }
//! ```
//! Every key is optional. Unknown keys are kept when the file is saved.

use std::collections::HashMap;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use rand::rngs::OsRng;
use rand::RngCore;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::adapters::duckdb::StoreOptions;
use crate::domain::result::{self, Error};
use crate::domain::Argon2Params;

pub const SETTINGS_FILE: &str = "settings.json";
pub const DEFAULT_DB_FILE: &str = "kodbank.duckdb";
pub const DEFAULT_SESSION_TTL_SECS: i64 = 3600;
pub const MAX_SESSION_TTL_SECS: i64 = 366 * 24 * 60 * 60;
pub const DEFAULT_POOL_SIZE: usize = 4;
pub const DEFAULT_POOL_TIMEOUT_MS: u64 = 5000;
pub const DEFAULT_LOCK_TIMEOUT_MS: u64 = 5000;

pub const ENV_TOKEN_SECRET: &str = "KODBANK_TOKEN_SECRET";
pub const ENV_SESSION_TTL_SECS: &str = "KODBANK_SESSION_TTL_SECS";
pub const ENV_MAX_INITIAL_BALANCE: &str = "KODBANK_MAX_INITIAL_BALANCE";
pub const ENV_POOL_SIZE: &str = "KODBANK_POOL_SIZE";

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    db_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    session_ttl_secs: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    token_secret: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    max_initial_balance: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pool_size: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pool_timeout_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    lock_timeout_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    password_hashing: Option<Argon2Params>,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

/// KodBank configuration (settings file plus environment overrides)
#[derive(Debug, Clone)]
pub struct Config {
    pub db_file: String,
    pub session_ttl_secs: i64,
    pub token_secret: String,
    pub max_initial_balance: Decimal,
    pub pool_size: usize,
    pub pool_timeout_ms: u64,
    pub lock_timeout_ms: u64,
    pub password_hashing: Argon2Params,
    secret_from_env: bool,
    // Keep the raw settings for preservation when saving
    _raw_settings: SettingsFile,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_file: DEFAULT_DB_FILE.to_string(),
            session_ttl_secs: DEFAULT_SESSION_TTL_SECS,
            token_secret: generate_secret(),
            max_initial_balance: default_max_initial_balance(),
            pool_size: DEFAULT_POOL_SIZE,
            pool_timeout_ms: DEFAULT_POOL_TIMEOUT_MS,
            lock_timeout_ms: DEFAULT_LOCK_TIMEOUT_MS,
            password_hashing: Argon2Params::default(),
            secret_from_env: false,
            _raw_settings: SettingsFile::default(),
        }
    }
}

impl Config {
    /// Load config from the data directory, applying `KODBANK_*` overrides.
    ///
    /// When neither the file nor the environment provides a token secret, one
    /// is generated and written back so tokens survive restarts.
    pub fn load(data_dir: &Path) -> Result<Self> {
        Self::load_with_env(data_dir, |name| std::env::var(name).ok())
    }

    fn load_with_env(data_dir: &Path, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let settings_path = data_dir.join(SETTINGS_FILE);
        let raw = read_settings(&settings_path)?;

        let env_secret = env(ENV_TOKEN_SECRET).filter(|s| !s.trim().is_empty());
        let secret_from_env = env_secret.is_some();
        let (token_secret, generated) = match (env_secret, raw.token_secret.clone()) {
            (Some(secret), _) => (secret, false),
            (None, Some(secret)) => (secret, false),
            (None, None) => (generate_secret(), true),
        };

        let config = Self {
            db_file: raw.db_file.clone().unwrap_or_else(|| DEFAULT_DB_FILE.to_string()),
            session_ttl_secs: parse_override(&env, ENV_SESSION_TTL_SECS)?
                .or(raw.session_ttl_secs)
                .unwrap_or(DEFAULT_SESSION_TTL_SECS),
            token_secret,
            max_initial_balance: parse_override(&env, ENV_MAX_INITIAL_BALANCE)?
                .or(raw.max_initial_balance)
                .unwrap_or_else(default_max_initial_balance),
            pool_size: parse_override(&env, ENV_POOL_SIZE)?
                .or(raw.pool_size)
                .unwrap_or(DEFAULT_POOL_SIZE),
            pool_timeout_ms: raw.pool_timeout_ms.unwrap_or(DEFAULT_POOL_TIMEOUT_MS),
            lock_timeout_ms: raw.lock_timeout_ms.unwrap_or(DEFAULT_LOCK_TIMEOUT_MS),
            password_hashing: raw.password_hashing.clone().unwrap_or_default(),
            secret_from_env,
            _raw_settings: raw,
        };
        config.validate()?;

        if generated {
            std::fs::create_dir_all(data_dir)
                .with_context(|| format!("Failed to create {}", data_dir.display()))?;
            config.save(data_dir)?;
            tracing::info!(path = %settings_path.display(), "generated token secret");
        }

        Ok(config)
    }

    /// Save config to the data directory.
    /// Preserves settings this crate doesn't manage.
    pub fn save(&self, data_dir: &Path) -> Result<()> {
        let settings_path = data_dir.join(SETTINGS_FILE);

        // Re-read so keys written by someone else since load survive
        let mut settings = read_settings(&settings_path).unwrap_or_else(|_| self._raw_settings.clone());

        settings.db_file = Some(self.db_file.clone());
        settings.session_ttl_secs = Some(self.session_ttl_secs);
        settings.max_initial_balance = Some(self.max_initial_balance);
        settings.pool_size = Some(self.pool_size);
        settings.pool_timeout_ms = Some(self.pool_timeout_ms);
        settings.lock_timeout_ms = Some(self.lock_timeout_ms);
        settings.password_hashing = Some(self.password_hashing.clone());
        // A secret supplied through the environment stays out of the file
        if !self.secret_from_env {
            settings.token_secret = Some(self.token_secret.clone());
        }

        let content = serde_json::to_string_pretty(&settings)?;
        std::fs::write(&settings_path, content)
            .with_context(|| format!("Failed to write {}", settings_path.display()))?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.session_ttl_secs <= 0 {
            bail!("sessionTtlSecs must be positive, got {}", self.session_ttl_secs);
        }
        if self.session_ttl_secs > MAX_SESSION_TTL_SECS {
            bail!(
                "sessionTtlSecs must be at most {} (366 days), got {}",
                MAX_SESSION_TTL_SECS,
                self.session_ttl_secs
            );
        }
        if self.pool_size == 0 {
            bail!("poolSize must be at least 1");
        }
        if self.max_initial_balance < Decimal::ZERO {
            bail!("maxInitialBalance cannot be negative");
        }
        if self.token_secret.len() < 16 {
            bail!("tokenSecret must be at least 16 characters");
        }
        Ok(())
    }

    pub fn db_path(&self, data_dir: &Path) -> PathBuf {
        data_dir.join(&self.db_file)
    }

    /// Session lifetime. Fields are public, so the range is checked again here.
    pub fn session_ttl(&self) -> result::Result<chrono::TimeDelta> {
        if !(1..=MAX_SESSION_TTL_SECS).contains(&self.session_ttl_secs) {
            return Err(Error::Config(format!(
                "sessionTtlSecs out of range: {}",
                self.session_ttl_secs
            )));
        }
        chrono::TimeDelta::try_seconds(self.session_ttl_secs)
            .ok_or_else(|| Error::Config(format!("sessionTtlSecs out of range: {}", self.session_ttl_secs)))
    }

    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            pool_size: self.pool_size,
            pool_timeout: Duration::from_millis(self.pool_timeout_ms),
            lock_timeout: Duration::from_millis(self.lock_timeout_ms),
        }
    }
}

fn read_settings(path: &Path) -> Result<SettingsFile> {
    if !path.exists() {
        return Ok(SettingsFile::default());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

fn parse_override<T>(env: &impl Fn(&str) -> Option<String>, name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: Display,
{
    match env(name) {
        Some(value) if !value.trim().is_empty() => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| anyhow!("Invalid {}={:?}: {}", name, value, e)),
        _ => Ok(None),
    }
}

fn default_max_initial_balance() -> Decimal {
    Decimal::new(1_000_000, 2)
}

fn generate_secret() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_defaults_and_generated_secret_is_persisted() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_with_env(dir.path(), no_env).unwrap();

        assert_eq!(config.db_file, DEFAULT_DB_FILE);
        assert_eq!(config.session_ttl_secs, 3600);
        assert_eq!(config.max_initial_balance.to_string(), "10000.00");
        assert_eq!(config.token_secret.len(), 64);

        let again = Config::load_with_env(dir.path(), no_env).unwrap();
        assert_eq!(again.token_secret, config.token_secret);
    }

    #[test]
    fn test_env_overrides() {
        let dir = TempDir::new().unwrap();
        let env = |name: &str| match name {
            ENV_TOKEN_SECRET => Some("from-the-environment-0123".to_string()),
            ENV_SESSION_TTL_SECS => Some("60".to_string()),
            ENV_MAX_INITIAL_BALANCE => Some("25.50".to_string()),
            ENV_POOL_SIZE => Some("2".to_string()),
            _ => None,
        };
        let config = Config::load_with_env(dir.path(), env).unwrap();
        assert_eq!(config.token_secret, "from-the-environment-0123");
        assert_eq!(config.session_ttl_secs, 60);
        assert_eq!(config.max_initial_balance.to_string(), "25.50");
        assert_eq!(config.store_options().pool_size, 2);

        // Environment secrets are never written to disk
        config.save(dir.path()).unwrap();
        let content = std::fs::read_to_string(dir.path().join(SETTINGS_FILE)).unwrap();
        assert!(!content.contains("from-the-environment"));
    }

    #[test]
    fn test_bad_override_is_an_error() {
        let dir = TempDir::new().unwrap();
        let env = |name: &str| (name == ENV_POOL_SIZE).then(|| "many".to_string());
        assert!(Config::load_with_env(dir.path(), env).is_err());
    }

    #[test]
    fn test_save_preserves_unknown_keys() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(SETTINGS_FILE),
            r#"{"tokenSecret": "0123456789abcdef0123", "sessionTtlSecs": 120, "theme": "dark"}"#,
        )
        .unwrap();

        let mut config = Config::load_with_env(dir.path(), no_env).unwrap();
        assert_eq!(config.session_ttl_secs, 120);
        config.pool_size = 8;
        config.save(dir.path()).unwrap();

        let content = std::fs::read_to_string(dir.path().join(SETTINGS_FILE)).unwrap();
        let json: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(json["theme"], "dark");
        assert_eq!(json["poolSize"], 8);
        assert_eq!(json["tokenSecret"], "0123456789abcdef0123");
    }

    #[test]
    fn test_invalid_values_rejected() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(SETTINGS_FILE),
            r#"{"tokenSecret": "0123456789abcdef0123", "sessionTtlSecs": 0}"#,
        )
        .unwrap();
        assert!(Config::load_with_env(dir.path(), no_env).is_err());
    }

    #[test]
    fn test_oversized_session_ttl_rejected() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(SETTINGS_FILE),
            r#"{"tokenSecret": "0123456789abcdef0123", "sessionTtlSecs": 922337203685477580}"#,
        )
        .unwrap();
        let err = Config::load_with_env(dir.path(), no_env).unwrap_err();
        assert!(err.to_string().contains("sessionTtlSecs"));

        let env = |name: &str| (name == ENV_SESSION_TTL_SECS).then(|| (MAX_SESSION_TTL_SECS + 1).to_string());
        assert!(Config::load_with_env(dir.path(), env).is_err());

        let mut config = Config::default();
        config.session_ttl_secs = i64::MAX / 10;
        assert!(matches!(config.session_ttl(), Err(Error::Config(_))));
        config.session_ttl_secs = MAX_SESSION_TTL_SECS;
        assert_eq!(config.session_ttl().unwrap().num_days(), 366);
    }
}
