use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub server: ServerConfig,

    pub auth: AuthConfig,

    pub mail: MailConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub database_url: String,

    pub log_level: String,

    pub max_db_connections: u32,

    pub min_db_connections: u32,

    /// 0 means the tokio default.
    pub worker_threads: usize,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite:data/reviewarr.db".to_string(),
            log_level: "info".to_string(),
            max_db_connections: 5,
            min_db_connections: 1,
            worker_threads: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,

    pub port: u16,

    pub cors_allowed_origins: Vec<String>,

    pub metrics_enabled: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_allowed_origins: vec!["*".to_string()],
            metrics_enabled: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Key for confirmation-code HMACs and access-token signatures.
    pub token_secret: String,

    /// Access token validity window in hours.
    pub access_token_ttl_hours: i64,

    /// Confirmation code validity window in seconds.
    pub confirmation_code_ttl_seconds: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_secret: String::new(),
            access_token_ttl_hours: 24,
            confirmation_code_ttl_seconds: 24 * 60 * 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MailConfig {
    /// "log" writes deliveries to the log; "memory" keeps them in-process
    /// (used by the test suite).
    pub mode: String,

    pub from_address: String,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            mode: "log".to_string(),
            from_address: "noreply@reviewarr.local".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            server: ServerConfig::default(),
            auth: AuthConfig::default(),
            mail: MailConfig::default(),
        }
    }
}

impl Config {
    /// Load config.toml from the working directory, then apply environment
    /// overrides. Missing file falls back to defaults.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let mut config = if Path::new(CONFIG_FILE).exists() {
            let raw = std::fs::read_to_string(CONFIG_FILE)
                .with_context(|| format!("Failed to read {CONFIG_FILE}"))?;
            toml::from_str(&raw).with_context(|| format!("Failed to parse {CONFIG_FILE}"))?
        } else {
            Self::default()
        };

        if let Ok(url) = std::env::var("REVIEWARR_DATABASE_URL") {
            config.general.database_url = url;
        }
        if let Ok(secret) = std::env::var("REVIEWARR_TOKEN_SECRET") {
            config.auth.token_secret = secret;
        }

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.auth.token_secret.is_empty() {
            anyhow::bail!(
                "auth.token_secret is empty; set it in config.toml or via REVIEWARR_TOKEN_SECRET"
            );
        }
        if self.auth.confirmation_code_ttl_seconds <= 0 {
            anyhow::bail!("auth.confirmation_code_ttl_seconds must be positive");
        }
        if self.auth.access_token_ttl_hours <= 0 {
            anyhow::bail!("auth.access_token_ttl_hours must be positive");
        }
        Ok(())
    }

    /// Write a default config.toml with a freshly generated token secret.
    pub fn create_default_if_missing() -> Result<()> {
        if Path::new(CONFIG_FILE).exists() {
            info!("{CONFIG_FILE} already exists, leaving it untouched");
            return Ok(());
        }

        let mut config = Self::default();
        config.auth.token_secret = generate_secret();

        let raw = toml::to_string_pretty(&config).context("Failed to serialize default config")?;
        std::fs::write(CONFIG_FILE, raw).with_context(|| format!("Failed to write {CONFIG_FILE}"))?;

        info!("Default {CONFIG_FILE} created");
        Ok(())
    }
}

/// Random 64-char hex secret for a new installation.
#[must_use]
pub fn generate_secret() -> String {
    use rand::Rng;

    let mut rng = rand::rng();
    let bytes: [u8; 32] = rng.random();
    hex::encode(bytes)
}
