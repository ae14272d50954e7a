//! # configs
//!
//! Layered settings for the ad service.
//!
//! Sources, lowest precedence first:
//! 1. built-in defaults
//! 2. `config/default.toml` (optional)
//! 3. `config/{KABOOM_ENV}.toml` (optional, `KABOOM_ENV` defaults to `development`)
//! 4. `KABOOM__SECTION__KEY` environment variables (a `.env` file is loaded first)
//! 5. the conventional `DATABASE_URL` and `CRON_SECRET` variables

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File};
use secrecy::SecretString;
use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub policy: PolicySettings,
    pub sweeper: SweeperSettings,
    #[serde(default)]
    pub auth: AuthSettings,
    pub log: LogSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Deserialize)]
pub struct DatabaseSettings {
    pub backend: StoreBackend,
    pub url: Option<SecretString>,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
    pub run_migrations: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PolicySettings {
    /// Impressions after which an ad expires
    pub impression_cap: i64,
    /// Days after approval after which an ad expires
    pub max_age_days: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SweeperSettings {
    pub enabled: bool,
    pub interval_secs: u64,
}

#[derive(Debug, Default, Deserialize)]
pub struct AuthSettings {
    /// Bearer secret for `/api/cron/expire-ads`; unset leaves it open
    pub cron_secret: Option<SecretString>,
    /// Bearer secret for `/api/admin/*`; unset leaves it open
    pub admin_secret: Option<SecretString>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogSettings {
    pub format: LogFormat,
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub filter: String,
}

/// Upper bound on `policy.max_age_days` (about a century).
pub const MAX_AGE_DAYS_LIMIT: i64 = 36_500;

#[cfg(feature = "db-postgres")]
const DEFAULT_BACKEND: &str = "postgres";
#[cfg(not(feature = "db-postgres"))]
const DEFAULT_BACKEND: &str = "memory";

impl Settings {
    /// Loads settings from files and the environment.
    pub fn load() -> Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "loaded .env");
        }

        let env = std::env::var("KABOOM_ENV").unwrap_or_else(|_| "development".into());
        let builder = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                Environment::with_prefix("KABOOM")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .set_override_option("database.url", std::env::var("DATABASE_URL").ok())?
            .set_override_option("auth.cron_secret", std::env::var("CRON_SECRET").ok())?;

        Self::from_builder(builder)
    }

    /// Applies defaults underneath `builder`, then deserializes and validates.
    pub fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self> {
        let settings: Settings = builder
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080_i64)?
            .set_default("database.backend", DEFAULT_BACKEND)?
            .set_default("database.max_connections", 10_i64)?
            .set_default("database.acquire_timeout_secs", 5_i64)?
            .set_default("database.run_migrations", true)?
            .set_default("policy.impression_cap", 2000_i64)?
            .set_default("policy.max_age_days", 30_i64)?
            .set_default("sweeper.enabled", true)?
            .set_default("sweeper.interval_secs", 3600_i64)?
            .set_default("log.format", "pretty")?
            .set_default("log.filter", "info,tower_http=info")?
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(ConfigError::Invalid("server.port must be non-zero".into()));
        }
        if self.policy.impression_cap <= 0 {
            return Err(ConfigError::Invalid("policy.impression_cap must be positive".into()));
        }
        if self.policy.max_age_days <= 0 {
            return Err(ConfigError::Invalid("policy.max_age_days must be positive".into()));
        }
        if self.policy.max_age_days > MAX_AGE_DAYS_LIMIT {
            return Err(ConfigError::Invalid(format!(
                "policy.max_age_days must be at most {MAX_AGE_DAYS_LIMIT}"
            )));
        }
        if self.sweeper.interval_secs == 0 {
            return Err(ConfigError::Invalid("sweeper.interval_secs must be positive".into()));
        }
        if self.database.backend == StoreBackend::Postgres {
            if cfg!(not(feature = "db-postgres")) {
                return Err(ConfigError::Invalid(
                    "database.backend = postgres needs the db-postgres feature".into(),
                ));
            }
            if self.database.url.is_none() {
                return Err(ConfigError::Invalid(
                    "database.url (or DATABASE_URL) is required for the postgres backend".into(),
                ));
            }
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
