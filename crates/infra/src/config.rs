//! Configuration loading and representation.
//!
//! Values come from an optional file (TOML) and `STOCKROOM_*` environment
//! variables, environment winning. Every field has a default, so an empty
//! environment yields a usable local configuration.

use std::path::Path;

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File};
use serde::Deserialize;

use crate::store::OrphanPolicy;

const ENV_PREFIX: &str = "STOCKROOM";
const DEFAULT_DATABASE_URL: &str = "sqlite://stockroom.db";
const DEFAULT_SESSION_TTL_SECS: u64 = 8 * 60 * 60;
const MAX_SESSION_TTL_SECS: u64 = 365 * 24 * 60 * 60;
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_USER: &str = "System";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StockroomConfig {
    /// SQLite database location, e.g. `sqlite://stockroom.db` or `sqlite::memory:`.
    #[serde(default = "default_database_url")]
    pub database_url: String,

    /// What deleting an item does when movements still reference it.
    #[serde(default)]
    pub orphan_policy: OrphanPolicy,

    /// Lifetime of a login session, in seconds (at most one year).
    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: u64,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Emit JSON log lines instead of human-readable ones.
    #[serde(default)]
    pub log_json: bool,

    /// Attribution recorded on movements submitted without a user.
    #[serde(default = "default_user")]
    pub default_user: String,
}

impl Default for StockroomConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            orphan_policy: OrphanPolicy::default(),
            session_ttl_secs: default_session_ttl_secs(),
            log_level: default_log_level(),
            log_json: false,
            default_user: default_user(),
        }
    }
}

impl StockroomConfig {
    /// Load from the environment only.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(None)
    }

    /// Load from an optional config file, then the environment.
    ///
    /// A missing file is not an error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(false));
        }
        builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true));
        Self::from_builder(builder)
    }

    pub(crate) fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        let cfg: Self = builder.build()?.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.session_ttl_secs == 0 {
            return Err(ConfigError::Message(
                "session_ttl_secs must be greater than zero".to_string(),
            ));
        }
        if self.session_ttl_secs > MAX_SESSION_TTL_SECS {
            return Err(ConfigError::Message(format!(
                "session_ttl_secs must be at most {MAX_SESSION_TTL_SECS} (one year)"
            )));
        }
        if self.database_url.trim().is_empty() {
            return Err(ConfigError::Message("database_url cannot be empty".to_string()));
        }
        if self.default_user.trim().is_empty() {
            return Err(ConfigError::Message("default_user cannot be empty".to_string()));
        }
        Ok(())
    }

    /// Session lifetime, clamped to one year for configs built without
    /// [`StockroomConfig::load`].
    pub fn session_ttl(&self) -> chrono::Duration {
        let secs = self.session_ttl_secs.min(MAX_SESSION_TTL_SECS);
        chrono::Duration::seconds(secs as i64)
    }

    /// Install the tracing subscriber described by this configuration.
    pub fn init_logging(&self) {
        stockroom_observability::init_with(
            &self.log_level,
            stockroom_observability::LogFormat::from_json_flag(self.log_json),
        );
    }
}

fn default_database_url() -> String {
    DEFAULT_DATABASE_URL.to_string()
}

fn default_session_ttl_secs() -> u64 {
    DEFAULT_SESSION_TTL_SECS
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_user() -> String {
    DEFAULT_USER.to_string()
}
