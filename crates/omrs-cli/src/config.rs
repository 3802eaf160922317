use omrs_db_postgres::{PostgresConfig, mask_password};
use omrs_storage::{DEFAULT_LIMIT, EnrichmentOptions, MAX_LIMIT};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    /// Locale, drug order type and fallback switch of the engine
    #[serde(default)]
    pub enrichment: EnrichmentOptions,
    #[serde(default)]
    pub paging: PagingConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), String> {
        let pg = &self.storage.postgres;
        if pg.url.is_none() && pg.host.is_empty() {
            return Err("storage.postgres requires either 'url' or 'host' to be set".into());
        }
        if pg.url.is_none() && pg.database.is_empty() {
            return Err("storage.postgres.database must not be empty".into());
        }
        if pg.pool_size == 0 {
            return Err("storage.postgres.pool_size must be > 0".into());
        }
        if self.enrichment.locale.trim().is_empty() {
            return Err("enrichment.locale must not be empty".into());
        }
        if self.paging.default_limit == 0 {
            return Err("paging.default_limit must be > 0".into());
        }
        if self.paging.max_limit == 0 {
            return Err("paging.max_limit must be > 0".into());
        }
        if self.paging.default_limit > self.paging.max_limit {
            return Err("paging.default_limit must be <= paging.max_limit".into());
        }
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(format!("logging.level must be one of {valid_levels:?}"));
        }
        Ok(())
    }

    /// Applies command-line overrides and re-validates the result.
    pub fn apply_overrides(&mut self, locale: Option<&str>) -> Result<(), String> {
        if let Some(locale) = locale {
            self.enrichment.locale = locale.to_string();
        }
        self.validate()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StorageConfig {
    #[serde(default)]
    pub postgres: PostgresStorageConfig,
}

/// PostgreSQL connection settings of the OpenMRS database.
///
/// Either a full `url` or the individual parts; `url` wins when both are set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostgresStorageConfig {
    #[serde(default)]
    pub url: Option<String>,

    #[serde(default = "default_postgres_host")]
    pub host: String,

    #[serde(default = "default_postgres_port")]
    pub port: u16,

    #[serde(default = "default_postgres_user")]
    pub user: String,

    #[serde(default)]
    pub password: Option<String>,

    #[serde(default = "default_postgres_database")]
    pub database: String,

    /// Maximum number of pooled connections
    #[serde(default = "default_postgres_pool_size")]
    pub pool_size: u32,

    #[serde(default = "default_postgres_connect_timeout")]
    pub connect_timeout_ms: u64,

    #[serde(default)]
    pub idle_timeout_ms: Option<u64>,

    /// Shown in `pg_stat_activity` on the OpenMRS database server.
    #[serde(default = "default_application_name")]
    pub application_name: String,
}

fn default_postgres_host() -> String {
    "localhost".into()
}
fn default_postgres_port() -> u16 {
    5432
}
fn default_postgres_user() -> String {
    "openmrs".into()
}
fn default_postgres_database() -> String {
    "openmrs".into()
}
fn default_postgres_pool_size() -> u32 {
    10
}
fn default_postgres_connect_timeout() -> u64 {
    5000
}
fn default_application_name() -> String {
    "omrs-cli".into()
}

impl Default for PostgresStorageConfig {
    fn default() -> Self {
        Self {
            url: None,
            host: default_postgres_host(),
            port: default_postgres_port(),
            user: default_postgres_user(),
            password: None,
            database: default_postgres_database(),
            pool_size: default_postgres_pool_size(),
            connect_timeout_ms: default_postgres_connect_timeout(),
            idle_timeout_ms: None,
            application_name: default_application_name(),
        }
    }
}

impl PostgresStorageConfig {
    /// Returns `url` when set, otherwise builds one from the parts.
    pub fn connection_url(&self) -> String {
        if let Some(ref url) = self.url {
            return url.clone();
        }

        let password_part = self
            .password
            .as_ref()
            .map(|p| format!(":{p}"))
            .unwrap_or_default();

        format!(
            "postgres://{}{}@{}:{}/{}",
            self.user, password_part, self.host, self.port, self.database
        )
    }

    /// The connection URL with its password masked, for display.
    pub fn display_url(&self) -> String {
        mask_password(&self.connection_url())
    }

    pub fn to_postgres_config(&self) -> PostgresConfig {
        PostgresConfig::new(self.connection_url())
            .with_pool_size(self.pool_size)
            .with_connect_timeout_ms(self.connect_timeout_ms)
            .with_idle_timeout_ms(self.idle_timeout_ms)
            .with_application_name(&self.application_name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagingConfig {
    #[serde(default = "default_limit")]
    pub default_limit: u32,
    #[serde(default = "max_limit")]
    pub max_limit: u32,
}

fn default_limit() -> u32 {
    DEFAULT_LIMIT
}
fn max_limit() -> u32 {
    MAX_LIMIT
}

impl Default for PagingConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            max_limit: max_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}
fn default_log_level() -> String {
    "warn".into()
}
impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

pub mod loader {
    use super::AppConfig;
    use config::{Config, Environment, File};
    use std::path::{Path, PathBuf};

    pub const DEFAULT_CONFIG_FILE: &str = "omrs.toml";

    /// Loads the configuration: optional TOML file, then `OMRS__*` environment
    /// overrides, then validation.
    ///
    /// An explicitly given file must exist; the default one is optional.
    pub fn load_config(path: Option<&Path>) -> Result<AppConfig, String> {
        let mut builder = Config::builder();
        match path {
            Some(p) => {
                if !p.exists() {
                    return Err(format!("config file not found: {}", p.display()));
                }
                builder = builder.add_source(File::from(p.to_path_buf()));
            }
            None => {
                let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    builder = builder.add_source(File::from(default_path));
                }
            }
        }
        // Environment variable overrides, e.g., OMRS__STORAGE__POSTGRES__POOL_SIZE=20
        builder = builder.add_source(
            Environment::with_prefix("OMRS")
                .try_parsing(true)
                .separator("__"),
        );
        let cfg = builder
            .build()
            .map_err(|e| format!("config build error: {e}"))?;
        let merged: AppConfig = cfg
            .try_deserialize()
            .map_err(|e| format!("config deserialize error: {e}"))?;
        merged.validate()?;
        Ok(merged)
    }
}
