//! Application configuration.
//!
//! ```toml
//! dialect = "postgres"
//! registry_path = "/etc/bizq/registry.toml"
//! log_filter = "bizq=debug"
//! max_page_size = 500
//!
//! [database]
//! url = "postgres://browser@localhost/catalog"
//! max_connections = 10
//! statement_timeout_ms = 5000
//! ```

use crate::error::{QueryError, QueryResult};
use crate::transpiler::Dialect;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

fn default_max_connections() -> u32 {
    5
}

fn default_log_filter() -> String {
    "info".to_string()
}

/// Connection pool settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Per-statement timeout; unset means wait for the store.
    pub statement_timeout_ms: Option<u64>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: default_max_connections(),
            statement_timeout_ms: None,
        }
    }
}

impl DatabaseConfig {
    pub fn statement_timeout(&self) -> Option<Duration> {
        self.statement_timeout_ms.filter(|ms| *ms > 0).map(Duration::from_millis)
    }
}

/// Top-level configuration for the `bizq` binary and embedding services.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    /// Dialect to compile for when no database URL decides it.
    pub dialect: Option<Dialect>,
    pub registry_path: Option<PathBuf>,
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
    /// Upper bound on client page sizes.
    pub max_page_size: Option<u64>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            dialect: None,
            registry_path: None,
            log_filter: default_log_filter(),
            max_page_size: None,
        }
    }
}

impl AppConfig {
    pub fn builder() -> AppConfigBuilder {
        AppConfigBuilder::default()
    }

    /// `<config dir>/bizq/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("bizq").join("config.toml"))
    }

    pub fn from_toml_str(content: &str) -> QueryResult<Self> {
        toml::from_str(content).map_err(|e| QueryError::Config(format!("Failed to parse config: {}", e)))
    }

    pub fn load(path: impl AsRef<Path>) -> QueryResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| QueryError::Config(format!("Failed to read config {}: {}", path.display(), e)))?;
        let config = Self::from_toml_str(&content)?;
        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Load `path`, or the default location when `path` is `None`.
    ///
    /// A missing default file yields the defaults; an explicitly named file
    /// must exist.
    pub fn load_or_default(path: Option<&Path>) -> QueryResult<Self> {
        match path {
            Some(path) => Self::load(path),
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::load(path),
                _ => Ok(Self::default()),
            },
        }
    }

    /// Dialect from the explicit setting, else from the database URL,
    /// else the default.
    pub fn resolved_dialect(&self) -> QueryResult<Dialect> {
        if let Some(dialect) = self.dialect {
            return Ok(dialect);
        }
        match &self.database.url {
            Some(url) => Dialect::from_url(url),
            None => Ok(Dialect::default()),
        }
    }
}

/// Builder for [`AppConfig`].
#[derive(Debug, Default)]
pub struct AppConfigBuilder {
    config: AppConfig,
}

impl AppConfigBuilder {
    pub fn database(mut self, url: impl Into<String>) -> Self {
        self.config.database.url = Some(url.into());
        self
    }

    pub fn max_connections(mut self, n: u32) -> Self {
        self.config.database.max_connections = n;
        self
    }

    pub fn statement_timeout_ms(mut self, ms: u64) -> Self {
        self.config.database.statement_timeout_ms = Some(ms);
        self
    }

    pub fn dialect(mut self, dialect: Dialect) -> Self {
        self.config.dialect = Some(dialect);
        self
    }

    pub fn registry(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.registry_path = Some(path.into());
        self
    }

    pub fn log_filter(mut self, filter: impl Into<String>) -> Self {
        self.config.log_filter = filter.into();
        self
    }

    pub fn max_page_size(mut self, n: u64) -> Self {
        self.config.max_page_size = Some(n);
        self
    }

    pub fn build(self) -> AppConfig {
        self.config
    }
}
