//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (SSLWATCH_*)
//! 2. TOML config file (if SSLWATCH_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::store::{Deadline, Page};
use crate::topology::TopologyPolicy;

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (SSLWATCH_*)
/// 2. TOML config file (if SSLWATCH_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the SQLite database.
    ///
    /// Set via SSLWATCH_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Page size for list operations.
    ///
    /// Set via SSLWATCH_PAGE_LIMIT environment variable.
    #[serde(default = "default_page_limit")]
    pub page_limit: u32,

    /// Page offset for list operations.
    ///
    /// Set via SSLWATCH_PAGE_OFFSET environment variable.
    #[serde(default)]
    pub page_offset: u32,

    /// How far back `reload` looks for recently updated domains, in seconds.
    ///
    /// Set via SSLWATCH_RECENCY_WINDOW_SECS environment variable.
    #[serde(default = "default_recency_window_secs")]
    pub recency_window_secs: u64,

    /// Deadline for one store call or unit of work, in milliseconds.
    ///
    /// Set via SSLWATCH_DEADLINE_MS environment variable.
    #[serde(default = "default_deadline_ms")]
    pub deadline_ms: u64,

    /// Whether a grade-only server difference counts as a topology change.
    ///
    /// Set via SSLWATCH_TOPOLOGY_COMPARES_GRADE environment variable.
    #[serde(default = "default_true")]
    pub topology_compares_grade: bool,

    /// Whether to warm the recency cache from the store at startup.
    ///
    /// Set via SSLWATCH_RELOAD_ON_START environment variable.
    #[serde(default = "default_true")]
    pub reload_on_start: bool,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./sslwatch.sqlite")
}

fn default_page_limit() -> u32 {
    5
}

fn default_recency_window_secs() -> u64 {
    3600
}

fn default_deadline_ms() -> u64 {
    5_000
}

fn default_true() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            page_limit: default_page_limit(),
            page_offset: 0,
            recency_window_secs: default_recency_window_secs(),
            deadline_ms: default_deadline_ms(),
            topology_compares_grade: true,
            reload_on_start: true,
        }
    }
}

impl AppConfig {
    pub fn page(&self) -> Page {
        Page { limit: self.page_limit, offset: self.page_offset }
    }

    pub fn recency_window(&self) -> Duration {
        Duration::from_secs(self.recency_window_secs)
    }

    /// A fresh deadline for one operation, starting now.
    pub fn deadline(&self) -> Deadline {
        Deadline::after(Duration::from_millis(self.deadline_ms))
    }

    pub fn topology_policy(&self) -> TopologyPolicy {
        TopologyPolicy { compare_grade: self.topology_compares_grade }
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_figment(Self::figment())
    }

    fn figment() -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("SSLWATCH_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment.merge(
            Env::prefixed("SSLWATCH_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        )
    }

    fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
