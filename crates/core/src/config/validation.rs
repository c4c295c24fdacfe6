//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

const MAX_PAGE_LIMIT: u32 = 1000;
const MAX_RECENCY_WINDOW_SECS: u64 = 7 * 24 * 3600;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `page_limit` is 0 or exceeds 1000
    /// - `recency_window_secs` is 0 or exceeds 7 days
    /// - `deadline_ms` is less than 100ms or exceeds 5 minutes
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.page_limit == 0 {
            return Err(ConfigError::Invalid { field: "page_limit".into(), reason: "must be greater than 0".into() });
        }
        if self.page_limit > MAX_PAGE_LIMIT {
            return Err(ConfigError::Invalid { field: "page_limit".into(), reason: "must not exceed 1000".into() });
        }

        if self.recency_window_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "recency_window_secs".into(),
                reason: "must be greater than 0".into(),
            });
        }
        if self.recency_window_secs > MAX_RECENCY_WINDOW_SECS {
            return Err(ConfigError::Invalid {
                field: "recency_window_secs".into(),
                reason: "must not exceed 7 days".into(),
            });
        }

        if self.deadline_ms < 100 {
            return Err(ConfigError::Invalid { field: "deadline_ms".into(), reason: "must be at least 100ms".into() });
        }
        if self.deadline_ms > 300_000 {
            return Err(ConfigError::Invalid {
                field: "deadline_ms".into(),
                reason: "must not exceed 5 minutes (300000ms)".into(),
            });
        }

        if self.recency_window_secs < 60 {
            tracing::warn!(
                recency_window_secs = self.recency_window_secs,
                "recency window under a minute; reload will find little history"
            );
        }

        Ok(())
    }
}
