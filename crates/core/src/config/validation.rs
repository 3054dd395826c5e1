//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `origin` is not an http(s) URL
    /// - `document_path` or a manifest entry is not an absolute path
    /// - `cache_prefix` or `cache_version` is empty
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - `max_results` is 0, `excerpt_length` is below 3, `debounce_ms` exceeds 10s
    /// - `user_agent` is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        let origin = self.origin_url()?;
        if !matches!(origin.scheme(), "http" | "https") {
            return Err(invalid("origin", "must use http or https"));
        }

        if !self.document_path.starts_with('/') {
            return Err(invalid("document_path", "must start with '/'"));
        }

        if self.cache_prefix.is_empty() {
            return Err(invalid("cache_prefix", "must not be empty"));
        }
        if self.cache_version.is_empty() {
            return Err(invalid("cache_version", "must not be empty"));
        }

        if let Some(entry) = self.manifest.iter().find(|p| !p.starts_with('/')) {
            return Err(ConfigError::Invalid {
                field: "manifest".into(),
                reason: format!("entry '{entry}' must start with '/'"),
            });
        }

        if self.timeout_ms < 100 {
            return Err(invalid("timeout_ms", "must be at least 100ms"));
        }
        if self.timeout_ms > 300_000 {
            return Err(invalid("timeout_ms", "must not exceed 5 minutes (300000ms)"));
        }

        if self.max_bytes == 0 {
            return Err(invalid("max_bytes", "must be greater than 0"));
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(invalid("max_bytes", "must not exceed 50MB"));
        }

        if self.max_results == 0 {
            return Err(invalid("max_results", "must be greater than 0"));
        }
        if self.excerpt_length < 3 {
            return Err(invalid("excerpt_length", "must be at least 3"));
        }
        if self.debounce_ms > 10_000 {
            return Err(invalid("debounce_ms", "must not exceed 10 seconds"));
        }

        if self.user_agent.is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }

        if !self.manifest.iter().any(|p| p == &self.document_path) {
            tracing::warn!(
                document_path = %self.document_path,
                "document_path is not in the cache manifest; the reader will fall back \
                 to the built-in document when offline"
            );
        }

        Ok(())
    }
}
