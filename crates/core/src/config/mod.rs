//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (CHARTER_*)
//! 2. TOML config file (if CHARTER_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::reader::ReaderOptions;
use crate::worker::WorkerConfig;

mod validation;

pub use validation::ConfigError;

/// Resources stored in the static cache generation at install time.
pub const DEFAULT_MANIFEST: &[&str] = &[
    "/",
    "/index.html",
    "/styles/main.css",
    "/js/app.js",
    "/js/search.js",
    "/js/pwa.js",
    "/manifest.json",
    "/data/constitution.json",
];

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (CHARTER_*)
/// 2. TOML config file (if CHARTER_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Origin the reader is served from. Only same-origin requests are cached.
    ///
    /// Set via CHARTER_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Path of the document JSON, relative to the origin.
    ///
    /// Set via CHARTER_DOCUMENT_PATH environment variable.
    #[serde(default = "default_document_path")]
    pub document_path: String,

    /// Local document JSON read instead of fetching `document_path`.
    ///
    /// Set via CHARTER_DOCUMENT_FILE environment variable.
    #[serde(default)]
    pub document_file: Option<PathBuf>,

    /// Path to SQLite cache database.
    ///
    /// Set via CHARTER_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Prefix shared by both cache generation names.
    #[serde(default = "default_cache_prefix")]
    pub cache_prefix: String,

    /// Version tag of the current cache generation.
    ///
    /// Bumping it makes the next activation purge the previous generations.
    #[serde(default = "default_cache_version")]
    pub cache_version: String,

    /// Same-origin paths cached verbatim at install.
    #[serde(default = "default_manifest")]
    pub manifest: Vec<String>,

    /// User-Agent string for HTTP requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// HTTP request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum bytes to fetch per request.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Quiet period before a typed query fires.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Number of ranked hits shown per search.
    #[serde(default = "default_max_results")]
    pub max_results: usize,

    /// Excerpt window in characters.
    #[serde(default = "default_excerpt_length")]
    pub excerpt_length: usize,
}

fn default_origin() -> String {
    "http://localhost:8080".into()
}

fn default_document_path() -> String {
    "/data/constitution.json".into()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./charter-cache.sqlite")
}

fn default_cache_prefix() -> String {
    "us-constitution".into()
}

fn default_cache_version() -> String {
    "v1".into()
}

fn default_manifest() -> Vec<String> {
    DEFAULT_MANIFEST.iter().map(|p| p.to_string()).collect()
}

fn default_user_agent() -> String {
    "charter/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_debounce_ms() -> u64 {
    300
}

fn default_max_results() -> usize {
    10
}

fn default_excerpt_length() -> usize {
    150
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            origin: default_origin(),
            document_path: default_document_path(),
            document_file: None,
            db_path: default_db_path(),
            cache_prefix: default_cache_prefix(),
            cache_version: default_cache_version(),
            manifest: default_manifest(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            max_bytes: default_max_bytes(),
            debounce_ms: default_debounce_ms(),
            max_results: default_max_results(),
            excerpt_length: default_excerpt_length(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Debounce quiet period as Duration.
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Name of the versioned static cache generation.
    pub fn static_cache_name(&self) -> String {
        format!("{}-{}", self.cache_prefix, self.cache_version)
    }

    /// Name of the runtime (dynamic) cache generation.
    pub fn dynamic_cache_name(&self) -> String {
        format!("{}-dynamic-{}", self.cache_prefix, self.cache_version)
    }

    /// Parsed origin. Validated configs never fail here.
    pub fn origin_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.origin)
            .map_err(|e| ConfigError::Invalid { field: "origin".into(), reason: e.to_string() })
    }

    /// Absolute URL of the document JSON.
    pub fn document_url(&self) -> Result<Url, ConfigError> {
        self.origin_url()?
            .join(&self.document_path)
            .map_err(|e| ConfigError::Invalid { field: "document_path".into(), reason: e.to_string() })
    }

    /// Worker settings derived from this configuration.
    pub fn worker_config(&self) -> Result<WorkerConfig, ConfigError> {
        Ok(WorkerConfig {
            origin: self.origin_url()?,
            static_cache: self.static_cache_name(),
            dynamic_cache: self.dynamic_cache_name(),
            manifest: self.manifest.clone(),
            offline_page: "/index.html".into(),
        })
    }

    /// Presentation settings for the reader controller.
    pub fn reader_options(&self) -> ReaderOptions {
        ReaderOptions { max_results: self.max_results, excerpt_length: self.excerpt_length }
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `CHARTER_`
    /// 2. TOML file from `CHARTER_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("CHARTER_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("CHARTER_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.origin, "http://localhost:8080");
        assert_eq!(config.document_path, "/data/constitution.json");
        assert_eq!(config.db_path, PathBuf::from("./charter-cache.sqlite"));
        assert_eq!(config.manifest.len(), DEFAULT_MANIFEST.len());
        assert_eq!(config.debounce_ms, 300);
        assert_eq!(config.max_results, 10);
        assert_eq!(config.excerpt_length, 150);
    }

    #[test]
    fn test_cache_names() {
        let config = AppConfig::default();
        assert_eq!(config.static_cache_name(), "us-constitution-v1");
        assert_eq!(config.dynamic_cache_name(), "us-constitution-dynamic-v1");

        let bumped = AppConfig { cache_version: "v2".into(), ..Default::default() };
        assert_eq!(bumped.static_cache_name(), "us-constitution-v2");
    }

    #[test]
    fn test_document_url() {
        let config = AppConfig::default();
        assert_eq!(config.document_url().unwrap().as_str(), "http://localhost:8080/data/constitution.json");
    }

    #[test]
    fn test_worker_config() {
        let worker = AppConfig::default().worker_config().unwrap();
        assert_eq!(worker.static_cache, "us-constitution-v1");
        assert_eq!(worker.offline_page, "/index.html");
        assert!(worker.manifest.iter().any(|p| p == "/data/constitution.json"));
    }

    #[test]
    fn test_durations() {
        let config = AppConfig::default();
        assert_eq!(config.timeout(), Duration::from_millis(20_000));
        assert_eq!(config.debounce(), Duration::from_millis(300));
    }

    #[test]
    fn test_load_env_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file("charter.toml", "cache_version = \"v7\"\nmax_results = 5\n")?;
            jail.set_env("CHARTER_CONFIG_FILE", "charter.toml");
            jail.set_env("CHARTER_MAX_RESULTS", "3");

            let config = AppConfig::load().expect("config loads");
            assert_eq!(config.cache_version, "v7");
            assert_eq!(config.max_results, 3);
            Ok(())
        });
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        Jail::expect_with(|jail| {
            jail.set_env("CHARTER_ORIGIN", "ftp://example.com");
            assert!(matches!(AppConfig::load(), Err(ConfigError::Invalid { field, .. }) if field == "origin"));
            Ok(())
        });
    }
}
