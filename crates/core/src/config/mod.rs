//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (SWCACHE_*)
//! 2. TOML config file (if SWCACHE_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (SWCACHE_*)
/// 2. TOML config file (if SWCACHE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the SQLite database backing every named store.
    ///
    /// Set via SWCACHE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Origin that relative request URLs are resolved against.
    ///
    /// Set via SWCACHE_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via SWCACHE_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum bytes to fetch per request.
    ///
    /// Set via SWCACHE_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// HTTP request timeout in milliseconds, shared by every strategy.
    ///
    /// Set via SWCACHE_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Logical prefix of every store name.
    #[serde(default = "default_store_prefix")]
    pub store_prefix: String,

    /// Deployment generation suffixed onto every store name.
    ///
    /// Bumping it makes the next activate delete the previous generation.
    #[serde(default = "default_version_tag")]
    pub version_tag: String,

    /// Path substrings that mark a request as an image.
    #[serde(default = "default_image_extensions")]
    pub image_extensions: Vec<String>,

    /// Host substrings of known image hosts (object storage, CDN).
    #[serde(default = "default_image_hosts")]
    pub image_hosts: Vec<String>,

    /// Path prefix that marks a request as an API call.
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,

    /// Maximum age of an API entry served as a network fallback.
    #[serde(default = "default_api_ttl_secs")]
    pub api_ttl_secs: u64,

    /// Number of entries the eviction sweeper keeps in the image store.
    #[serde(default = "default_image_capacity")]
    pub image_capacity: usize,

    /// Seconds between eviction sweeps.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    /// App shell assets fetched into the precache store at install.
    #[serde(default = "default_precache_urls")]
    pub precache_urls: Vec<String>,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./swcache.sqlite")
}

fn default_origin() -> String {
    "http://localhost:3000".into()
}

fn default_user_agent() -> String {
    "swcache/0.1".into()
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_store_prefix() -> String {
    "estate".into()
}

fn default_version_tag() -> String {
    "v1".into()
}

fn default_image_extensions() -> Vec<String> {
    [".jpg", ".jpeg", ".png", ".gif", ".webp", ".svg"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_image_hosts() -> Vec<String> {
    vec!["firebasestorage.googleapis.com".into(), "hubspotusercontent".into()]
}

fn default_api_prefix() -> String {
    "/api/".into()
}

fn default_api_ttl_secs() -> u64 {
    300
}

fn default_image_capacity() -> usize {
    100
}

fn default_sweep_interval_secs() -> u64 {
    60
}

fn default_precache_urls() -> Vec<String> {
    ["/", "/static/js/bundle.js", "/static/css/main.css", "/manifest.json"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            origin: default_origin(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: default_timeout_ms(),
            store_prefix: default_store_prefix(),
            version_tag: default_version_tag(),
            image_extensions: default_image_extensions(),
            image_hosts: default_image_hosts(),
            api_prefix: default_api_prefix(),
            api_ttl_secs: default_api_ttl_secs(),
            image_capacity: default_image_capacity(),
            sweep_interval_secs: default_sweep_interval_secs(),
            precache_urls: default_precache_urls(),
        }
    }
}

/// Names of the current generation's stores.
///
/// Together they form the allow-list that survives activate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreNames {
    /// Precache store, also used for stale-while-revalidate traffic.
    pub precache: String,
    /// Cache-first image store, bounded by the sweeper.
    pub images: String,
    /// Network-first API store.
    pub api: String,
}

impl StoreNames {
    pub fn new(prefix: &str, version_tag: &str) -> Self {
        Self {
            precache: format!("{prefix}-{version_tag}"),
            images: format!("{prefix}-images-{version_tag}"),
            api: format!("{prefix}-api-{version_tag}"),
        }
    }

    pub fn all(&self) -> [&str; 3] {
        [&self.precache, &self.images, &self.api]
    }

    /// Whether `name` belongs to the current generation.
    pub fn contains(&self, name: &str) -> bool {
        self.all().contains(&name)
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn api_ttl(&self) -> Duration {
        Duration::from_secs(self.api_ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    /// Store names for the configured prefix and version tag.
    pub fn store_names(&self) -> StoreNames {
        StoreNames::new(&self.store_prefix, &self.version_tag)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `SWCACHE_`
    /// 2. TOML file from `SWCACHE_CONFIG_FILE` (if set)
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

        if let Ok(config_path) = std::env::var("SWCACHE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("SWCACHE_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
