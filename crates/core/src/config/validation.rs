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
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `user_agent` is empty
    /// - `origin` is not an absolute http(s) URL
    /// - `store_prefix` or `version_tag` is empty or contains whitespace
    /// - an image extension does not start with `.`
    /// - `api_prefix` does not start with `/`
    /// - `api_ttl_secs`, `image_capacity` or `sweep_interval_secs` is 0
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_bytes == 0 {
            return Err(invalid("max_bytes", "must be greater than 0"));
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(invalid("max_bytes", "must not exceed 50MB"));
        }

        if self.timeout_ms < 100 {
            return Err(invalid("timeout_ms", "must be at least 100ms"));
        }
        if self.timeout_ms > 300_000 {
            return Err(invalid("timeout_ms", "must not exceed 5 minutes (300000ms)"));
        }

        if self.user_agent.is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }

        match url::Url::parse(&self.origin) {
            Ok(origin) if matches!(origin.scheme(), "http" | "https") => {}
            Ok(_) => return Err(invalid("origin", "scheme must be http or https")),
            Err(e) => return Err(invalid("origin", &e.to_string())),
        }

        for (field, value) in [("store_prefix", &self.store_prefix), ("version_tag", &self.version_tag)] {
            if value.is_empty() || value.chars().any(char::is_whitespace) {
                return Err(invalid(field, "must be non-empty and contain no whitespace"));
            }
        }

        if self.image_extensions.iter().any(|ext| !ext.starts_with('.') || ext.len() < 2) {
            return Err(invalid("image_extensions", "each extension must start with '.'"));
        }
        if self.image_hosts.iter().any(|host| host.trim().is_empty()) {
            return Err(invalid("image_hosts", "host patterns must not be empty"));
        }

        if !self.api_prefix.starts_with('/') {
            return Err(invalid("api_prefix", "must start with '/'"));
        }

        if self.api_ttl_secs == 0 {
            return Err(invalid("api_ttl_secs", "must be greater than 0"));
        }
        if self.image_capacity == 0 {
            return Err(invalid("image_capacity", "must be greater than 0"));
        }
        if self.sweep_interval_secs == 0 {
            return Err(invalid("sweep_interval_secs", "must be at least 1 second"));
        }

        if self.precache_urls.is_empty() {
            tracing::warn!("precache_urls is empty; install will only open stores");
        }

        Ok(())
    }
}
