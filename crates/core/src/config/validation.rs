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

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

fn require_absolute_http(field: &str, value: &str) -> Result<url::Url, ConfigError> {
    let parsed = url::Url::parse(value).map_err(|e| invalid(field, e.to_string()))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        scheme => Err(invalid(field, format!("unsupported scheme: {scheme}"))),
    }
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `version`, `user_agent`, `entry_page` or any static asset is empty
    /// - `origin` or `api_base` is not an absolute http(s) URL
    /// - an `api_cacheable_patterns` entry is not a valid regex
    /// - `page_extension` does not start with '.'
    /// - a fallback JSON template is not an object
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - `timeout_ms` is set to less than 100ms
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version.trim().is_empty() {
            return Err(invalid("version", "must not be empty"));
        }

        require_absolute_http("origin", &self.origin)?;
        require_absolute_http("api_base", &self.api_base)?;

        for pattern in &self.api_cacheable_patterns {
            regex::Regex::new(pattern).map_err(|e| invalid("api_cacheable_patterns", e.to_string()))?;
        }

        if let Some(index) = self.static_assets.iter().position(|a| a.trim().is_empty()) {
            return Err(invalid("static_assets", format!("entry {index} is empty")));
        }

        if !self.page_extension.starts_with('.') || self.page_extension.len() < 2 {
            return Err(invalid("page_extension", "must look like '.html'"));
        }

        if self.entry_page.trim().is_empty() {
            return Err(invalid("entry_page", "must not be empty"));
        }

        if !self.fallback.api_read.is_object() {
            return Err(invalid("fallback.api_read", "must be a JSON object"));
        }
        if !self.fallback.api_write.is_object() {
            return Err(invalid("fallback.api_write", "must be a JSON object"));
        }

        if self.max_bytes == 0 {
            return Err(invalid("max_bytes", "must be greater than 0"));
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(invalid("max_bytes", "must not exceed 50MB"));
        }

        if let Some(timeout_ms) = self.timeout_ms
            && timeout_ms < 100
        {
            return Err(invalid("timeout_ms", "must be at least 100ms"));
        }

        if self.user_agent.is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }

        if self.static_assets.is_empty() {
            tracing::warn!("static_assets is empty; install will create an empty generation");
        }

        Ok(())
    }
}
