//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (HOLDFAST_*)
//! 2. TOML config file (if HOLDFAST_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (HOLDFAST_*), nested keys split on `__`
/// 2. TOML config file (if HOLDFAST_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the SQLite snapshot store.
    ///
    /// Set via HOLDFAST_DB_PATH.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Deployment version. Labels the generation this deployment installs.
    ///
    /// Set via HOLDFAST_VERSION.
    #[serde(default = "default_version")]
    pub version: String,

    /// Origin of the hosting application. Relative asset paths resolve
    /// against it, and cross-origin responses are persisted only when CORS
    /// makes them readable to it.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Base URL of the remote API.
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Regular expressions over the canonical URL selecting the API reads
    /// that may be cached. API reads matching none go to the network only.
    #[serde(default = "default_api_cacheable_patterns")]
    pub api_cacheable_patterns: Vec<String>,

    /// Assets fetched into a new generation at install time.
    #[serde(default = "default_static_assets")]
    pub static_assets: Vec<String>,

    /// Path suffix that marks a page request.
    #[serde(default = "default_page_extension")]
    pub page_extension: String,

    /// Page served offline when a navigation has no snapshot of its own.
    #[serde(default = "default_entry_page")]
    pub entry_page: String,

    /// Request headers that take part in the request fingerprint.
    #[serde(default)]
    pub vary_headers: Vec<String>,

    /// User-Agent string for live requests.
    ///
    /// Set via HOLDFAST_USER_AGENT.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Largest response body written to the store. Bigger live responses
    /// are still served, just never persisted.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Transport timeout in milliseconds. Unset means no timeout.
    ///
    /// Set via HOLDFAST_TIMEOUT_MS.
    #[serde(default)]
    pub timeout_ms: Option<u64>,

    /// Offline placeholder templates.
    #[serde(default)]
    pub fallback: FallbackConfig,
}

/// Templates for synthesized offline responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FallbackConfig {
    /// JSON object returned for API reads with no snapshot and no network.
    #[serde(default = "default_api_read_template")]
    pub api_read: Value,

    /// JSON object returned (with status 503) for API writes with no network.
    #[serde(default = "default_api_write_template")]
    pub api_write: Value,

    /// Fields of the API read payload that must always be present as lists.
    #[serde(default = "default_list_fields")]
    pub list_fields: Vec<String>,

    /// HTML returned for navigations with nothing cached.
    #[serde(default = "default_navigation_html")]
    pub navigation_html: String,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./holdfast-store.sqlite")
}

fn default_version() -> String {
    "holdfast-v1".into()
}

fn default_origin() -> String {
    "http://localhost:8080".into()
}

fn default_api_base() -> String {
    "http://localhost:8080/api".into()
}

fn default_api_cacheable_patterns() -> Vec<String> {
    vec![r"[?&](op|operation)=getData(&|$)".into()]
}

fn default_static_assets() -> Vec<String> {
    vec!["/".into(), "/index.html".into(), "/login.html".into(), "/manifest.json".into()]
}

fn default_page_extension() -> String {
    ".html".into()
}

fn default_entry_page() -> String {
    "/index.html".into()
}

fn default_user_agent() -> String {
    "holdfast/0.1".into()
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_api_read_template() -> Value {
    json!({
        "status": "offline",
        "offline": true,
        "comments": [],
        "announcements": [],
        "message": "You are offline. Showing last known data (if previously loaded)."
    })
}

fn default_api_write_template() -> Value {
    json!({
        "status": "offline",
        "offline": true,
        "retryable": true,
        "message": "You are offline. The action was not applied; try again once you reconnect."
    })
}

fn default_list_fields() -> Vec<String> {
    vec!["comments".into(), "announcements".into()]
}

fn default_navigation_html() -> String {
    "<!doctype html><html><head><meta charset=\"utf-8\"><title>Offline</title></head>\
     <body><h1>Offline</h1><p>Please reconnect to continue.</p></body></html>"
        .into()
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            api_read: default_api_read_template(),
            api_write: default_api_write_template(),
            list_fields: default_list_fields(),
            navigation_html: default_navigation_html(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            version: default_version(),
            origin: default_origin(),
            api_base: default_api_base(),
            api_cacheable_patterns: default_api_cacheable_patterns(),
            static_assets: default_static_assets(),
            page_extension: default_page_extension(),
            entry_page: default_entry_page(),
            vary_headers: Vec::new(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: None,
            fallback: FallbackConfig::default(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest, if one is configured.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `HOLDFAST_`
    /// 2. TOML file from `HOLDFAST_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file or environment cannot be parsed, or
    /// if validation fails after loading.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_figment(Self::figment())
    }

    /// The layered figment `load` extracts from.
    pub fn figment() -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("HOLDFAST_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment.merge(
            Env::prefixed("HOLDFAST_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        )
    }

    /// Extract and validate a configuration from a prepared figment.
    pub fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
