//! Request classification.
//!
//! Every request maps to exactly one [`RoutingClass`]; first match wins:
//!
//! 1. API base + read method -> `RemoteApiRead`
//! 2. API base + any other method -> `RemoteApiWrite`
//! 3. navigation flag, page extension, or site root -> `Navigation`
//! 4. everything else -> `StaticResource`

use reqwest::Method;
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

use crate::fetch::canonicalize;
use crate::request::is_read_method;
use holdfast_core::{AppConfig, Error};

/// Retrieval strategy selector. Recomputed per request, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingClass {
    RemoteApiRead,
    RemoteApiWrite,
    Navigation,
    StaticResource,
}

impl RoutingClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RemoteApiRead => "remote_api_read",
            Self::RemoteApiWrite => "remote_api_write",
            Self::Navigation => "navigation",
            Self::StaticResource => "static_resource",
        }
    }

    pub fn is_api(&self) -> bool {
        matches!(self, Self::RemoteApiRead | Self::RemoteApiWrite)
    }
}

impl fmt::Display for RoutingClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pure request classifier.
#[derive(Debug, Clone)]
pub struct Classifier {
    api_base: String,
    page_extension: String,
}

impl Classifier {
    pub fn new(api_base: &Url, page_extension: impl Into<String>) -> Self {
        Self { api_base: api_base.as_str().to_string(), page_extension: page_extension.into() }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, Error> {
        let api_base = canonicalize(&config.api_base, None)?;
        Ok(Self::new(&api_base, config.page_extension.clone()))
    }

    pub fn classify(&self, method: &Method, url: &Url, navigate: bool) -> RoutingClass {
        if self.targets_api(url) {
            return if is_read_method(method) { RoutingClass::RemoteApiRead } else { RoutingClass::RemoteApiWrite };
        }

        if navigate || url.path().ends_with(&self.page_extension) || url.path() == "/" {
            return RoutingClass::Navigation;
        }

        RoutingClass::StaticResource
    }

    /// Prefix match on the canonical URL that stops at a path, query or end
    /// boundary, so `/api` covers `/api?op=x` and `/api/x` but not `/apix`.
    pub fn targets_api(&self, url: &Url) -> bool {
        let Some(rest) = url.as_str().strip_prefix(self.api_base.as_str()) else {
            return false;
        };
        self.api_base.ends_with('/') || rest.is_empty() || rest.starts_with('/') || rest.starts_with('?')
    }
}
