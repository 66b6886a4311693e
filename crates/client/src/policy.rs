//! Store admission policy: fingerprints, API allow-list, persistability.

use regex::Regex;
use reqwest::StatusCode;
use reqwest::header::{ACCESS_CONTROL_ALLOW_ORIGIN, HeaderName};
use url::Url;

use crate::fetch::{FetchResponse, canonicalize, same_origin};
use crate::request::InterceptedRequest;
use holdfast_core::{AppConfig, Error, Fingerprint};

/// Rules deciding what identifies a request and what may be stored.
#[derive(Debug, Clone)]
pub struct CachePolicy {
    origin: Url,
    vary_headers: Vec<HeaderName>,
    api_patterns: Vec<Regex>,
    max_bytes: usize,
}

impl CachePolicy {
    pub fn new(origin: Url, vary_headers: Vec<HeaderName>, api_patterns: Vec<Regex>, max_bytes: usize) -> Self {
        Self { origin, vary_headers, api_patterns, max_bytes }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, Error> {
        let origin = canonicalize(&config.origin, None)?;
        let vary_headers = config
            .vary_headers
            .iter()
            .map(|name| {
                HeaderName::from_bytes(name.trim().to_ascii_lowercase().as_bytes())
                    .map_err(|e| Error::InvalidInput(format!("vary header {name}: {e}")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let api_patterns = config
            .api_cacheable_patterns
            .iter()
            .map(|p| Regex::new(p).map_err(|e| Error::InvalidInput(format!("api pattern {p}: {e}"))))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(origin, vary_headers, api_patterns, config.max_bytes))
    }

    pub fn origin(&self) -> &Url {
        &self.origin
    }

    /// Resolve an asset or page reference against the application origin.
    pub fn resolve(&self, reference: &str) -> Result<Url, Error> {
        Ok(canonicalize(reference, Some(&self.origin))?)
    }

    pub fn fingerprint(&self, request: &InterceptedRequest) -> Fingerprint {
        let vary: Vec<(String, String)> = self
            .vary_headers
            .iter()
            .filter_map(|name| {
                request
                    .headers
                    .get(name)
                    .and_then(|v| v.to_str().ok())
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        Fingerprint::compute(request.method.as_str(), request.url.as_str(), &vary)
    }

    /// Whether an API read may be served from and written to the store.
    pub fn api_cacheable(&self, url: &Url) -> bool {
        self.api_patterns.iter().any(|p| p.is_match(url.as_str()))
    }

    /// Check that a live response may become a snapshot.
    ///
    /// Returns [`Error::Unpersistable`] for non-read methods, statuses other
    /// than 200, bodies larger than `max_bytes`, and cross-origin responses
    /// the application origin cannot read.
    pub fn check_persistable(&self, request: &InterceptedRequest, response: &FetchResponse) -> Result<(), Error> {
        if !request.is_read() {
            return Err(Error::Unpersistable(format!("method {}", request.method)));
        }
        if response.status != StatusCode::OK {
            return Err(Error::Unpersistable(format!("status {}", response.status.as_u16())));
        }
        if response.bytes.len() > self.max_bytes {
            return Err(Error::Unpersistable(format!("{} bytes exceeds {}", response.bytes.len(), self.max_bytes)));
        }
        if !self.readable(response) {
            return Err(Error::Unpersistable(format!("opaque cross-origin response from {}", response.final_url)));
        }
        Ok(())
    }

    fn readable(&self, response: &FetchResponse) -> bool {
        if same_origin(&self.origin, &response.final_url) {
            return true;
        }
        let allowed = response
            .headers
            .get(ACCESS_CONTROL_ALLOW_ORIGIN)
            .and_then(|v| v.to_str().ok())
            .map(str::trim);
        match allowed {
            Some("*") => true,
            Some(value) => value.trim_end_matches('/') == self.origin.origin().ascii_serialization(),
            None => false,
        }
    }
}
