//! Intercepted requests and the responses the engine hands back.

use bytes::Bytes;
use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::fetch::FetchResponse;
use holdfast_core::StoredSnapshot;

/// Methods whose responses may be stored.
pub fn is_read_method(method: &Method) -> bool {
    *method == Method::GET || *method == Method::HEAD
}

/// A request issued by the hosting application.
#[derive(Debug, Clone)]
pub struct InterceptedRequest {
    pub method: Method,
    /// Absolute, canonical URL.
    pub url: Url,
    /// Set for top-level page loads.
    pub navigate: bool,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

impl InterceptedRequest {
    pub fn new(method: Method, url: Url) -> Self {
        Self { method, url, navigate: false, headers: HeaderMap::new(), body: None }
    }

    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    /// A top-level page load.
    pub fn navigation(url: Url) -> Self {
        Self { navigate: true, ..Self::get(url) }
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn is_read(&self) -> bool {
        is_read_method(&self.method)
    }
}

/// Where a response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    /// Live network response
    Network,
    /// Stored snapshot
    Store,
    /// Synthesized offline placeholder
    Fallback,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Store => "store",
            Self::Fallback => "fallback",
        }
    }
}

/// The response returned to the hosting application.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub source: Source,
}

impl Response {
    pub fn from_live(live: FetchResponse) -> Self {
        Self { status: live.status, headers: live.headers, body: live.bytes, source: Source::Network }
    }

    /// Rebuild a response from a snapshot. Headers that no longer parse are dropped.
    pub fn from_snapshot(snapshot: StoredSnapshot) -> Self {
        let mut headers = HeaderMap::new();
        for (name, value) in &snapshot.headers {
            if let (Ok(name), Ok(value)) = (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(value)) {
                headers.append(name, value);
            }
        }
        let status = StatusCode::from_u16(snapshot.status).unwrap_or(StatusCode::OK);
        Self { status, headers, body: Bytes::from(snapshot.body), source: Source::Store }
    }

    pub fn synthesized(status: StatusCode, content_type: Option<&'static str>, body: impl Into<Bytes>) -> Self {
        let mut headers = HeaderMap::new();
        if let Some(content_type) = content_type {
            headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
        }
        Self { status, headers, body: body.into(), source: Source::Fallback }
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok())
    }

    /// Body parsed as JSON, if it is JSON.
    pub fn json(&self) -> Option<serde_json::Value> {
        serde_json::from_slice(&self.body).ok()
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}
