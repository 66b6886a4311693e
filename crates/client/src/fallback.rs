//! Offline placeholder responses.

use bytes::Bytes;
use reqwest::StatusCode;
use serde_json::{Map, Value};

use crate::classify::RoutingClass;
use crate::request::Response;
use holdfast_core::FallbackConfig;

const JSON: &str = "application/json";
const HTML: &str = "text/html; charset=utf-8";

const READ_MESSAGE: &str = "You are offline. Showing last known data (if previously loaded).";
const WRITE_MESSAGE: &str = "You are offline. The action was not applied; try again once you reconnect.";

/// Builds the response returned when neither the store nor the network can answer.
///
/// Payloads are rendered once at construction, so every call for a class
/// returns the same bytes.
#[derive(Debug, Clone)]
pub struct Synthesizer {
    api_read: Bytes,
    api_write: Bytes,
    navigation: Bytes,
}

impl Synthesizer {
    pub fn new(config: &FallbackConfig) -> Self {
        Self {
            api_read: Bytes::from(api_read_payload(config).to_string()),
            api_write: Bytes::from(api_write_payload(config).to_string()),
            navigation: Bytes::from(config.navigation_html.clone()),
        }
    }

    pub fn synthesize(&self, class: RoutingClass) -> Response {
        match class {
            RoutingClass::RemoteApiRead => Response::synthesized(StatusCode::OK, Some(JSON), self.api_read.clone()),
            RoutingClass::RemoteApiWrite => {
                Response::synthesized(StatusCode::SERVICE_UNAVAILABLE, Some(JSON), self.api_write.clone())
            }
            RoutingClass::Navigation => Response::synthesized(StatusCode::OK, Some(HTML), self.navigation.clone()),
            RoutingClass::StaticResource => Response::synthesized(StatusCode::SERVICE_UNAVAILABLE, None, Bytes::new()),
        }
    }
}

fn object(template: &Value) -> Map<String, Value> {
    match template {
        Value::Object(map) => map.clone(),
        _ => Map::new(),
    }
}

fn fill_missing(map: &mut Map<String, Value>, key: &str, value: Value) {
    match map.get(key) {
        None | Some(Value::Null) => {
            map.insert(key.to_string(), value);
        }
        Some(_) => {}
    }
}

fn api_read_payload(config: &FallbackConfig) -> Value {
    let mut map = object(&config.api_read);
    map.insert("offline".into(), Value::Bool(true));
    fill_missing(&mut map, "status", Value::from("offline"));
    fill_missing(&mut map, "message", Value::from(READ_MESSAGE));
    for field in &config.list_fields {
        if !matches!(map.get(field), Some(Value::Array(_))) {
            map.insert(field.clone(), Value::Array(Vec::new()));
        }
    }
    Value::Object(map)
}

fn api_write_payload(config: &FallbackConfig) -> Value {
    let mut map = object(&config.api_write);
    map.insert("offline".into(), Value::Bool(true));
    map.insert("status".into(), Value::from("offline"));
    map.insert("retryable".into(), Value::Bool(true));
    fill_missing(&mut map, "message", Value::from(WRITE_MESSAGE));
    Value::Object(map)
}
