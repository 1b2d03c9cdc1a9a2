//! HTTP transport backed by a blocking reqwest client

use std::fmt;

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::CONTENT_TYPE;
use serde_json::{json, Value};

use crate::config::{ClientConfig, ConfigError, ConfigResult};

use super::redact::redact_payload;
use super::{Headers, Reply, Transport, TransportError, TransportResult};

/// Transport speaking to the ArcadeDB HTTP API
pub struct HttpTransport {
    client: Client,
    config: ClientConfig,
}

impl HttpTransport {
    /// Build a transport from validated configuration
    pub fn new(config: ClientConfig) -> ConfigResult<Self> {
        config.validate()?;

        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Attach credentials, content type and per-request headers
    fn prepare(&self, request: RequestBuilder, headers: &Headers) -> RequestBuilder {
        let mut request = request
            .basic_auth(&self.config.username, Some(&self.config.password))
            .header(CONTENT_TYPE, self.config.content_type.as_str());
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }
        request
    }

    fn send(&self, request: RequestBuilder, headers: &Headers) -> TransportResult<Reply> {
        let response = self.prepare(request, headers).send().map_err(|e| {
            if e.is_connect() {
                TransportError::Unreachable(e.to_string())
            } else {
                TransportError::Interrupted(e.to_string())
            }
        })?;

        self.handle(response)
    }

    fn handle(&self, response: Response) -> TransportResult<Reply> {
        let status = response.status();
        let headers: Headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_lowercase(), v.to_string()))
            })
            .collect();
        let text = response
            .text()
            .map_err(|e| TransportError::Interrupted(e.to_string()))?;

        if status.is_client_error() || status.is_server_error() {
            let payload = error_payload(status.as_u16(), &text);
            tracing::error!(status = status.as_u16(), payload = %payload, "server returned an error");
            return Err(TransportError::Server(payload));
        }

        tracing::debug!(status = status.as_u16(), bytes = text.len(), "response received");
        Ok(Reply {
            result: decode_body(&text),
            headers,
        })
    }
}

impl Transport for HttpTransport {
    fn post(&self, endpoint: &str, payload: &Value, headers: &Headers) -> TransportResult<Reply> {
        let url = join_url(&self.config.base_url(), endpoint);
        tracing::info!(url = %url, payload = %redact_payload(payload), "posting request");

        let body = serde_json::to_vec(payload)
            .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;
        self.send(self.client.post(&url).body(body), headers)
    }

    fn get(&self, endpoint: &str, headers: &Headers) -> TransportResult<Reply> {
        let url = join_url(&self.config.base_url(), endpoint);
        tracing::info!(url = %url, "submitting get request");

        self.send(self.client.get(&url), headers)
    }
}

impl fmt::Display for HttpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.config)
    }
}

impl fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpTransport")
            .field("base_url", &self.config.base_url())
            .field("user", &self.config.username)
            .finish()
    }
}

/// Join the server root and an endpoint path with exactly one slash
pub fn join_url(base: &str, endpoint: &str) -> String {
    let endpoint = endpoint.strip_prefix('/').unwrap_or(endpoint);
    if base.ends_with('/') {
        format!("{}{}", base, endpoint)
    } else {
        format!("{}/{}", base, endpoint)
    }
}

/// Decode a success body into its result value.
///
/// The `result` member of a JSON object wins, then the whole JSON document,
/// then the raw text. An empty body is null.
pub fn decode_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(mut map)) => match map.remove("result") {
            Some(result) => result,
            None => Value::Object(map),
        },
        Ok(other) => other,
        Err(_) => Value::String(text.to_string()),
    }
}

fn error_payload(status: u16, text: &str) -> Value {
    match serde_json::from_str::<Value>(text) {
        Ok(payload @ Value::Object(_)) => payload,
        _ => {
            let detail = if text.is_empty() {
                "No additional details"
            } else {
                text
            };
            json!({
                "error": format!("HTTP {} Error", status),
                "detail": detail,
                "exception": "HTTPException",
            })
        }
    }
}
