//! JSON HTTP client for API-level checks.
//!
//! A thin layer over `reqwest`: every call returns an [`ApiResponse`] with
//! the status, headers and decoded JSON body. Non-2xx statuses are ordinary
//! responses (checks assert on them); only transport and decoding failures
//! are errors.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::config::{join_url, HarnessConfig, DEFAULT_API_TIMEOUT_MS};
use crate::result::HarnessResult;

/// A decoded HTTP response
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    /// HTTP status code
    pub status: u16,
    /// Response headers, names lowercased
    pub headers: HashMap<String, String>,
    /// JSON body; `Null` when empty, a JSON string when the body is not JSON
    pub body: Value,
}

impl ApiResponse {
    /// Header value by case-insensitive name
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Whether the response declares a JSON content type
    #[must_use]
    pub fn is_json(&self) -> bool {
        self.header("content-type")
            .is_some_and(|ct| ct.contains("application/json"))
    }

    /// Whether the status is 2xx
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Decode the body into a typed value
    ///
    /// # Errors
    ///
    /// Returns a JSON error if the body does not have the shape of `T`
    pub fn json<T: DeserializeOwned>(&self) -> HarnessResult<T> {
        Ok(serde_json::from_value(self.body.clone())?)
    }
}

/// HTTP client bound to one API base URL
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    client: reqwest::Client,
}

impl ApiClient {
    /// Create a new client pointing at the given base URL
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_timeout(base_url, Duration::from_millis(DEFAULT_API_TIMEOUT_MS))
    }

    /// Create a client for the configured API URL and timeout
    #[must_use]
    pub fn from_config(config: &HarnessConfig) -> Self {
        Self::with_timeout(config.api_url.clone(), config.api_timeout())
    }

    /// Create a client with a request timeout
    #[must_use]
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self::with_client(base_url, client)
    }

    /// Create a client with a custom reqwest client
    #[must_use]
    pub fn with_client(base_url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        }
    }

    /// Get the base URL
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `GET path`
    pub async fn get(&self, path: &str) -> HarnessResult<ApiResponse> {
        self.request(Method::GET, path, None, &[]).await
    }

    /// `POST path` with a JSON body
    pub async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> HarnessResult<ApiResponse> {
        let body = serde_json::to_value(body)?;
        self.request(Method::POST, path, Some(&body), &[]).await
    }

    /// `PUT path` with a JSON body
    pub async fn put<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> HarnessResult<ApiResponse> {
        let body = serde_json::to_value(body)?;
        self.request(Method::PUT, path, Some(&body), &[]).await
    }

    /// `DELETE path`
    pub async fn delete(&self, path: &str) -> HarnessResult<ApiResponse> {
        self.request(Method::DELETE, path, None, &[]).await
    }

    /// Send a request with optional JSON body and extra headers
    ///
    /// # Errors
    ///
    /// Returns an HTTP error on transport failure, or a JSON error if a
    /// response declared as JSON cannot be decoded
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        headers: &[(&str, &str)],
    ) -> HarnessResult<ApiResponse> {
        let url = join_url(&self.base_url, path);
        let start = Instant::now();

        let mut builder = self.client.request(method.clone(), &url);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let headers: HashMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let bytes = response.bytes().await?;

        debug!(
            method = %method,
            url = %url,
            status,
            bytes = bytes.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "api request"
        );

        let declared_json = headers
            .get("content-type")
            .is_some_and(|ct| ct.contains("application/json"));
        let body = decode_body(&bytes, declared_json)?;
        Ok(ApiResponse {
            status,
            headers,
            body,
        })
    }
}

fn decode_body(bytes: &[u8], declared_json: bool) -> HarnessResult<Value> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    if declared_json {
        return Ok(serde_json::from_slice(bytes)?);
    }
    Ok(serde_json::from_slice(bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned())))
}
