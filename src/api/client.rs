//! Direktiv Client
//!
//! Main client for the Direktiv API, combining the HTTP wrapper with the
//! base URL and credentials from [`ClientConfig`].

use super::error::{ApiError, Result};
use super::http::ApiHttpClient;
use super::sse::EventStream;
use crate::config::ClientConfig;
use reqwest::{Method, RequestBuilder, Response};
use serde_json::Value;

/// Main Direktiv API client
#[derive(Debug, Clone)]
pub struct ApiClient {
    pub http: ApiHttpClient,
    base_url: String,
}

impl ApiClient {
    /// Create a new client from explicit configuration
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let http = ApiHttpClient::new(config.apikey.clone(), config.timeout)?;

        let mut base_url = config.base_url.to_string();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }

        Ok(Self { http, base_url })
    }

    /// Base URL of the API, always ending in `/`
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build an API URL from a relative path
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path.trim_start_matches('/'))
    }

    // =========================================================================
    // Namespace API helpers
    // =========================================================================

    /// Build a namespace-scoped URL, e.g. `namespace_url("ns", "/instances")`
    pub fn namespace_url(&self, namespace: &str, rest: &str) -> String {
        self.url(&format!("namespaces/{}{}", namespace, rest))
    }

    /// Build a filesystem tree URL for a node path
    pub fn tree_url(&self, namespace: &str, path: &str) -> String {
        self.namespace_url(namespace, &format!("/tree{}", sanitize_path(path)))
    }

    // =========================================================================
    // Functions (services) API helpers
    // =========================================================================

    /// Build a functions API URL
    pub fn functions_url(&self, rest: &str) -> String {
        self.url(&format!("functions/{}", rest.trim_start_matches('/')))
    }

    // =========================================================================
    // Transport
    // =========================================================================

    /// Start a request against a full URL
    pub fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.http.request(method, url)
    }

    /// Send a request, mapping failures with `summary`
    pub async fn send(&self, request: RequestBuilder, summary: &str) -> Result<Response> {
        self.http.send(request, summary).await
    }

    /// GET a JSON document
    pub async fn get_json(&self, url: &str, summary: &str) -> Result<Value> {
        let response = self.send(self.request(Method::GET, url), summary).await?;
        let body = response.text().await?;
        if body.is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&body)?)
    }

    /// Open an event stream at `url`
    pub async fn subscribe(&self, url: &str) -> Result<EventStream> {
        let response = self.http.open_stream(url).await?;
        Ok(EventStream::new(response))
    }
}

/// Normalize a node path to `/a/b` form; the root is the empty string
pub fn sanitize_path(path: &str) -> String {
    let trimmed = path.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{}", trimmed)
    }
}

/// Pull a value out of a JSON document, failing when it is missing
pub(crate) fn field(value: &Value, key: &str) -> Result<Value> {
    value
        .get(key)
        .cloned()
        .ok_or_else(|| ApiError::UnexpectedResponse(format!("missing '{}' field", key)))
}
