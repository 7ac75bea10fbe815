//! HTTP utilities for Direktiv REST and event-stream calls

use super::error::{ApiError, Result};
use reqwest::{Client, Method, RequestBuilder, Response};
use std::time::Duration;

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Header carrying the API key
pub const APIKEY_HEADER: &str = "apikey";

/// Sanitize response body for logging
/// Truncates long responses and drops control characters
pub(crate) fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.len() > MAX_LOG_BODY_LENGTH {
        let mut end = MAX_LOG_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... [truncated, {} bytes total]", &body[..end], body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| c.is_control(), "")
}

/// HTTP client wrapper for Direktiv API calls
#[derive(Clone)]
pub struct ApiHttpClient {
    client: Client,
    apikey: Option<String>,
    timeout: Duration,
}

impl std::fmt::Debug for ApiHttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiHttpClient")
            .field("apikey", &self.apikey.as_ref().map(|_| "***"))
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl ApiHttpClient {
    /// Create a new HTTP client
    ///
    /// The timeout applies per request; event streams are exempt since they
    /// stay open indefinitely.
    pub fn new(apikey: Option<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("direktiv-hooks/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            apikey,
            timeout,
        })
    }

    fn with_apikey(&self, builder: RequestBuilder) -> RequestBuilder {
        match self.apikey.as_deref() {
            Some(key) => builder.header(APIKEY_HEADER, key),
            None => builder,
        }
    }

    /// Start a request with credentials and timeout applied
    pub fn request(&self, method: Method, url: &str) -> RequestBuilder {
        tracing::debug!("{} {}", method, url);
        self.with_apikey(self.client.request(method, url))
            .timeout(self.timeout)
    }

    /// Send a request and classify a non-success status as an error
    pub async fn send(&self, request: RequestBuilder, summary: &str) -> Result<Response> {
        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let err = ApiError::from_response(summary, response).await;
            // Security: Only log sanitized/truncated error text to avoid leaking sensitive data
            tracing::error!("API error: {} - {}", status, sanitize_for_log(&err.to_string()));
            return Err(err);
        }

        Ok(response)
    }

    /// Open a text/event-stream subscription
    ///
    /// Only the response head is awaited; the body is read by the caller.
    pub async fn open_stream(&self, url: &str) -> Result<Response> {
        tracing::debug!("SUBSCRIBE {}", url);

        let response = self
            .with_apikey(self.client.get(url))
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!("Event stream refused: {} {}", status, url);
            return Err(ApiError::from_stream_status(status));
        }

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_truncates_long_bodies() {
        let body = "x".repeat(500);
        let sanitized = sanitize_for_log(&body);
        assert!(sanitized.starts_with(&"x".repeat(MAX_LOG_BODY_LENGTH)));
        assert!(sanitized.ends_with("[truncated, 500 bytes total]"));
    }

    #[test]
    fn test_sanitize_strips_control_chars() {
        assert_eq!(sanitize_for_log("a\nb\tc"), "abc");
    }

    #[test]
    fn test_debug_masks_apikey() {
        let client = ApiHttpClient::new(Some("secret".into()), Duration::from_secs(5)).unwrap();
        let debug = format!("{:?}", client);
        assert!(!debug.contains("secret"));
    }
}
