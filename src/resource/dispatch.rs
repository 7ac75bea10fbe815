//! Mutation Dispatch
//!
//! A [`Mutation`] describes one write (or ad-hoc read) against the API:
//! method, target, optional `?op=` directive, body and the kind of reply the
//! caller expects. [`ApiClient::dispatch`] sends it and maps failures through
//! the error taxonomy; mutations always raise instead of storing errors.

use crate::api::{ApiClient, Result};
use crate::query::join_query;
use reqwest::header::CONTENT_TYPE;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Request body
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Empty,
    /// Serialized as `application/json`
    Json(Value),
    Text { content: String, content_type: String },
    Bytes { content: Vec<u8>, content_type: String },
}

/// What to read from a successful response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expect {
    Json,
    Text,
    Bytes,
    /// Ignore the body
    Void,
}

/// Successful response, shaped by [`Expect`]
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Empty bodies decode to `Null`
    Json(Value),
    Text {
        body: String,
        content_type: Option<String>,
    },
    Bytes(Vec<u8>),
    Empty,
}

impl Reply {
    pub fn into_json(self) -> Value {
        match self {
            Reply::Json(value) => value,
            Reply::Text { body, .. } => Value::String(body),
            Reply::Bytes(_) | Reply::Empty => Value::Null,
        }
    }
}

/// One request to dispatch
#[derive(Debug, Clone)]
pub struct Mutation {
    pub method: Method,
    pub url: String,
    pub op: Option<String>,
    pub params: Vec<String>,
    pub body: Body,
    /// Prefix for error messages, e.g. `create namespace`
    pub summary: String,
    pub expect: Expect,
}

impl Mutation {
    pub fn new(method: Method, url: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            op: None,
            params: Vec::new(),
            body: Body::Empty,
            summary: summary.into(),
            expect: Expect::Void,
        }
    }

    pub fn get(url: impl Into<String>, summary: impl Into<String>) -> Self {
        Self::new(Method::GET, url, summary).expect(Expect::Json)
    }

    pub fn put(url: impl Into<String>, summary: impl Into<String>) -> Self {
        Self::new(Method::PUT, url, summary)
    }

    pub fn post(url: impl Into<String>, summary: impl Into<String>) -> Self {
        Self::new(Method::POST, url, summary)
    }

    pub fn patch(url: impl Into<String>, summary: impl Into<String>) -> Self {
        Self::new(Method::PATCH, url, summary)
    }

    pub fn delete(url: impl Into<String>, summary: impl Into<String>) -> Self {
        Self::new(Method::DELETE, url, summary)
    }

    /// Set the `?op=` directive
    #[must_use]
    pub fn op(mut self, op: &str) -> Self {
        self.op = Some(op.to_string());
        self
    }

    /// Add a query token; the value must already be escaped
    #[must_use]
    pub fn param(mut self, param: impl Into<String>) -> Self {
        self.params.push(param.into());
        self
    }

    #[must_use]
    pub fn params(mut self, params: impl IntoIterator<Item = String>) -> Self {
        self.params.extend(params);
        self
    }

    #[must_use]
    pub fn json(mut self, body: Value) -> Self {
        self.body = Body::Json(body);
        self
    }

    #[must_use]
    pub fn text(mut self, content: impl Into<String>, content_type: &str) -> Self {
        self.body = Body::Text {
            content: content.into(),
            content_type: content_type.to_string(),
        };
        self
    }

    #[must_use]
    pub fn bytes(mut self, content: Vec<u8>, content_type: &str) -> Self {
        self.body = Body::Bytes {
            content,
            content_type: content_type.to_string(),
        };
        self
    }

    #[must_use]
    pub fn expect(mut self, expect: Expect) -> Self {
        self.expect = expect;
        self
    }

    /// Final URL with the op directive and query tokens
    pub fn target(&self) -> String {
        let base = match &self.op {
            Some(op) if self.url.contains('?') => format!("{}&op={}", self.url, op),
            Some(op) => format!("{}?op={}", self.url, op),
            None => self.url.clone(),
        };
        join_query(&base, &self.params)
    }
}

impl ApiClient {
    /// Send a mutation and read the reply it expects
    pub async fn dispatch(&self, mutation: Mutation) -> Result<Reply> {
        let target = mutation.target();
        tracing::debug!("dispatch: {} {} ({})", mutation.method, target, mutation.summary);

        let mut request = self.request(mutation.method.clone(), &target);
        request = match mutation.body {
            Body::Empty => request,
            Body::Json(value) => request.json(&value),
            Body::Text { content, content_type } => request.header(CONTENT_TYPE, content_type).body(content),
            Body::Bytes { content, content_type } => request.header(CONTENT_TYPE, content_type).body(content),
        };

        let response = self.send(request, &mutation.summary).await?;

        match mutation.expect {
            Expect::Void => Ok(Reply::Empty),
            Expect::Bytes => Ok(Reply::Bytes(response.bytes().await?.to_vec())),
            Expect::Text => {
                let content_type = response
                    .headers()
                    .get(CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok())
                    .map(|s| s.to_string());
                Ok(Reply::Text {
                    body: response.text().await?,
                    content_type,
                })
            },
            Expect::Json => {
                let body = response.text().await?;
                if body.trim().is_empty() {
                    return Ok(Reply::Json(Value::Null));
                }
                Ok(Reply::Json(serde_json::from_str(&body)?))
            },
        }
    }

    /// Dispatch and decode the JSON reply
    pub async fn dispatch_json<T: DeserializeOwned>(&self, mutation: Mutation) -> Result<T> {
        let value = self.dispatch(mutation.expect(Expect::Json)).await?.into_json();
        Ok(serde_json::from_value(value)?)
    }

    /// Dispatch and read the reply as text with its content type
    pub async fn dispatch_text(&self, mutation: Mutation) -> Result<(String, Option<String>)> {
        match self.dispatch(mutation.expect(Expect::Text)).await? {
            Reply::Text { body, content_type } => Ok((body, content_type)),
            other => Ok((other.into_json().to_string(), None)),
        }
    }

    /// Dispatch and ignore the reply body
    pub async fn dispatch_void(&self, mutation: Mutation) -> Result<()> {
        self.dispatch(mutation.expect(Expect::Void)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_with_op_and_params() {
        let m = Mutation::post("http://x/api/namespaces/ns/tree/wf", "save workflow")
            .op("save-workflow")
            .param("ref=latest");
        assert_eq!(m.target(), "http://x/api/namespaces/ns/tree/wf?op=save-workflow&ref=latest");
    }

    #[test]
    fn test_target_without_op() {
        let m = Mutation::delete("http://x/api/namespaces/ns", "delete namespace").param("recursive=true");
        assert_eq!(m.target(), "http://x/api/namespaces/ns?recursive=true");
        assert_eq!(Mutation::get("http://x/api/a", "a").target(), "http://x/api/a");
    }

    #[test]
    fn test_op_appends_to_existing_query() {
        let m = Mutation::get("http://x/api/a?x=1", "a").op("refs");
        assert_eq!(m.target(), "http://x/api/a?x=1&op=refs");
    }

    #[test]
    fn test_builders_set_body_and_expectation() {
        let m = Mutation::put("u", "s").text("a: b", "text/yaml").expect(Expect::Text);
        assert_eq!(
            m.body,
            Body::Text {
                content: "a: b".into(),
                content_type: "text/yaml".into()
            }
        );
        assert_eq!(m.expect, Expect::Text);
        assert_eq!(Mutation::get("u", "s").expect, Expect::Json);
        assert_eq!(Mutation::delete("u", "s").expect, Expect::Void);
    }

    #[test]
    fn test_reply_into_json() {
        assert_eq!(Reply::Empty.into_json(), Value::Null);
        let text = Reply::Text {
            body: "hi".into(),
            content_type: None,
        };
        assert_eq!(text.into_json(), Value::String("hi".into()));
    }
}
