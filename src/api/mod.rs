//! Direktiv API plumbing
//!
//! This module provides the transport the resource layer is built on:
//! requests with credentials, the error taxonomy, and event-stream decoding.
//!
//! # Module Structure
//!
//! - [`client`] - Base URL handling and request helpers
//! - [`error`] - Error taxonomy for failed requests and streams
//! - [`http`] - HTTP wrapper around `reqwest`
//! - [`sse`] - `text/event-stream` decoding
//!
//! # Example
//!
//! ```no_run
//! use direktiv_hooks::api::ApiClient;
//! use direktiv_hooks::config::ClientConfig;
//!
//! # async fn example() -> Result<(), direktiv_hooks::api::ApiError> {
//! let client = ApiClient::new(&ClientConfig::new("http://localhost/api/")?)?;
//! let namespaces = client.get_json(&client.url("namespaces"), "list namespaces").await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod http;
pub mod sse;

pub use client::{sanitize_path, ApiClient};
pub use error::{ApiError, Result};
pub use sse::{EventStream, SseDecoder, SseEvent};
