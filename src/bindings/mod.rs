//! Resource bindings
//!
//! Per-resource operations as `impl ApiClient` blocks. Reads return the
//! unwrapped payload; writes return `()` or the id the server assigned.
//! Every operation raises [`crate::api::ApiError`] on failure, prefixed with
//! a short summary such as `create namespace`.
//!
//! Live views of the same resources are bound through
//! [`crate::resource::ResourceChannel`] using the registry keys.

pub mod events;
pub mod instances;
pub mod mirror;
pub mod namespaces;
pub mod nodes;
pub mod registries;
pub mod secrets;
pub mod services;
pub mod variables;
pub mod workflow;

pub use instances::Instance;
pub use mirror::MirrorSettings;
pub use nodes::NodeKind;
pub use services::{ServiceSpec, TrafficSplit};
pub use variables::Variable;
