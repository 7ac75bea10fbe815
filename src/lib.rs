//! Client library for the Direktiv workflow API
//!
//! Every REST resource (namespaces, workflows, instances, secrets,
//! variables, services, registries, events, mirrors) can be read once or
//! followed live over server-sent events, and written through typed
//! operations that raise structured errors.
//!
//! - [`resource::ResourceChannel`] binds a resource and keeps its reconciled
//!   state in a `tokio::sync::watch` channel.
//! - [`bindings`] adds the per-resource operations to [`api::ApiClient`].
//! - [`page`] and [`keyed`] hold the list reconciliation rules shared by both
//!   transports.

pub mod api;
pub mod bindings;
pub mod config;
pub mod keyed;
pub mod page;
pub mod query;
pub mod resource;

/// Version injected at compile time via DIREKTIV_HOOKS_VERSION (set by CI),
/// or "dev" for local builds.
pub const VERSION: &str = match option_env!("DIREKTIV_HOOKS_VERSION") {
    Some(v) => v,
    None => "dev",
};

pub use api::{ApiClient, ApiError, Result};
pub use config::ClientConfig;
pub use resource::{Identity, Mode, Phase, ResourceChannel, ResourceState};
