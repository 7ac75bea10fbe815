//! Resource abstraction layer
//!
//! Resources are described declaratively in the [`registry`]; a single
//! generic [`ResourceChannel`] binds any of them to live state.
//!
//! # Architecture
//!
//! - [`registry`] - Resource descriptors: path templates and response shapes
//! - [`fetcher`] - Folds responses and stream frames into [`ResourceState`]
//! - [`channel`] - Binding lifecycle, transports and stale-response guard
//! - [`dispatch`] - One-shot mutations with error mapping
//!
//! # Example
//!
//! ```no_run
//! use direktiv_hooks::api::ApiClient;
//! use direktiv_hooks::resource::{Identity, Mode, ResourceChannel};
//!
//! # async fn example(client: ApiClient) -> direktiv_hooks::api::Result<()> {
//! let mut channel = ResourceChannel::for_key(client, "instances")?;
//! channel.bind(Identity::namespace("demo"), vec![], Mode::Streaming).await?;
//!
//! let mut updates = channel.watch();
//! while updates.changed().await.is_ok() {
//!     println!("{:?}", updates.borrow().data);
//! }
//! # Ok(())
//! # }
//! ```

pub mod channel;
pub mod dispatch;
pub mod fetcher;
pub mod registry;

pub use channel::{Mode, Phase, ResourceChannel};
pub use dispatch::{Body, Expect, Mutation, Reply};
pub use fetcher::{extract_json_value, Reconciler, ResourceData, ResourceState};
pub use registry::{get_all_resource_keys, get_registry, get_resource, render_path, Identity, ResourceDef, Shape};
