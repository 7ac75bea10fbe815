//! Resource Channel
//!
//! A [`ResourceChannel`] keeps the state of one resource up to date, either
//! through a long-lived event stream or through explicit one-shot fetches.
//! Only one transport is active at a time.
//!
//! Every (re)binding bumps a generation counter. Stream frames and one-shot
//! responses are stamped with the generation they were issued under and
//! dropped if it has moved on, so a slow response can never land on the
//! state of a newer binding.

use super::fetcher::{Reconciler, ResourceState};
use super::registry::{get_resource, Identity, ResourceDef};
use crate::api::{ApiClient, ApiError, Result};
use crate::query::join_query;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Transport used by a binding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Long-lived event stream
    Streaming,
    /// One-shot fetches driven by [`ResourceChannel::refresh`]
    Polled,
}

/// Coarse lifecycle of a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Nothing bound
    Idle,
    /// Bound, no data yet
    Loading,
    /// Bound with data
    Ready,
}

#[derive(Debug, Clone, PartialEq)]
struct Binding {
    identity: Identity,
    params: Vec<String>,
    mode: Mode,
    url: String,
}

#[derive(Debug)]
struct Shared {
    generation: AtomicU64,
    state: watch::Sender<ResourceState>,
}

impl Shared {
    fn current(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Start a new generation, keeping the state
    fn advance(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Start a new generation with empty state
    fn reset(&self) -> u64 {
        let generation = self.advance();
        self.state.send_replace(ResourceState::default());
        generation
    }

    /// Update the state unless `generation` is stale. Returns whether it applied.
    fn publish(&self, generation: u64, f: impl FnOnce(&mut ResourceState)) -> bool {
        self.state.send_if_modified(|state| {
            if self.current() != generation {
                return false;
            }
            f(state);
            true
        })
    }

    fn publish_error(&self, generation: u64, err: &ApiError) {
        self.publish(generation, |state| state.error = Some(err.to_string()));
    }
}

/// Live subscription task; aborted when dropped
#[derive(Debug)]
struct Subscription {
    handle: JoinHandle<()>,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Everything a one-shot fetch needs, detached from the channel
struct OneShot {
    client: ApiClient,
    def: &'static ResourceDef,
    url: String,
    params: Vec<String>,
    shared: Arc<Shared>,
    generation: u64,
}

impl OneShot {
    async fn run(self) -> Result<()> {
        let body = match self.client.get_json(&self.url, self.def.summary).await {
            Ok(body) => body,
            Err(e) => return self.fail(e),
        };

        let mut reconciler = Reconciler::new(self.def, &self.params);
        let mut outcome = Ok(());
        let applied = self.shared.publish(self.generation, |state| {
            outcome = reconciler.apply_snapshot(state, body);
            if outcome.is_ok() {
                state.error = None;
            }
        });

        if !applied {
            tracing::debug!("{}: discarding stale response", self.def.key);
            return Ok(());
        }
        match outcome {
            Ok(()) => Ok(()),
            Err(e) => self.fail(e),
        }
    }

    fn fail(&self, err: ApiError) -> Result<()> {
        if self.shared.current() != self.generation {
            tracing::debug!("{}: discarding stale error: {}", self.def.key, err);
            return Ok(());
        }
        // previous data stays visible next to the error
        self.shared.publish_error(self.generation, &err);
        Err(err)
    }
}

/// Reactive handle on a single resource
#[derive(Debug)]
pub struct ResourceChannel {
    client: ApiClient,
    def: &'static ResourceDef,
    binding: Option<Binding>,
    shared: Arc<Shared>,
    subscription: Option<Subscription>,
}

impl ResourceChannel {
    pub fn new(client: ApiClient, def: &'static ResourceDef) -> Self {
        let (state, _) = watch::channel(ResourceState::default());
        Self {
            client,
            def,
            binding: None,
            shared: Arc::new(Shared {
                generation: AtomicU64::new(0),
                state,
            }),
            subscription: None,
        }
    }

    /// Create a channel for a registry key
    pub fn for_key(client: ApiClient, key: &str) -> Result<Self> {
        let def = get_resource(key).ok_or_else(|| ApiError::UnknownResource(key.to_string()))?;
        Ok(Self::new(client, def))
    }

    pub fn resource(&self) -> &'static ResourceDef {
        self.def
    }

    /// Bind to an identity, query and transport
    ///
    /// Binding to exactly what is already bound does nothing. Anything else
    /// tears down the old transport and starts over. A new identity or mode
    /// clears the state; new query tokens for the same identity and mode
    /// keep the page window so the next page is reconciled against it. In polled mode the
    /// initial fetch is awaited and its error returned.
    pub async fn bind(&mut self, identity: Identity, params: Vec<String>, mode: Mode) -> Result<()> {
        let path = self.def.render(&identity)?;
        let url = join_query(&self.client.url(&path), &params);
        let binding = Binding {
            identity,
            params,
            mode,
            url,
        };

        if self.binding.as_ref() == Some(&binding) {
            tracing::debug!("{}: binding unchanged", self.def.key);
            return Ok(());
        }

        self.subscription = None;
        let same_transport = self
            .binding
            .as_ref()
            .map_or(false, |b| b.identity == binding.identity && b.mode == binding.mode);
        let generation = if same_transport {
            self.shared.advance()
        } else {
            self.shared.reset()
        };
        tracing::debug!("{}: binding {} ({:?})", self.def.key, binding.url, binding.mode);

        match mode {
            Mode::Streaming => {
                self.subscription = Some(self.open_stream(&binding, generation));
                self.binding = Some(binding);
                Ok(())
            },
            Mode::Polled => {
                self.binding = Some(binding);
                self.refresh().await
            },
        }
    }

    /// Replace only the query tokens of the current binding
    pub async fn set_params(&mut self, params: Vec<String>) -> Result<()> {
        let Some(binding) = &self.binding else {
            return Ok(());
        };
        let (identity, mode) = (binding.identity.clone(), binding.mode);
        self.bind(identity, params, mode).await
    }

    /// Re-run the one-shot fetch of a polled binding
    ///
    /// Streaming and unbound channels have nothing to refresh.
    pub async fn refresh(&self) -> Result<()> {
        match self.one_shot() {
            Some(fetch) => fetch.run().await,
            None => Ok(()),
        }
    }

    /// Like [`refresh`](Self::refresh) but runs in the background
    pub fn spawn_refresh(&self) -> Option<JoinHandle<Result<()>>> {
        self.one_shot().map(|fetch| tokio::spawn(fetch.run()))
    }

    fn one_shot(&self) -> Option<OneShot> {
        let binding = self.binding.as_ref().filter(|b| b.mode == Mode::Polled)?;
        Some(OneShot {
            client: self.client.clone(),
            def: self.def,
            url: binding.url.clone(),
            params: binding.params.clone(),
            shared: Arc::clone(&self.shared),
            generation: self.shared.current(),
        })
    }

    /// Drop the binding and its transport. Safe to call repeatedly.
    pub fn unbind(&mut self) {
        self.subscription = None;
        if self.binding.take().is_some() {
            self.shared.reset();
            tracing::debug!("{}: unbound", self.def.key);
        }
    }

    /// Close the channel; same as [`unbind`](Self::unbind)
    pub fn close(&mut self) {
        self.unbind();
    }

    /// Current state snapshot
    pub fn state(&self) -> ResourceState {
        self.shared.state.borrow().clone()
    }

    /// Receiver notified on every state change
    pub fn watch(&self) -> watch::Receiver<ResourceState> {
        self.shared.state.subscribe()
    }

    pub fn phase(&self) -> Phase {
        if self.binding.is_none() {
            return Phase::Idle;
        }
        if self.shared.state.borrow().data.is_some() {
            Phase::Ready
        } else {
            Phase::Loading
        }
    }

    pub fn is_streaming(&self) -> bool {
        self.subscription
            .as_ref()
            .map_or(false, |s| !s.handle.is_finished())
    }

    fn open_stream(&self, binding: &Binding, generation: u64) -> Subscription {
        let client = self.client.clone();
        let def = self.def;
        let url = binding.url.clone();
        let params = binding.params.clone();
        let shared = Arc::clone(&self.shared);

        let handle = tokio::spawn(async move {
            run_stream(client, def, url, params, shared, generation).await;
        });
        Subscription { handle }
    }
}

async fn run_stream(
    client: ApiClient,
    def: &'static ResourceDef,
    url: String,
    params: Vec<String>,
    shared: Arc<Shared>,
    generation: u64,
) {
    let mut stream = match client.subscribe(&url).await {
        Ok(stream) => stream,
        Err(e) => {
            tracing::error!("{}: subscription failed: {}", def.key, e);
            shared.publish_error(generation, &e);
            return;
        },
    };

    let mut reconciler = Reconciler::new(def, &params);
    while let Some(next) = stream.next_event().await {
        let event = match next {
            Ok(event) => event,
            Err(e) => {
                tracing::error!("{}: stream error: {}", def.key, e);
                shared.publish_error(generation, &e);
                return;
            },
        };

        if !apply_event(def, &mut reconciler, &shared, generation, &event.data) {
            return;
        }
    }

    tracing::debug!("{}: stream closed by server", def.key);
    shared.publish_error(generation, &ApiError::StreamClosed);
}

/// Reconcile one stream frame. Returns false once the binding is stale.
fn apply_event(
    def: &ResourceDef,
    reconciler: &mut Reconciler,
    shared: &Shared,
    generation: u64,
    data: &str,
) -> bool {
    // heartbeat
    if data.trim().is_empty() {
        return true;
    }

    let body: Value = match serde_json::from_str(data) {
        Ok(body) => body,
        Err(e) => {
            tracing::warn!("{}: undecodable frame: {}", def.key, e);
            shared.publish_error(generation, &ApiError::Decode(e));
            return shared.current() == generation;
        },
    };

    shared.publish(generation, |state| match reconciler.apply_frame(state, body) {
        Ok(()) => state.error = None,
        Err(e) => {
            tracing::warn!("{}: {}", def.key, e);
            state.error = Some(e.to_string());
        },
    })
}
