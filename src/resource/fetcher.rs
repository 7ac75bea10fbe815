//! Resource Fetcher
//!
//! Turns responses and stream frames into [`ResourceState`] according to the
//! resource's [`Shape`]. The same [`Reconciler`] serves one-shot fetches and
//! event streams, so both transports produce identical state.

use super::registry::{ResourceDef, Shape};
use crate::api::{ApiError, Result};
use crate::keyed::{KeyedEvent, KeyedSet};
use crate::page::{Edge, ListAction, PageInfo, PagedEnvelope};
use serde_json::Value;

/// Data held by a bound resource
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceData {
    /// Page window of a paged list
    Edges(Vec<Edge>),
    /// Snapshot of a keyed set, ordered by key
    Items(Vec<Value>),
    /// A single object
    Object(Value),
}

impl ResourceData {
    /// Number of list entries; a single object counts as one
    pub fn len(&self) -> usize {
        match self {
            Self::Edges(edges) => edges.len(),
            Self::Items(items) => items.len(),
            Self::Object(_) => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// List entries as plain values (edge nodes for paged lists)
    pub fn values(&self) -> Vec<&Value> {
        match self {
            Self::Edges(edges) => edges.iter().map(|e| &e.node).collect(),
            Self::Items(items) => items.iter().collect(),
            Self::Object(value) => vec![value],
        }
    }
}

/// Observable state of a resource
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceState {
    pub data: Option<ResourceData>,
    pub page_info: Option<PageInfo>,
    /// Latest `totalCount`; not reconciled
    pub total_count: Option<u64>,
    /// Sibling object stored next to a list (mirror info)
    pub info: Option<Value>,
    /// Last error message; older data is kept next to it
    pub error: Option<String>,
}

impl ResourceState {
    fn edges_mut(&mut self) -> Option<Vec<Edge>> {
        match self.data.take() {
            Some(ResourceData::Edges(edges)) => Some(edges),
            other => {
                self.data = other;
                None
            },
        }
    }
}

/// Applies responses of one resource binding to its state
#[derive(Debug)]
pub struct Reconciler {
    def: &'static ResourceDef,
    params: Vec<String>,
    keyed: Option<KeyedSet>,
}

impl Reconciler {
    pub fn new(def: &'static ResourceDef, params: &[String]) -> Self {
        let keyed = match def.shape {
            Shape::Keyed { id_field, .. } => Some(KeyedSet::new(id_field)),
            _ => None,
        };
        Self {
            def,
            params: params.to_vec(),
            keyed,
        }
    }

    /// Apply a one-shot response body
    pub fn apply_snapshot(&mut self, state: &mut ResourceState, body: Value) -> Result<()> {
        match self.def.shape {
            Shape::Paged { key, info } => {
                self.apply_paged(state, &body, key, ListAction::UpdateList)?;
                store_info(state, &body, info);
            },
            // a full fetch replaces the window; only live frames append
            Shape::Appended { key } => self.apply_paged(state, &body, key, ListAction::UpdateList)?,
            Shape::Single { unwrap } => state.data = Some(ResourceData::Object(unwrap(body))),
            Shape::Watched { key } => state.data = Some(ResourceData::Object(select(body, key))),
            Shape::Keyed { id_field, list_key, .. } => {
                let list = select(body, list_key);
                let Value::Array(items) = list else {
                    return Err(ApiError::UnexpectedResponse(format!(
                        "{}: expected a list of items",
                        self.def.summary
                    )));
                };
                let set = KeyedSet::seeded(id_field, items);
                state.data = Some(ResourceData::Items(set.snapshot()));
                self.keyed = Some(set);
            },
        }
        Ok(())
    }

    /// Apply one decoded stream frame
    pub fn apply_frame(&mut self, state: &mut ResourceState, body: Value) -> Result<()> {
        match self.def.shape {
            Shape::Paged { key, info } => {
                if key.map_or(true, |k| body.get(k).is_some()) {
                    self.apply_paged(state, &body, key, ListAction::UpdateList)?;
                }
                store_info(state, &body, info);
            },
            Shape::Appended { key } => self.apply_paged(state, &body, key, ListAction::AppendList)?,
            Shape::Single { unwrap } => state.data = Some(ResourceData::Object(unwrap(body))),
            Shape::Watched { key } => {
                let event = KeyedEvent::from_str(body.get("event").and_then(|v| v.as_str()));
                if event == KeyedEvent::Deleted {
                    tracing::debug!("{}: ignoring DELETED frame", self.def.key);
                    return Ok(());
                }
                let object = match key {
                    Some(_) => select(body, key),
                    None => without_event(body),
                };
                state.data = Some(ResourceData::Object(object));
            },
            Shape::Keyed { item, id_field, .. } => {
                let event = KeyedEvent::from_str(body.get("event").and_then(|v| v.as_str()));
                let Some(item) = body.get(item).cloned() else {
                    return Err(ApiError::UnexpectedResponse(format!(
                        "{}: frame without '{}'",
                        self.def.summary, item
                    )));
                };
                let set = self.keyed.get_or_insert_with(|| KeyedSet::new(id_field));
                if set.apply(event, item) || state.data.is_none() {
                    state.data = Some(ResourceData::Items(set.snapshot()));
                }
            },
        }
        Ok(())
    }

    fn apply_paged(
        &self,
        state: &mut ResourceState,
        body: &Value,
        key: Option<&'static str>,
        action: ListAction,
    ) -> Result<()> {
        let envelope_value = match key {
            Some(k) => body.get(k).cloned().unwrap_or(Value::Null),
            None => body.clone(),
        };
        if envelope_value.is_null() {
            return Err(ApiError::UnexpectedResponse(format!(
                "{}: response has no list",
                self.def.summary
            )));
        }

        let envelope: PagedEnvelope = serde_json::from_value(envelope_value)?;
        state.total_count = envelope.total_count;

        let mut edges = state.edges_mut();
        action.apply(&mut edges, &mut state.page_info, envelope, &self.params);
        if let Some(edges) = edges {
            state.data = Some(ResourceData::Edges(edges));
        }
        Ok(())
    }
}

fn select(mut body: Value, key: Option<&str>) -> Value {
    match key {
        Some(k) => body.get_mut(k).map(Value::take).unwrap_or(Value::Null),
        None => body,
    }
}

fn without_event(mut body: Value) -> Value {
    if let Value::Object(map) = &mut body {
        map.remove("event");
    }
    body
}

fn store_info(state: &mut ResourceState, body: &Value, info: Option<&str>) {
    if let Some(info) = info.and_then(|k| body.get(k)) {
        state.info = Some(info.clone());
    }
}

/// Extract a value from JSON using a dot-notation path
pub fn extract_json_value(item: &Value, path: &str) -> String {
    let parts: Vec<&str> = path.split('.').collect();
    let mut current = item;

    for part in parts {
        // Handle array index
        if let Ok(idx) = part.parse::<usize>() {
            current = match current.get(idx) {
                Some(v) => v,
                None => return "-".to_string(),
            };
        } else {
            current = match current.get(part) {
                Some(v) => v,
                None => return "-".to_string(),
            };
        }
    }

    match current {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "-".to_string(),
        Value::Array(arr) => format!("[{} items]", arr.len()),
        Value::Object(_) => "[object]".to_string(),
    }
}
