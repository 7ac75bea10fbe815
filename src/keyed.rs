//! Keyed Set
//!
//! Some streams (services, revisions, pods) send one item per frame with an
//! `event` discriminator instead of a full page. A [`KeyedSet`] folds those
//! events into a map keyed by item identity and hands out a fresh snapshot
//! after every change.

use serde_json::Value;
use std::collections::BTreeMap;

/// Set mutation carried by a keyed frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyedEvent {
    Added,
    Modified,
    Deleted,
}

impl KeyedEvent {
    /// Parse the `event` field. A missing or unknown value counts as `ADDED`.
    pub fn from_str(s: Option<&str>) -> Self {
        match s {
            Some("DELETED") => Self::Deleted,
            Some("MODIFIED") => Self::Modified,
            _ => Self::Added,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Added => "ADDED",
            Self::Modified => "MODIFIED",
            Self::Deleted => "DELETED",
        }
    }
}

/// Items keyed by an identity field, ordered by key.
#[derive(Debug, Clone, Default)]
pub struct KeyedSet {
    id_field: String,
    items: BTreeMap<String, Value>,
}

impl KeyedSet {
    pub fn new(id_field: &str) -> Self {
        Self {
            id_field: id_field.to_string(),
            items: BTreeMap::new(),
        }
    }

    /// Build a set from a list response, skipping items without an identity.
    pub fn seeded(id_field: &str, items: impl IntoIterator<Item = Value>) -> Self {
        let mut set = Self::new(id_field);
        for item in items {
            set.apply(KeyedEvent::Added, item);
        }
        set
    }

    fn key_of(&self, item: &Value) -> Option<String> {
        item.get(&self.id_field)
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
    }

    /// Apply one event. Returns whether the set changed.
    ///
    /// `ADDED` never overwrites an existing item and `MODIFIED` never creates
    /// one.
    pub fn apply(&mut self, event: KeyedEvent, item: Value) -> bool {
        let Some(key) = self.key_of(&item) else {
            tracing::warn!("Keyed item without '{}' field, ignoring", self.id_field);
            return false;
        };

        match event {
            KeyedEvent::Deleted => self.items.remove(&key).is_some(),
            KeyedEvent::Modified => match self.items.get_mut(&key) {
                Some(existing) => {
                    *existing = item;
                    true
                },
                None => false,
            },
            KeyedEvent::Added => {
                if self.items.contains_key(&key) {
                    false
                } else {
                    self.items.insert(key, item);
                    true
                }
            },
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.items.contains_key(key)
    }

    /// Fresh snapshot of the current items.
    pub fn snapshot(&self) -> Vec<Value> {
        self.items.values().cloned().collect()
    }
}
