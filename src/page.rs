//! Page Window
//!
//! Folds successive pages (or stream frames) of a paged edge list into a
//! local window. The server only reports the boundary flag in the direction
//! of travel reliably, so the flag pointing the other way is either carried
//! forward from an earlier observation or forced to `true`.
//!
//! A forced `true` is only ever corrected by an empty page in the matching
//! direction. If the caller never pages that way the flag stays `true`.

use crate::query::contains_direction;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Pagination boundary descriptor as sent by the server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    #[serde(default)]
    pub has_next_page: bool,
    #[serde(default)]
    pub has_previous_page: bool,
    #[serde(default)]
    pub start_cursor: Option<String>,
    #[serde(default)]
    pub end_cursor: Option<String>,
}

/// One list item with its opaque position cursor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    #[serde(default)]
    pub cursor: String,
    #[serde(default)]
    pub node: Value,
}

/// `{ edges, pageInfo, totalCount }` as found in list responses and frames.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PagedEnvelope {
    #[serde(default)]
    pub edges: Vec<Edge>,
    #[serde(default)]
    pub page_info: Option<PageInfo>,
    #[serde(default)]
    pub total_count: Option<u64>,
}

/// Outcome of reconciling a new page against the current window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciled {
    pub page_info: PageInfo,
    /// Whether the edge window should take the new edges.
    pub replace: bool,
}

/// Reconcile a newly arrived page against the previous one.
///
/// An empty page against an already populated window means the caller paged
/// past the last (or first) edge: the window is kept and only the boundary
/// flags are corrected. Otherwise the new page wins and the flag facing away
/// from the direction of travel is forced to `true`.
pub fn reconcile(
    old_page_info: Option<&PageInfo>,
    new_page_info: &PageInfo,
    old_data: Option<&[Edge]>,
    new_edges: &[Edge],
    params: &[String],
) -> Reconciled {
    let going_backward = contains_direction(params, "before");

    match (old_page_info, old_data) {
        (Some(old), Some(_)) if new_edges.is_empty() => {
            let mut page_info = old.clone();
            if going_backward {
                page_info.has_next_page = !new_page_info.has_previous_page;
                page_info.has_previous_page = new_page_info.has_previous_page;
            } else {
                page_info.has_previous_page = !new_page_info.has_next_page;
                page_info.has_next_page = new_page_info.has_next_page;
            }
            Reconciled {
                page_info,
                replace: false,
            }
        },
        _ => {
            let mut page_info = new_page_info.clone();
            if going_backward {
                page_info.has_next_page = true;
            } else {
                page_info.has_previous_page = true;
            }
            Reconciled {
                page_info,
                replace: true,
            }
        },
    }
}

/// How a paged frame is folded into the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListAction {
    /// Replace the window with the new edges.
    UpdateList,
    /// Append the new edges to the window (log streams).
    AppendList,
}

impl ListAction {
    /// Apply a paged envelope to the window.
    ///
    /// Frames without `pageInfo` carry no boundary information: their edges
    /// are taken as-is and the page info is left alone.
    pub fn apply(
        self,
        edges: &mut Option<Vec<Edge>>,
        page_info: &mut Option<PageInfo>,
        envelope: PagedEnvelope,
        params: &[String],
    ) {
        let Some(new_page_info) = envelope.page_info else {
            self.take(edges, envelope.edges);
            return;
        };

        let result = reconcile(
            page_info.as_ref(),
            &new_page_info,
            edges.as_deref(),
            &envelope.edges,
            params,
        );

        if result.replace {
            self.take(edges, envelope.edges);
        }
        *page_info = Some(result.page_info);
    }

    fn take(self, edges: &mut Option<Vec<Edge>>, new_edges: Vec<Edge>) {
        match (self, edges.as_mut()) {
            (ListAction::AppendList, Some(existing)) => existing.extend(new_edges),
            _ => *edges = Some(new_edges),
        }
    }
}
