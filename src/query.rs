//! Query Descriptor
//!
//! Turns a list of opaque `key=value` tokens into a URL query string.
//! Tokens are expected to be pre-escaped: cursors and filter values are
//! server-defined, and the [`QueryParam`] helpers escape the few values that
//! come from users.

/// Encode query tokens.
///
/// In leading mode the first token is prefixed with `?` and the rest joined
/// with `&`. In append mode every token is prefixed with `&`, for URLs that
/// already carry a `?op=` directive.
pub fn encode(append: bool, params: &[String]) -> String {
    let mut out = String::new();
    for (i, param) in params.iter().enumerate() {
        if i == 0 && !append {
            out.push('?');
        } else {
            out.push('&');
        }
        out.push_str(param);
    }
    out
}

/// Check whether any token sets the given parameter (`<name>=`).
pub fn contains_direction(params: &[String], name: &str) -> bool {
    params.iter().any(|p| {
        p.strip_prefix(name)
            .map(|rest| rest.starts_with('='))
            .unwrap_or(false)
    })
}

/// Append tokens to a URL, choosing append mode when the URL already has a query.
pub fn join_query(url: &str, params: &[String]) -> String {
    format!("{}{}", url, encode(url.contains('?'), params))
}

/// Builders for the query tokens understood by list endpoints.
pub struct QueryParam;

impl QueryParam {
    /// Page forward from a cursor.
    pub fn after(cursor: &str) -> String {
        format!("after={}", cursor)
    }

    /// Page backward from a cursor.
    pub fn before(cursor: &str) -> String {
        format!("before={}", cursor)
    }

    /// Limit the page size when paging forward.
    pub fn first(count: usize) -> String {
        format!("first={}", count)
    }

    /// Limit the page size when paging backward.
    pub fn last(count: usize) -> String {
        format!("last={}", count)
    }

    /// Filter tokens: field, match type (e.g. `CONTAINS`) and value.
    ///
    /// The value is percent-encoded since it usually comes from user input.
    pub fn filter(field: &str, kind: &str, value: &str) -> Vec<String> {
        vec![
            format!("filter.field={}", field),
            format!("filter.type={}", kind),
            format!("filter.val={}", urlencoding::encode(value)),
        ]
    }

    /// Ordering tokens; `direction` is `ASC` or `DESC`.
    pub fn order(field: &str, direction: &str) -> Vec<String> {
        vec![
            format!("order.field={}", field),
            format!("order.direction={}", direction),
        ]
    }
}
