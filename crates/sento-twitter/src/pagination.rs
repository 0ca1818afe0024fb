//! Cursor extraction from `search_metadata.next_results`.
//!
//! The search endpoint reports the next (older) page as a ready-made query
//! string:
//!
//! ```text
//! ?max_id=1050118621198921727&q=%23Barcelona&geocode=41.38%2C2.17%2C13km&count=100
//! ```
//!
//! Only `max_id` is taken from it; the other parameters are rebuilt from
//! the caller's request so they never drift.

/// Extracts the `max_id` cursor for the next page.
///
/// Returns `None` if there is no `next_results`, it carries no `max_id`, or
/// the value is not a number.
#[must_use]
pub fn extract_next_max_id(next_results: Option<&str>) -> Option<i64> {
    extract_query_param(next_results?, "max_id")?.parse().ok()
}

/// Extracts the value of a named query parameter from a query string,
/// with or without the leading `?`.
fn extract_query_param<'a>(query: &'a str, param: &str) -> Option<&'a str> {
    let query = query.split_once('?').map_or(query, |(_, q)| q);

    let needle = format!("{param}=");
    for pair in query.split('&') {
        if let Some(value) = pair.strip_prefix(needle.as_str()) {
            let value = value.split('#').next().unwrap_or(value);
            if !value.is_empty() {
                return Some(value);
            }
        }
    }
    None
}
