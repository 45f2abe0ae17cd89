//! Task identity derived from permalinks.
//!
//! Every identity-keyed operation (reconciliation, deduplication, edits,
//! deletion) joins on the value produced here.

use crate::TaskId;

/// Resolve the task ID of a permalink.
///
/// The ID is the text after the final `/`, trimmed. Returns `None` when the
/// link is empty or the resolved segment is blank; such records never enter
/// identity-keyed operations.
///
/// ```rust
/// use tasksync_core::identity::resolve;
///
/// assert_eq!(resolve("https://3.basecamp.com/1/buckets/2/todos/abc123"), Some("abc123".to_string()));
/// assert_eq!(resolve("   "), None);
/// ```
pub fn resolve(link: &str) -> Option<TaskId> {
    let segment = link.rsplit('/').next().unwrap_or_default().trim();
    if segment.is_empty() {
        None
    } else {
        Some(segment.to_string())
    }
}
