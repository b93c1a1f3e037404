//! String utilities for the domain layer.

/// Marker appended to output that was clipped by [`clip`].
pub const TRUNCATION_MARKER: &str = "\n...[truncated]";

/// Clip text to at most `limit` characters, marking the cut.
///
/// When clipping is needed, the first `limit - 20` characters are kept and
/// [`TRUNCATION_MARKER`] is appended, so the result never grows past the
/// limit by more than the marker itself.
pub fn clip(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let keep = limit.saturating_sub(20);
    let head: String = text.chars().take(keep).collect();
    format!("{}{}", head, TRUNCATION_MARKER)
}

/// Truncate a string to a maximum length with ellipsis (UTF-8 safe)
///
/// Uses byte length for max_len but ensures truncation occurs at valid
/// UTF-8 character boundaries. Used for one-line summaries in logs and
/// event records.
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else {
        let target = max_len.saturating_sub(3);
        let mut end = target.min(s.len());
        while end > 0 && !s.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &s[..end])
    }
}

/// Collapse a multi-line string onto one line for summaries.
pub fn single_line(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
