//! Context excerpts around the first match of a query.

use super::find_ci;

pub const DEFAULT_EXCERPT_LENGTH: usize = 150;

const ELLIPSIS: &str = "...";

/// Cut a window of at most `max_length` characters out of `content`.
///
/// The window is anchored on the first occurrence of the whole query, or
/// failing that the first query term that occurs, with about a third of the
/// window before the match. Without any match the excerpt is the head of the
/// content. `...` marks each side that was cut.
pub fn excerpt(content: &str, query: &str, max_length: usize) -> String {
    let query_lower = query.to_lowercase();
    let chars: Vec<char> = content.chars().collect();
    let len = chars.len();

    let match_at = find_ci(content, &query_lower)
        .or_else(|| query_lower.split_whitespace().find_map(|term| find_ci(content, term)));

    let Some(match_at) = match_at else {
        let head: String = chars.iter().take(max_length).collect();
        return if len > max_length { format!("{head}{ELLIPSIS}") } else { head };
    };

    let start = match_at.saturating_sub(max_length / 3);
    let end = len.min(start + max_length);

    let mut out = String::new();
    if start > 0 {
        out.push_str(ELLIPSIS);
    }
    out.extend(&chars[start..end]);
    if end < len {
        out.push_str(ELLIPSIS);
    }
    out
}
