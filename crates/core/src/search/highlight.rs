//! Highlight markers for query terms.
//!
//! Terms are applied one after another to the already-marked string, so a
//! later term can match inside an earlier marker: `highlight("cat", "cat at")`
//! yields `<mark>c<mark>at</mark></mark>`, and the term `mark` matches the
//! tags themselves. Renderers receive exactly this output.

use regex::Regex;

pub const MARK_OPEN: &str = "<mark>";
pub const MARK_CLOSE: &str = "</mark>";

/// Wrap every case-insensitive occurrence of each query term in `<mark>`.
pub fn highlight(text: &str, query: &str) -> String {
    let mut marked = text.to_string();

    for term in query.split_whitespace() {
        let pattern = match Regex::new(&format!("(?i){}", regex::escape(term))) {
            Ok(re) => re,
            Err(e) => {
                tracing::debug!("skipping highlight for {:?}: {}", term, e);
                continue;
            }
        };
        marked = pattern
            .replace_all(&marked, |caps: &regex::Captures| format!("{MARK_OPEN}{}{MARK_CLOSE}", &caps[0]))
            .into_owned();
    }

    marked
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wraps_every_occurrence_including_substrings() {
        assert_eq!(highlight("cat cats", "cat"), "<mark>cat</mark> <mark>cat</mark>s");
    }

    #[test]
    fn test_preserves_source_casing() {
        assert_eq!(highlight("Free Speech", "free"), "<mark>Free</mark> Speech");
    }

    #[test]
    fn test_multiple_terms_in_query_order() {
        assert_eq!(
            highlight("freedom of speech", "speech freedom"),
            "<mark>freedom</mark> of <mark>speech</mark>"
        );
    }

    #[test]
    fn test_overlapping_terms_double_wrap() {
        assert_eq!(highlight("cat", "cat at"), "<mark>c<mark>at</mark></mark>");
    }

    #[test]
    fn test_metacharacters_are_literal() {
        assert_eq!(highlight("Section 2 (a) and a", "(a)"), "Section 2 <mark>(a)</mark> and a");
    }

    #[test]
    fn test_empty_query_is_identity() {
        assert_eq!(highlight("unchanged", "   "), "unchanged");
    }
}
