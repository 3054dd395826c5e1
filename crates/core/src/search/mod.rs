//! In-document full-text search.
//!
//! The index is a flat, ordered list of [`IndexEntry`] values built once from
//! a [`Document`](crate::Document). Queries are evaluated synchronously
//! against it; only typing is debounced.
//!
//! - [`index`]: entry derivation in document order
//! - [`query`]: term/phrase matching and relevance ranking
//! - [`excerpt`]: context window around the first match
//! - [`highlight`]: `<mark>` wrapping of query terms
//! - [`debounce`]: quiet-period gate for type-ahead

pub mod debounce;
pub mod excerpt;
pub mod highlight;
pub mod index;
pub mod query;

pub use debounce::Debouncer;
pub use excerpt::{DEFAULT_EXCERPT_LENGTH, excerpt};
pub use highlight::highlight;
pub use index::{EntryKind, IndexEntry, build_index};
pub use query::{RankedResult, SearchEngine};

/// Character position of the first case-insensitive occurrence of
/// `needle_lower` (already lowercased) in `haystack`.
///
/// Lowercasing can change the number of chars (e.g. `İ`), so the match is
/// located in the lowered text and mapped back to the original position.
pub(crate) fn find_ci(haystack: &str, needle_lower: &str) -> Option<usize> {
    let mut lowered = String::with_capacity(haystack.len());
    let mut origin = Vec::with_capacity(haystack.len());
    for (idx, ch) in haystack.chars().enumerate() {
        for lc in ch.to_lowercase() {
            lowered.push(lc);
            origin.push(idx);
        }
    }

    let byte = lowered.find(needle_lower)?;
    let lowered_idx = lowered[..byte].chars().count();
    Some(origin.get(lowered_idx).copied().unwrap_or(haystack.chars().count()))
}
