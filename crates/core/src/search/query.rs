//! Query evaluation and relevance ranking.
//!
//! Matching is OR across whitespace-separated terms, substring per term.
//! Each field (title, content) is scored on its own:
//!
//! | condition                                   | score |
//! |---------------------------------------------|-------|
//! | field contains the whole query              | 10    |
//! | otherwise, per term found as a substring    | +1    |
//! | ...and that term also matches `\bterm\b`    | +2    |
//!
//! The combined score is `2 * title + content`. Ranking uses a stable sort,
//! so equal scores keep index order.

use regex::Regex;
use schemars::JsonSchema;
use serde::Serialize;

use super::index::{IndexEntry, build_index};
use crate::{Document, Error};

/// Score awarded when a field contains the full query as a phrase.
pub const PHRASE_SCORE: u32 = 10;
/// Score per term found anywhere in a field.
pub const TERM_SCORE: u32 = 1;
/// Extra score when the term also sits on word boundaries.
pub const WORD_BOUNDARY_BONUS: u32 = 2;
/// Title scores count this many times over content scores.
pub const TITLE_WEIGHT: u32 = 2;

/// An index entry that matched a query, with its scores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
pub struct RankedResult {
    pub entry: IndexEntry,
    /// Position of the entry in the index.
    pub position: usize,
    pub title_score: u32,
    pub content_score: u32,
    pub score: u32,
}

/// Compiled form of a query: lowercased phrase plus per-term boundary regexes.
struct QueryPlan {
    phrase: String,
    terms: Vec<(String, Option<Regex>)>,
}

impl QueryPlan {
    fn new(text: &str) -> Self {
        let phrase = text.to_lowercase();
        let terms = phrase
            .split_whitespace()
            .map(|term| {
                let boundary = Regex::new(&format!(r"(?i)\b{}\b", regex::escape(term)))
                    .map_err(|e| tracing::debug!("no word-boundary pattern for {:?}: {}", term, e))
                    .ok();
                (term.to_string(), boundary)
            })
            .collect();
        Self { phrase, terms }
    }

    fn matches(&self, title_lower: &str, content_lower: &str) -> bool {
        self.terms
            .iter()
            .any(|(term, _)| title_lower.contains(term.as_str()) || content_lower.contains(term.as_str()))
    }

    fn score(&self, field_lower: &str) -> u32 {
        if field_lower.contains(self.phrase.as_str()) {
            return PHRASE_SCORE;
        }

        self.terms
            .iter()
            .filter(|(term, _)| field_lower.contains(term.as_str()))
            .map(|(_, boundary)| match boundary {
                Some(re) if re.is_match(field_lower) => TERM_SCORE + WORD_BOUNDARY_BONUS,
                _ => TERM_SCORE,
            })
            .sum()
    }
}

/// Query engine over a built index.
///
/// Constructed empty; [`SearchEngine::load`] builds the index. Querying an
/// engine that has no index is an error rather than an empty result.
#[derive(Debug, Clone, Default)]
pub struct SearchEngine {
    index: Option<Vec<IndexEntry>>,
}

impl SearchEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_document(document: &Document) -> Self {
        let mut engine = Self::new();
        engine.load(document);
        engine
    }

    /// Build (or rebuild) the index from `document`.
    pub fn load(&mut self, document: &Document) {
        let index = build_index(document);
        tracing::debug!(entries = index.len(), "search index built");
        self.index = Some(index);
    }

    pub fn is_initialized(&self) -> bool {
        self.index.is_some()
    }

    pub fn index(&self) -> Result<&[IndexEntry], Error> {
        self.index.as_deref().ok_or(Error::NotInitialized)
    }

    /// Evaluate `text` and return every matching entry, best first.
    ///
    /// `text` must be non-empty after trimming; callers treat an empty box
    /// as "no query" and never get here.
    pub fn query(&self, text: &str) -> Result<Vec<RankedResult>, Error> {
        let index = self.index()?;
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::InvalidInput("query cannot be empty".into()));
        }

        let plan = QueryPlan::new(text);
        let mut results: Vec<RankedResult> = index
            .iter()
            .enumerate()
            .filter_map(|(position, entry)| {
                let title = entry.title.to_lowercase();
                let content = entry.content.to_lowercase();
                if !plan.matches(&title, &content) {
                    return None;
                }
                let title_score = plan.score(&title);
                let content_score = plan.score(&content);
                Some(RankedResult {
                    entry: entry.clone(),
                    position,
                    title_score,
                    content_score,
                    score: TITLE_WEIGHT * title_score + content_score,
                })
            })
            .collect();

        // Vec::sort_by is stable: ties stay in index order.
        results.sort_by(|a, b| b.score.cmp(&a.score));

        tracing::debug!(query = text, matches = results.len(), "query evaluated");
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Amendment, Article, Section};
    use crate::search::EntryKind;

    fn engine_for(entries: Vec<IndexEntry>) -> SearchEngine {
        SearchEngine { index: Some(entries) }
    }

    fn entry(title: &str, content: &str) -> IndexEntry {
        IndexEntry {
            kind: EntryKind::Amendment,
            title: title.into(),
            content: content.into(),
            target_id: title.to_lowercase().replace(' ', "-"),
            parent_title: None,
        }
    }

    #[test]
    fn test_query_before_build_fails() {
        let engine = SearchEngine::new();
        assert!(matches!(engine.query("speech"), Err(Error::NotInitialized)));
        assert!(!engine.is_initialized());
    }

    #[test]
    fn test_empty_query_rejected() {
        let engine = engine_for(vec![entry("A", "b")]);
        assert!(matches!(engine.query("   "), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_no_match_is_empty_not_error() {
        let engine = engine_for(vec![entry("Free Speech", "Congress shall make no law")]);
        assert!(engine.query("zebra").unwrap().is_empty());
    }

    #[test]
    fn test_title_match_outranks_content_match() {
        let engine = engine_for(vec![
            entry("Press", "the free speech clause"),
            entry("Free Speech", "nothing relevant"),
        ]);

        let results = engine.query("free speech").unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].entry.title, "Free Speech");
        assert_eq!(results[0].score, 20);
        assert_eq!(results[1].score, 10);
    }

    #[test]
    fn test_or_semantics_and_substring_matching() {
        let engine = engine_for(vec![entry("Arms", "keep and bear"), entry("Quartering", "soldiers")]);

        // "bea" matches "bear" as a substring only: +1, no boundary bonus.
        let results = engine.query("bea soldiers").unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].entry.title, "Quartering");
        assert_eq!(results[0].content_score, 3);
        assert_eq!(results[1].content_score, 1);
    }

    #[test]
    fn test_term_scores_accumulate() {
        let engine = engine_for(vec![entry("X", "the press and the speech")]);
        let results = engine.query("speech press").unwrap();
        // phrase "speech press" absent; each term +1 and +2 boundary.
        assert_eq!(results[0].content_score, 6);
        assert_eq!(results[0].title_score, 0);
    }

    #[test]
    fn test_case_insensitive() {
        let engine = engine_for(vec![entry("Due Process", "LIBERTY")]);
        let results = engine.query("liberty").unwrap();
        assert_eq!(results[0].content_score, PHRASE_SCORE);
    }

    #[test]
    fn test_ties_keep_index_order() {
        let engine = engine_for(vec![entry("One", "vote"), entry("Two", "vote"), entry("Three", "vote")]);
        let titles: Vec<String> = engine.query("vote").unwrap().into_iter().map(|r| r.entry.title).collect();
        assert_eq!(titles, vec!["One", "Two", "Three"]);
    }

    #[test]
    fn test_regex_metacharacters_are_literal() {
        let engine = engine_for(vec![entry("Clause (a)", "text")]);
        let results = engine.query("(a) zz").unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title_score, 1);
    }

    #[test]
    fn test_returns_full_ranked_set() {
        let entries = (0..25).map(|i| entry(&format!("Entry {i}"), "common")).collect();
        let engine = engine_for(entries);
        assert_eq!(engine.query("common").unwrap().len(), 25);
    }

    #[test]
    fn test_single_section_document() {
        let doc = Document {
            preamble: Some("P".into()),
            articles: vec![Article {
                number: 1,
                title: "Art One".into(),
                sections: vec![Section { number: 1, title: "S".into(), content: "free speech here".into() }],
                content: None,
            }],
            amendments: Vec::<Amendment>::new(),
        };
        let engine = SearchEngine::from_document(&doc);
        assert_eq!(engine.index().unwrap().len(), 3);

        let results = engine.query("speech").unwrap();
        // The article entry carries its sections' text, so it matches too.
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.title_score == 0 && r.score == PHRASE_SCORE));
        assert_eq!(results[0].entry.kind, EntryKind::Article);
        assert_eq!(results[1].entry.kind, EntryKind::Section);
        assert_eq!(results[1].entry.title, "Art One - Section 1: S");
    }
}
