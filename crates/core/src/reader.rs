//! Reader controller: turns UI events into views over one document.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::document::{Amendment, Article, Document};
use crate::search::{DEFAULT_EXCERPT_LENGTH, EntryKind, SearchEngine, excerpt, highlight};
use crate::Error;

/// Presentation limits applied to search results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReaderOptions {
    pub max_results: usize,
    pub excerpt_length: usize,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self { max_results: 10, excerpt_length: DEFAULT_EXCERPT_LENGTH }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReaderEvent {
    /// The search box changed.
    Search(String),
    /// A result or table-of-contents link was followed.
    Navigate(String),
    Clear,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum ReaderView {
    /// Results panel hidden.
    Hidden,
    Results(SearchPage),
    Target(TargetView),
    NotFound { target_id: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
pub struct SearchPage {
    pub query: String,
    /// Matches before truncation.
    pub total: usize,
    pub hits: Vec<SearchHit>,
}

/// A rendered result row. `title` and `excerpt` carry `<mark>` tags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
pub struct SearchHit {
    pub kind: EntryKind,
    pub target_id: String,
    pub title: String,
    pub excerpt: String,
    pub score: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TargetView {
    Preamble { text: String },
    Article(Article),
    Amendment(Amendment),
}

pub struct Reader {
    document: Document,
    engine: SearchEngine,
    options: ReaderOptions,
}

impl Reader {
    pub fn new(document: Document, options: ReaderOptions) -> Self {
        let engine = SearchEngine::from_document(&document);
        Self { document, engine, options }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn engine(&self) -> &SearchEngine {
        &self.engine
    }

    pub fn options(&self) -> ReaderOptions {
        self.options
    }

    pub fn handle(&self, event: ReaderEvent) -> Result<ReaderView, Error> {
        match event {
            ReaderEvent::Search(text) => {
                if text.trim().is_empty() {
                    return Ok(ReaderView::Hidden);
                }
                Ok(ReaderView::Results(self.search(&text, self.options.max_results)?))
            }
            ReaderEvent::Navigate(target_id) => Ok(match self.target(&target_id) {
                Some(view) => ReaderView::Target(view),
                None => ReaderView::NotFound { target_id },
            }),
            ReaderEvent::Clear => Ok(ReaderView::Hidden),
        }
    }

    /// Run a query and render up to `limit` hits.
    pub fn search(&self, text: &str, limit: usize) -> Result<SearchPage, Error> {
        let query = text.trim();
        let results = self.engine.query(query)?;
        let total = results.len();
        let hits = results
            .into_iter()
            .take(limit)
            .map(|result| SearchHit {
                kind: result.entry.kind,
                target_id: result.entry.target_id,
                title: highlight(&result.entry.title, query),
                excerpt: highlight(&excerpt(&result.entry.content, query, self.options.excerpt_length), query),
                score: result.score,
            })
            .collect();

        tracing::debug!(query, total, "search rendered");
        Ok(SearchPage { query: query.to_string(), total, hits })
    }

    /// Resolve an anchor id (`preamble`, `article-{n}`, `amendment-{n}`).
    pub fn target(&self, target_id: &str) -> Option<TargetView> {
        if target_id == "preamble" {
            return self
                .document
                .preamble_text()
                .map(|text| TargetView::Preamble { text: text.to_string() });
        }
        if let Some(n) = target_id.strip_prefix("article-").and_then(|n| n.parse().ok()) {
            return self.document.article(n).cloned().map(TargetView::Article);
        }
        if let Some(n) = target_id.strip_prefix("amendment-").and_then(|n| n.parse().ok()) {
            return self.document.amendment(n).cloned().map(TargetView::Amendment);
        }
        None
    }
}
