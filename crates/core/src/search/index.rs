//! Search index construction.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::Document;

/// What part of the document an entry stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Preamble,
    Article,
    Section,
    Amendment,
}

impl EntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::Preamble => "preamble",
            EntryKind::Article => "article",
            EntryKind::Section => "section",
            EntryKind::Amendment => "amendment",
        }
    }
}

/// One searchable unit of the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct IndexEntry {
    pub kind: EntryKind,
    pub title: String,
    pub content: String,
    /// Anchor the renderer scrolls to. Sections share their article's.
    pub target_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_title: Option<String>,
}

/// Build the flat index in document order.
///
/// Preamble first (when non-empty), then each article immediately followed
/// by its sections, then the amendments.
pub fn build_index(document: &Document) -> Vec<IndexEntry> {
    let section_count: usize = document.articles.iter().map(|a| a.sections.len()).sum();
    let mut entries = Vec::with_capacity(1 + document.articles.len() + section_count + document.amendments.len());

    if let Some(preamble) = document.preamble_text() {
        entries.push(IndexEntry {
            kind: EntryKind::Preamble,
            title: "Preamble".into(),
            content: preamble.to_string(),
            target_id: "preamble".into(),
            parent_title: None,
        });
    }

    for article in &document.articles {
        let target_id = article.target_id();
        entries.push(IndexEntry {
            kind: EntryKind::Article,
            title: article.title.clone(),
            content: article.full_text(),
            target_id: target_id.clone(),
            parent_title: None,
        });

        for section in &article.sections {
            entries.push(IndexEntry {
                kind: EntryKind::Section,
                title: format!("{} - Section {}: {}", article.title, section.number, section.title),
                content: section.content.clone(),
                target_id: target_id.clone(),
                parent_title: Some(article.title.clone()),
            });
        }
    }

    for amendment in &document.amendments {
        entries.push(IndexEntry {
            kind: EntryKind::Amendment,
            title: format!("Amendment {}: {}", amendment.number, amendment.title),
            content: amendment.content.clone(),
            target_id: amendment.target_id(),
            parent_title: None,
        });
    }

    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Amendment, Article, Section};

    fn two_article_doc() -> Document {
        Document {
            preamble: Some("We the People".into()),
            articles: vec![
                Article {
                    number: 1,
                    title: "Article I".into(),
                    sections: vec![
                        Section { number: 1, title: "Powers".into(), content: "Congress.".into() },
                        Section { number: 2, title: "House".into(), content: "Representatives.".into() },
                    ],
                    content: None,
                },
                Article { number: 2, title: "Article II".into(), sections: vec![], content: Some("Executive.".into()) },
            ],
            amendments: vec![Amendment { number: 1, title: "Speech".into(), content: "No law.".into() }],
        }
    }

    #[test]
    fn test_document_order() {
        let index = build_index(&two_article_doc());
        let kinds: Vec<EntryKind> = index.iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![
                EntryKind::Preamble,
                EntryKind::Article,
                EntryKind::Section,
                EntryKind::Section,
                EntryKind::Article,
                EntryKind::Amendment,
            ]
        );
    }

    #[test]
    fn test_entry_fields() {
        let index = build_index(&two_article_doc());

        assert_eq!(index[0].target_id, "preamble");
        assert_eq!(index[1].content, "Congress. Representatives.");
        assert_eq!(index[2].title, "Article I - Section 1: Powers");
        assert_eq!(index[2].target_id, "article-1");
        assert_eq!(index[2].parent_title.as_deref(), Some("Article I"));
        assert_eq!(index[4].content, "Executive.");
        assert_eq!(index[5].title, "Amendment 1: Speech");
        assert_eq!(index[5].target_id, "amendment-1");
    }

    #[test]
    fn test_empty_preamble_is_skipped() {
        let doc = Document { preamble: Some(String::new()), ..two_article_doc() };
        assert_eq!(build_index(&doc)[0].kind, EntryKind::Article);

        let doc = Document { preamble: Some("   ".into()), ..two_article_doc() };
        assert_eq!(build_index(&doc)[0].kind, EntryKind::Preamble);

        let doc = Document { preamble: None, ..two_article_doc() };
        assert_eq!(build_index(&doc).len(), 5);
    }

    #[test]
    fn test_build_is_deterministic() {
        let doc = two_article_doc();
        assert_eq!(build_index(&doc), build_index(&doc.clone()));
    }

    #[test]
    fn test_empty_document() {
        assert!(build_index(&Document::default()).is_empty());
    }
}
