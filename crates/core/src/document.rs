//! Constitution document model.
//!
//! The document is loaded once and never mutated. Loading never fails from
//! the caller's point of view: any network, status, parse or validation
//! problem substitutes [`Document::fallback`].

use std::collections::HashSet;
use std::path::Path;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::Error;
use crate::worker::{CacheMode, Network, Request};

/// A constitution: preamble, articles with sections, amendments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Document {
    #[serde(default)]
    pub preamble: Option<String>,
    #[serde(default)]
    pub articles: Vec<Article>,
    #[serde(default)]
    pub amendments: Vec<Amendment>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Article {
    pub number: u32,
    pub title: String,
    #[serde(default)]
    pub sections: Vec<Section>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Section {
    pub number: u32,
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Amendment {
    pub number: u32,
    pub title: String,
    pub content: String,
}

impl Article {
    /// Anchor id used by the renderer and by index entries.
    pub fn target_id(&self) -> String {
        format!("article-{}", self.number)
    }

    /// Whole-article text: own content followed by every section's content.
    pub fn full_text(&self) -> String {
        let mut text = String::new();
        if let Some(content) = self.content.as_deref().filter(|c| !c.is_empty()) {
            text.push_str(content);
            text.push(' ');
        }
        let sections: Vec<&str> = self.sections.iter().map(|s| s.content.as_str()).collect();
        text.push_str(&sections.join(" "));
        text.trim().to_string()
    }
}

impl Amendment {
    pub fn target_id(&self) -> String {
        format!("amendment-{}", self.number)
    }
}

impl Document {
    /// Parse and validate document JSON.
    pub fn from_json(bytes: &[u8]) -> Result<Self, Error> {
        let document: Self = serde_json::from_slice(bytes).map_err(|e| Error::InvalidDocument(e.to_string()))?;
        document.validate()?;
        Ok(document)
    }

    /// Parse JSON, substituting the fallback document on any error.
    pub fn from_json_or_fallback(bytes: &[u8]) -> Self {
        Self::from_json(bytes).unwrap_or_else(|e| {
            tracing::warn!("document JSON rejected, using fallback document: {}", e);
            Self::fallback()
        })
    }

    /// Read a document from a local JSON file, falling back on error.
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match std::fs::read(path) {
            Ok(bytes) => Self::from_json_or_fallback(&bytes),
            Err(e) => {
                tracing::warn!("could not read {}: {}; using fallback document", path.display(), e);
                Self::fallback()
            }
        }
    }

    /// Check that numbers are unique within each collection.
    pub fn validate(&self) -> Result<(), Error> {
        let mut seen = HashSet::new();
        for article in &self.articles {
            if !seen.insert(article.number) {
                return Err(Error::InvalidDocument(format!("duplicate article number {}", article.number)));
            }
            let mut sections = HashSet::new();
            for section in &article.sections {
                if !sections.insert(section.number) {
                    return Err(Error::InvalidDocument(format!(
                        "duplicate section number {} in article {}",
                        section.number, article.number
                    )));
                }
            }
        }

        let mut seen = HashSet::new();
        for amendment in &self.amendments {
            if !seen.insert(amendment.number) {
                return Err(Error::InvalidDocument(format!("duplicate amendment number {}", amendment.number)));
            }
        }

        Ok(())
    }

    /// Non-empty preamble text, if any.
    pub fn preamble_text(&self) -> Option<&str> {
        self.preamble.as_deref().filter(|p| !p.is_empty())
    }

    pub fn article(&self, number: u32) -> Option<&Article> {
        self.articles.iter().find(|a| a.number == number)
    }

    pub fn amendment(&self, number: u32) -> Option<&Amendment> {
        self.amendments.iter().find(|a| a.number == number)
    }

    /// Built-in document used whenever the real one cannot be loaded.
    pub fn fallback() -> Self {
        Self {
            preamble: Some(
                "We the People of the United States, in Order to form a more perfect Union, establish Justice, \
                 insure domestic Tranquility, provide for the common defence, promote the general Welfare, and \
                 secure the Blessings of Liberty to ourselves and our Posterity, do ordain and establish this \
                 Constitution for the United States of America."
                    .into(),
            ),
            articles: vec![Article {
                number: 1,
                title: "Article I - Legislative Branch".into(),
                sections: vec![Section {
                    number: 1,
                    title: "Legislative Powers".into(),
                    content: "All legislative Powers herein granted shall be vested in a Congress of the United \
                              States, which shall consist of a Senate and House of Representatives."
                        .into(),
                }],
                content: None,
            }],
            amendments: vec![Amendment {
                number: 1,
                title: "First Amendment - Freedom of Religion, Speech, Press, Assembly, Petition".into(),
                content: "Congress shall make no law respecting an establishment of religion, or prohibiting the \
                          free exercise thereof; or abridging the freedom of speech, or of the press; or the right \
                          of the people peaceably to assemble, and to petition the Government for a redress of \
                          grievances."
                    .into(),
            }],
        }
    }
}

/// Fetch the document JSON over `network`, falling back on any failure.
///
/// Non-2xx responses, network errors, malformed JSON and invalid documents
/// all produce [`Document::fallback`].
pub async fn load_document<N: Network + ?Sized>(network: &N, url: &Url) -> Document {
    let request = Request::get(url.clone());
    match network.fetch(&request, CacheMode::Default).await {
        Ok(response) if response.ok() => Document::from_json_or_fallback(&response.body),
        Ok(response) => {
            tracing::warn!("document fetch returned HTTP {}, using fallback document", response.status);
            Document::fallback()
        }
        Err(e) => {
            tracing::warn!("document fetch failed ({}), using fallback document", e);
            Document::fallback()
        }
    }
}
