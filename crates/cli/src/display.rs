//! Plain-text rendering of reader views.

use charter_core::reader::{SearchPage, TargetView};
use charter_core::search::highlight::{MARK_CLOSE, MARK_OPEN};

const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

/// Swap `<mark>` tags for terminal bold.
pub fn marks_to_ansi(text: &str) -> String {
    text.replace(MARK_OPEN, BOLD).replace(MARK_CLOSE, RESET)
}

pub fn search_page(page: &SearchPage) -> String {
    if page.hits.is_empty() {
        return format!("No results found for \"{}\"\n", page.query);
    }

    let mut out = format!("{} result(s) for \"{}\"", page.total, page.query);
    if page.hits.len() < page.total {
        out.push_str(&format!(", showing {}", page.hits.len()));
    }
    out.push('\n');

    for (i, hit) in page.hits.iter().enumerate() {
        out.push_str(&format!(
            "\n{:>2}. {}  [{} #{}]\n    {}\n",
            i + 1,
            marks_to_ansi(&hit.title),
            hit.kind.as_str(),
            hit.target_id,
            marks_to_ansi(&hit.excerpt)
        ));
    }
    out
}

pub fn target(view: &TargetView) -> String {
    match view {
        TargetView::Preamble { text } => format!("Preamble\n\n{text}\n"),
        TargetView::Article(article) => {
            let mut out = format!("{}\n", article.title);
            if let Some(content) = article.content.as_deref().filter(|c| !c.is_empty()) {
                out.push_str(&format!("\n{content}\n"));
            }
            for section in &article.sections {
                out.push_str(&format!("\nSection {}: {}\n{}\n", section.number, section.title, section.content));
            }
            out
        }
        TargetView::Amendment(amendment) => {
            format!("Amendment {}: {}\n\n{}\n", amendment.number, amendment.title, amendment.content)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use charter_core::{Document, Reader, ReaderOptions};

    #[test]
    fn test_marks_become_bold() {
        assert_eq!(marks_to_ansi("a <mark>b</mark> c"), "a \x1b[1mb\x1b[0m c");
    }

    #[test]
    fn test_empty_page_message() {
        let page = SearchPage { query: "zebra".into(), total: 0, hits: vec![] };
        assert_eq!(search_page(&page), "No results found for \"zebra\"\n");
    }

    #[test]
    fn test_truncated_page_header() {
        let reader = Reader::new(Document::fallback(), ReaderOptions::default());
        let page = reader.search("the", 1).unwrap();
        assert!(search_page(&page).contains("showing 1"));
    }

    #[test]
    fn test_target_amendment() {
        let reader = Reader::new(Document::fallback(), ReaderOptions::default());
        let view = reader.target("amendment-1").unwrap();
        assert!(target(&view).starts_with("Amendment 1: First Amendment"));
    }
}
