//! HTML-to-text helpers shared by the crawler and the extractor.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

static WHITESPACE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

/// Subtrees whose text never counts as readable page content.
const SKIPPED_TAGS: &[&str] = &[
    "script", "style", "noscript", "nav", "header", "footer", "aside", "iframe", "svg", "template",
];

/// Collapses runs of whitespace to a single space and trims the ends.
pub fn normalize_whitespace(text: &str) -> String {
    WHITESPACE_REGEX.replace_all(text, " ").trim().to_string()
}

/// Keeps at most `max_chars` characters.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => text[..byte_idx].to_string(),
        None => text.to_string(),
    }
}

pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Parses a selector list, returning `None` for invalid input.
pub(crate) fn selector(css: &str) -> Option<Selector> {
    Selector::parse(css).ok()
}

/// Whitespace-normalized text of `element`, skipping script, style and
/// navigation subtrees.
pub(crate) fn visible_text(element: ElementRef<'_>) -> String {
    let mut out = String::new();
    for node in element.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|el| SKIPPED_TAGS.contains(&el.name()))
        });
        if !hidden {
            out.push_str(text);
            out.push(' ');
        }
    }
    normalize_whitespace(&out)
}

/// Plain text of the whole body element.
pub fn html_to_text(html: &str) -> String {
    let document = Html::parse_document(html);
    body_text(&document)
}

pub(crate) fn body_text(document: &Html) -> String {
    selector("body")
        .and_then(|sel| document.select(&sel).next())
        .map_or_else(|| visible_text(document.root_element()), visible_text)
}

/// Text of the first selector in `containers` that matches a non-empty
/// element, in list order.
pub(crate) fn first_container_text(document: &Html, containers: &[&str]) -> Option<String> {
    containers.iter().find_map(|css| {
        let sel = selector(css)?;
        document
            .select(&sel)
            .map(visible_text)
            .find(|text| !text.is_empty())
    })
}

/// Container text when one matches, otherwise the full body text.
pub fn container_or_body_text(html: &str, containers: &[&str]) -> String {
    let document = Html::parse_document(html);
    first_container_text(&document, containers).unwrap_or_else(|| body_text(&document))
}
