//! HTML parsing for link extraction
//!
//! This module handles:
//! - Pulling raw `href` values out of every `<a>` element
//! - Reading the page title for the built-in analyzer
//!
//! Hrefs are returned as written in the document. Resolution, canonicalization
//! and filtering happen in the frontier.

use scraper::{Html, Selector};
use url::Url;

/// Extracts every anchor href from an HTML body
///
/// # Arguments
///
/// * `html` - The HTML content to parse
/// * `page_url` - The URL the body was fetched from
///
/// # Returns
///
/// The trimmed, non-empty `href` values in document order
///
/// # Example
///
/// ```
/// use url::Url;
/// use wavecrawl::crawler::extract_links;
///
/// let html = r#"<a href=" /a ">A</a><a href="">empty</a><a href="mailto:x@y.z">mail</a>"#;
/// let page = Url::parse("https://example.com/").unwrap();
/// assert_eq!(extract_links(html, &page), vec!["/a", "mailto:x@y.z"]);
/// ```
pub fn extract_links(html: &str, page_url: &Url) -> Vec<String> {
    let document = Html::parse_document(html);
    let links = extract_links_from_document(&document);
    tracing::trace!("Extracted {} links from {}", links.len(), page_url);
    links
}

/// Extracts anchor hrefs from an already parsed document
pub fn extract_links_from_document(document: &Html) -> Vec<String> {
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    document
        .select(&selector)
        .filter_map(|element| element.value().attr("href"))
        .map(str::trim)
        .filter(|href| !href.is_empty())
        .map(str::to_string)
        .collect()
}

/// Extracts the page title from the HTML document
pub fn extract_title(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Returns true if a Content-Type header value denotes an HTML document
pub fn is_html_content_type(content_type: &str) -> bool {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    mime == "text/html" || mime == "application/xhtml+xml"
}
