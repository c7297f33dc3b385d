//! Anchor extraction from search result pages.

use std::sync::LazyLock;

use scraper::{Html, Selector};

static ANCHOR_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a").expect("anchor selector is valid"));

/// An `<a>` element found in a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anchor {
    /// Value of the `href` attribute, if present.
    pub href: Option<String>,
    /// Visible text of the anchor, whitespace-trimmed.
    pub text: String,
}

impl Anchor {
    /// Returns the `href` attribute.
    pub fn href(&self) -> Option<&str> {
        self.href.as_deref()
    }
}

/// Returns every anchor in `html`, in document order.
///
/// Parsing is best-effort: malformed markup yields whatever anchors the
/// parser recovers, possibly none.
pub fn extract_links(html: &str) -> Vec<Anchor> {
    let document = Html::parse_document(html);
    document
        .select(&ANCHOR_SELECTOR)
        .map(|el| Anchor {
            href: el.value().attr("href").map(str::to_string),
            text: el.text().collect::<String>().trim().to_string(),
        })
        .collect()
}

/// Same as [`extract_links`] for raw page bytes, decoded lossily as UTF-8.
pub fn extract_links_from_bytes(content: &[u8]) -> Vec<Anchor> {
    extract_links(&String::from_utf8_lossy(content))
}
