//! HTML parser for discovering image references
//!
//! Collects the `src` of every `<img>` element and resolves it against the page
//! URL. The HTML5 parser recovers from unclosed and misnested tags on its own.

use crate::extract::ExtractedImageSet;
use scraper::{Html, Selector};
use url::Url;

/// Parses HTML content and returns the absolute image URLs it references
///
/// # Extraction Rules
///
/// **Include:**
/// - `<img src="...">` anywhere in the document, resolved against `base_url`
///
/// **Exclude:**
/// - `<img>` without a `src`, or with an empty one
/// - References that do not resolve to `http` or `https` (`data:`, `javascript:`)
///
/// Duplicates (after resolution) are dropped; first-seen order is kept.
///
/// # Example
///
/// ```
/// use image_harvest::extract::parse_image_sources;
/// use url::Url;
///
/// let html = r#"<img src="/a.jpg"><img src="a.jpg"><img src="//cdn.example.com/b.png">"#;
/// let base_url = Url::parse("https://example.com/gallery").unwrap();
/// let images = parse_image_sources(html, &base_url);
/// assert_eq!(
///     images.as_slice(),
///     ["https://example.com/a.jpg", "https://cdn.example.com/b.png"]
/// );
/// ```
pub fn parse_image_sources(html: &str, base_url: &Url) -> ExtractedImageSet {
    let document = Html::parse_document(html);
    let mut images = ExtractedImageSet::new();

    let Ok(img_selector) = Selector::parse("img[src]") else {
        return images;
    };

    for element in document.select(&img_selector) {
        if let Some(src) = element.value().attr("src") {
            if let Some(absolute_url) = resolve_src(src, base_url) {
                images.insert(absolute_url);
            }
        }
    }

    images
}

/// Resolves a `src` value to an absolute URL and validates it
///
/// Stricter than collecting every `src` attribute: values that can never be
/// downloaded over HTTP(S) are dropped here rather than surfacing later as
/// failed downloads.
///
/// Returns None if the reference should be excluded:
/// - Empty or whitespace-only values
/// - Unresolvable references
/// - Non-HTTP(S) URLs after resolution (`data:`, `javascript:`, ...)
fn resolve_src(src: &str, base_url: &Url) -> Option<String> {
    let src = src.trim();

    if src.is_empty() {
        return None;
    }

    let absolute_url = resolve_url(base_url, src)?;
    let scheme_ok = Url::parse(&absolute_url)
        .map(|parsed| matches!(parsed.scheme(), "http" | "https"))
        .unwrap_or(false);

    scheme_ok.then_some(absolute_url)
}

/// Joins a reference onto a base URL using standard URL resolution
///
/// Relative paths, root-relative paths and protocol-relative references are
/// joined onto `base_url`. A reference that is already an absolute URL is
/// returned exactly as written (after trimming), without re-canonicalizing
/// its scheme, host or path.
///
/// # Examples
///
/// ```
/// use image_harvest::extract::resolve_url;
/// use url::Url;
///
/// let base = Url::parse("https://example.com/gallery/index.html").unwrap();
/// assert_eq!(resolve_url(&base, "thumb.png").unwrap(), "https://example.com/gallery/thumb.png");
/// assert_eq!(resolve_url(&base, "//cdn.example.com/x.gif").unwrap(), "https://cdn.example.com/x.gif");
/// assert_eq!(resolve_url(&base, "HTTP://Other.org/y.jpg").unwrap(), "HTTP://Other.org/y.jpg");
/// ```
pub fn resolve_url(base_url: &Url, reference: &str) -> Option<String> {
    let reference = reference.trim();

    if Url::parse(reference).is_ok() {
        return Some(reference.to_string());
    }

    base_url.join(reference).ok().map(String::from)
}
