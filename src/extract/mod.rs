//! Image extraction from a page or direct image link
//!
//! This module turns one user-supplied URL into an ordered, deduplicated set of
//! absolute image URLs:
//! - A URL that itself serves an image yields just that URL
//! - Otherwise the page is fetched and its `<img>` elements are collected
//!
//! Extraction never fails. Problems come back as an empty set with a [`Notice`].

mod parser;

use crate::classify::guess_is_image;
use crate::fetch::Fetcher;
use crate::{FetchError, Notice};
use std::collections::HashSet;
use url::Url;

pub use parser::{parse_image_sources, resolve_url};

/// Ordered set of absolute image URLs, unique by exact string
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedImageSet {
    urls: Vec<String>,
    seen: HashSet<String>,
}

impl ExtractedImageSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a URL, returning false if it was already present
    pub fn insert(&mut self, url: impl Into<String>) -> bool {
        let url = url.into();
        if self.seen.contains(&url) {
            return false;
        }
        self.seen.insert(url.clone());
        self.urls.push(url);
        true
    }

    pub fn contains(&self, url: &str) -> bool {
        self.seen.contains(url)
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    /// URLs in first-seen order
    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.urls.iter()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.urls
    }

    pub fn into_vec(self) -> Vec<String> {
        self.urls
    }
}

impl<S: Into<String>> FromIterator<S> for ExtractedImageSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = Self::new();
        for url in iter {
            set.insert(url);
        }
        set
    }
}

impl<'a> IntoIterator for &'a ExtractedImageSet {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Outcome of an extraction
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    /// The images found (possibly none)
    pub images: ExtractedImageSet,

    /// Why the set is empty, when a failure caused it
    pub notice: Option<Notice>,

    /// True when the input URL was itself an image
    pub direct: bool,
}

impl Extraction {
    fn direct(url: &str) -> Self {
        Self {
            images: std::iter::once(url).collect(),
            notice: None,
            direct: true,
        }
    }

    fn failed(error: FetchError) -> Self {
        Self {
            images: ExtractedImageSet::new(),
            notice: Some(Notice::from(error)),
            direct: false,
        }
    }
}

/// Extracts the image URLs referenced by `url`
///
/// # Flow
///
/// 1. Reject input that is not an absolute URL (Parse notice)
/// 2. If the URL serves an image, return it unchanged without parsing HTML
/// 3. Fetch the page; on failure return an empty set with a notice
/// 4. Collect `<img src>` values, resolve them against `url`, deduplicate
///
/// A page with no images yields an empty set and no notice.
pub async fn extract(fetcher: &Fetcher, url: &str) -> Extraction {
    let base_url = match Url::parse(url) {
        Ok(base_url) => base_url,
        Err(e) => {
            tracing::warn!("Cannot extract from {}: {}", url, e);
            return Extraction::failed(FetchError::Parse {
                url: url.to_string(),
                message: e.to_string(),
            });
        }
    };

    if is_image_url(fetcher, url).await {
        tracing::debug!("{} is a direct image link", url);
        return Extraction::direct(url);
    }

    let page = match fetcher.fetch_content(url).await {
        Ok(page) => page,
        Err(e) => {
            tracing::warn!("Failed to fetch content: {}", e);
            return Extraction::failed(e);
        }
    };

    let html = String::from_utf8_lossy(&page.body);
    let images = parse_image_sources(&html, &base_url);
    tracing::info!("Found {} image(s) on {}", images.len(), url);

    Extraction {
        images,
        notice: None,
        direct: false,
    }
}

/// Checks whether a URL serves an image
///
/// Uses the `content-type` of the HEAD response, whatever its status. Only
/// when the HEAD request gets no response at all does it fall back to
/// guessing from the URL's extension.
pub async fn is_image_url(fetcher: &Fetcher, url: &str) -> bool {
    match fetcher.probe_headers(url).await {
        Ok(headers) => headers.content_type().starts_with("image/"),
        Err(e) => {
            tracing::debug!("HEAD failed for {} ({}), guessing from extension", url, e);
            guess_is_image(url)
        }
    }
}
