//! Image format classification
//!
//! This module maps an image URL, and if needed its response headers, onto a
//! canonical [`ImageFormat`] tag.

mod extension;

use crate::fetch::Headers;
use std::fmt;
use std::future::Future;

pub use extension::{guess_is_image, last_segment, path_extension, split_extension};

/// Canonical image format tags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageFormat {
    Jpg,
    Png,
    Gif,
    Webp,
    Svg,
    /// Unknown or generic image
    Img,
}

impl ImageFormat {
    /// Maps a file extension (without the dot, any case) to a format
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(Self::Jpg),
            "png" => Some(Self::Png),
            "gif" => Some(Self::Gif),
            "webp" => Some(Self::Webp),
            "svg" => Some(Self::Svg),
            _ => None,
        }
    }

    /// Maps the extension of a URL's path to a format
    pub fn from_url(url: &str) -> Option<Self> {
        path_extension(url).and_then(|ext| Self::from_extension(&ext))
    }

    /// Matches a content-type value by substring
    ///
    /// Checked in order: gif, jpeg/jpg, png, webp, svg.
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let content_type = content_type.to_lowercase();

        if content_type.contains("gif") {
            Some(Self::Gif)
        } else if content_type.contains("jpeg") || content_type.contains("jpg") {
            Some(Self::Jpg)
        } else if content_type.contains("png") {
            Some(Self::Png)
        } else if content_type.contains("webp") {
            Some(Self::Webp)
        } else if content_type.contains("svg") {
            Some(Self::Svg)
        } else {
            None
        }
    }

    /// Upper-case display label, e.g. `"JPG"`
    pub fn label(&self) -> &'static str {
        match self {
            Self::Jpg => "JPG",
            Self::Png => "PNG",
            Self::Gif => "GIF",
            Self::Webp => "WEBP",
            Self::Svg => "SVG",
            Self::Img => "IMG",
        }
    }

    /// Badge class name for presentation layers, e.g. `"gif-badge"`
    pub fn badge(&self) -> &'static str {
        match self {
            Self::Jpg => "jpg-badge",
            Self::Png => "png-badge",
            Self::Gif => "gif-badge",
            Self::Webp => "webp-badge",
            Self::Svg => "svg-badge",
            Self::Img => "img-badge",
        }
    }

    /// Returns true unless this is the generic [`ImageFormat::Img`] tag
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Img)
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Classifies an image URL, looking at headers only when the URL is silent
///
/// Classification follows this priority order:
/// 1. The URL path's extension (case-insensitive)
/// 2. The `content-type` header returned by `header_lookup`
/// 3. [`ImageFormat::Img`]
///
/// `header_lookup` is only invoked when step 1 finds nothing. It is expected
/// to absorb its own failures by returning empty headers, so classification
/// never fails.
///
/// # Example
///
/// ```no_run
/// use image_harvest::classify::{classify_with, ImageFormat};
/// use image_harvest::fetch::Headers;
///
/// # async fn example() {
/// let format = classify_with("photo.GIF", || async { Headers::new() }).await;
/// assert_eq!(format, ImageFormat::Gif);
/// # }
/// ```
pub async fn classify_with<F, Fut>(url: &str, header_lookup: F) -> ImageFormat
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Headers>,
{
    // Priority 1: URL extension
    if let Some(format) = ImageFormat::from_url(url) {
        return format;
    }

    // Priority 2: content-type header
    let headers = header_lookup().await;
    classify_headers(url, &headers)
}

/// Synchronous variant of [`classify_with`] for headers already in hand
///
/// # Examples
///
/// ```
/// use image_harvest::classify::{classify_headers, ImageFormat};
/// use image_harvest::fetch::Headers;
///
/// let headers: Headers = [("content-type", "image/gif")].into_iter().collect();
/// assert_eq!(classify_headers("https://example.com/pic.png", &headers), ImageFormat::Png);
/// assert_eq!(classify_headers("https://example.com/pic", &headers), ImageFormat::Gif);
/// ```
pub fn classify_headers(url: &str, headers: &Headers) -> ImageFormat {
    ImageFormat::from_url(url)
        .or_else(|| ImageFormat::from_content_type(&headers.content_type()))
        .unwrap_or(ImageFormat::Img)
}
