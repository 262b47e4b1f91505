//! Archive member naming
//!
//! Member names follow
//! `{basename}_{YYYYMMDD_HHMMSS}_{md5(url)[..6]}_{ordinal}{extension}`.
//! The ordinal alone keeps names unique inside one batch; the hash keeps names
//! distinguishable across batches that share a timestamp.

use crate::classify::{last_segment, split_extension};
use chrono::NaiveDateTime;
use md5::{Digest, Md5};

/// strftime pattern for the timestamp part of a member name
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Maximum number of characters kept from the original file name
const MAX_BASENAME_CHARS: usize = 20;

/// Number of hex characters kept from the URL digest
const HASH_PREFIX_LEN: usize = 6;

/// Builds the archive member name for one downloaded image
///
/// # Arguments
///
/// * `url` - The image URL
/// * `timestamp` - The batch timestamp
/// * `ordinal` - 1-based position of the URL in the selection
/// * `content_type` - The `content-type` of the download response
pub fn entry_name(
    url: &str,
    timestamp: &NaiveDateTime,
    ordinal: usize,
    content_type: &str,
) -> String {
    format!(
        "{}_{}_{}_{}{}",
        sanitize_basename(url),
        timestamp.format(TIMESTAMP_FORMAT),
        url_hash(url),
        ordinal,
        extension_for_content_type(content_type)
    )
}

/// The URL's file name without extension, alphanumerics only, at most 20 chars
pub fn sanitize_basename(url: &str) -> String {
    let segment = last_segment(url);
    let (stem, _) = split_extension(&segment);

    stem.chars()
        .filter(|c| c.is_alphanumeric())
        .take(MAX_BASENAME_CHARS)
        .collect()
}

/// First six hex characters of the MD5 digest of the URL
pub fn url_hash(url: &str) -> String {
    let digest = hex::encode(Md5::digest(url.as_bytes()));
    digest[..HASH_PREFIX_LEN].to_string()
}

/// File extension implied by a content-type, or `""` if unrecognized
///
/// Checked in order: jpeg/jpg, png, gif, webp, svg.
pub fn extension_for_content_type(content_type: &str) -> &'static str {
    let content_type = content_type.to_lowercase();

    if content_type.contains("jpeg") || content_type.contains("jpg") {
        ".jpg"
    } else if content_type.contains("png") {
        ".png"
    } else if content_type.contains("gif") {
        ".gif"
    } else if content_type.contains("webp") {
        ".webp"
    } else if content_type.contains("svg") {
        ".svg"
    } else {
        ""
    }
}
