//! Zip archive assembly for selected images
//!
//! This module downloads every selected URL and packs the bytes into a single
//! in-memory zip archive:
//! - Ordinals are assigned in selection order before any download starts
//! - Downloads run concurrently, bounded by a semaphore
//! - Members are written in ordinal order once all downloads settle
//! - A failed download is skipped and reported as a [`Notice`]

mod naming;

use crate::config::{ArchiveConfig, Compression};
use crate::fetch::Fetcher;
use crate::{FetchError, Notice, Result};
use chrono::{Local, NaiveDateTime};
use std::io::{Cursor, Write};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use zip::write::FileOptions;
use zip::ZipWriter;

pub use naming::{
    entry_name, extension_for_content_type, sanitize_basename, url_hash, TIMESTAMP_FORMAT,
};

/// One member of the archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Unique member name
    pub name: String,

    /// Downloaded bytes
    pub content: Vec<u8>,
}

/// Summary of a member that made it into the archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedEntry {
    /// 1-based position in the selection
    pub ordinal: usize,

    /// Source URL
    pub url: String,

    /// Member name inside the archive
    pub name: String,

    /// Size of the member in bytes
    pub size: usize,
}

/// Result of building an archive
#[derive(Debug, Clone, Default)]
pub struct ArchiveOutcome {
    /// The finished zip archive
    pub bytes: Vec<u8>,

    /// Members written, in ordinal order
    pub entries: Vec<PackedEntry>,

    /// One notice per skipped URL, in ordinal order
    pub notices: Vec<Notice>,
}

/// Knobs for a single archive build
#[derive(Debug, Clone)]
pub struct ArchiveOptions {
    /// Maximum downloads in flight at once
    pub max_concurrent_downloads: usize,

    /// Compression applied to members
    pub compression: Compression,

    /// Fixed batch timestamp; the local time at build start when unset
    pub timestamp: Option<NaiveDateTime>,
}

impl Default for ArchiveOptions {
    fn default() -> Self {
        Self::from(&ArchiveConfig::default())
    }
}

impl From<&ArchiveConfig> for ArchiveOptions {
    fn from(config: &ArchiveConfig) -> Self {
        Self {
            max_concurrent_downloads: config.max_concurrent_downloads,
            compression: config.compression,
            timestamp: None,
        }
    }
}

/// Downloads the selected URLs and packs them into a zip archive
///
/// # Arguments
///
/// * `fetcher` - The fetcher used for downloads
/// * `selected` - Selected image URLs, in selection order
/// * `options` - Concurrency, compression and timestamp settings
///
/// # Returns
///
/// * `Ok(ArchiveOutcome)` - The archive plus per-URL notices; an empty or
///   all-failed selection still yields a valid, empty archive
/// * `Err(HarvestError)` - The zip writer itself failed
pub async fn build_archive(
    fetcher: &Fetcher,
    selected: &[String],
    options: &ArchiveOptions,
) -> Result<ArchiveOutcome> {
    let timestamp = options
        .timestamp
        .unwrap_or_else(|| Local::now().naive_local());

    let downloads = download_all(
        fetcher,
        selected,
        options.max_concurrent_downloads,
        timestamp,
    )
    .await;

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let file_options = FileOptions::default()
        .compression_method(options.compression.into())
        .unix_permissions(0o644);

    let mut entries = Vec::new();
    let mut notices = Vec::new();

    for (index, (url, download)) in selected.iter().zip(downloads).enumerate() {
        let ordinal = index + 1;
        match download {
            Ok(entry) => {
                writer.start_file(entry.name.as_str(), file_options)?;
                writer.write_all(&entry.content)?;
                entries.push(PackedEntry {
                    ordinal,
                    url: url.clone(),
                    size: entry.content.len(),
                    name: entry.name,
                });
            }
            Err(e) => {
                tracing::warn!("Failed to download {}: {}", url, e);
                notices.push(Notice {
                    url: url.clone(),
                    error: e,
                });
            }
        }
    }

    let bytes = writer.finish()?.into_inner();

    tracing::info!(
        "Archive built: {} of {} image(s) packed, {} skipped, {} bytes",
        entries.len(),
        selected.len(),
        notices.len(),
        bytes.len()
    );

    Ok(ArchiveOutcome {
        bytes,
        entries,
        notices,
    })
}

/// Downloads every URL concurrently; results come back in input order
async fn download_all(
    fetcher: &Fetcher,
    selected: &[String],
    max_concurrent: usize,
    timestamp: NaiveDateTime,
) -> Vec<std::result::Result<ArchiveEntry, FetchError>> {
    let semaphore = Arc::new(Semaphore::new(max_concurrent.max(1)));
    let mut tasks = JoinSet::new();

    for (index, url) in selected.iter().enumerate() {
        let ordinal = index + 1;
        let fetcher = fetcher.clone();
        let semaphore = semaphore.clone();
        let url = url.clone();

        tasks.spawn(async move {
            let _permit = semaphore.acquire_owned().await;
            let result = download_entry(&fetcher, &url, ordinal, &timestamp).await;
            (index, result)
        });
    }

    let mut results: Vec<Option<std::result::Result<ArchiveEntry, FetchError>>> =
        (0..selected.len()).map(|_| None).collect();

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, result)) => results[index] = Some(result),
            Err(e) => tracing::error!("Download task aborted: {}", e),
        }
    }

    results
        .into_iter()
        .zip(selected)
        .map(|(result, url)| {
            result.unwrap_or_else(|| {
                Err(FetchError::Network {
                    url: url.clone(),
                    message: "download task aborted".to_string(),
                })
            })
        })
        .collect()
}

/// Downloads one image and names it
///
/// Anything but HTTP 200 is a failure.
async fn download_entry(
    fetcher: &Fetcher,
    url: &str,
    ordinal: usize,
    timestamp: &NaiveDateTime,
) -> std::result::Result<ArchiveEntry, FetchError> {
    let response = fetcher.download(url).await?;

    if response.status_code != 200 {
        return Err(FetchError::HttpStatus {
            url: url.to_string(),
            status: response.status_code,
        });
    }

    let name = entry_name(url, timestamp, ordinal, &response.headers.content_type());
    tracing::debug!("Downloaded {} ({} bytes) as {}", url, response.body.len(), name);

    Ok(ArchiveEntry {
        name,
        content: response.body,
    })
}
