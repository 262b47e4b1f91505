//! Caller-facing facade
//!
//! [`Harvester`] bundles a configured [`Fetcher`] with archive settings and
//! exposes the three operations a UI or CLI needs: extract, classify and
//! build an archive.

use crate::archive::{build_archive, ArchiveOptions, ArchiveOutcome};
use crate::classify::{classify_with, ImageFormat};
use crate::config::Config;
use crate::extract::{extract, Extraction};
use crate::fetch::Fetcher;
use crate::Result;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Entry point for extracting, classifying and packing images
#[derive(Debug, Clone)]
pub struct Harvester {
    fetcher: Fetcher,
    archive_options: ArchiveOptions,
}

impl Harvester {
    /// Creates a harvester from configuration
    ///
    /// # Returns
    ///
    /// * `Ok(Harvester)` - Ready to use
    /// * `Err(HarvestError)` - The HTTP clients could not be built
    pub fn new(config: &Config) -> Result<Self> {
        let fetcher = Fetcher::from_config(config)?;
        Ok(Self::with_fetcher(fetcher, ArchiveOptions::from(&config.archive)))
    }

    /// Creates a harvester around an existing fetcher
    pub fn with_fetcher(fetcher: Fetcher, archive_options: ArchiveOptions) -> Self {
        Self {
            fetcher,
            archive_options,
        }
    }

    pub fn fetcher(&self) -> &Fetcher {
        &self.fetcher
    }

    pub fn archive_options(&self) -> &ArchiveOptions {
        &self.archive_options
    }

    /// Extracts image URLs from a page or direct image link
    pub async fn extract(&self, url: &str) -> Extraction {
        extract(&self.fetcher, url).await
    }

    /// Classifies an image URL, issuing a HEAD request only if needed
    pub async fn classify(&self, url: &str) -> ImageFormat {
        let fetcher = &self.fetcher;
        classify_with(url, move || fetcher.fetch_headers(url)).await
    }

    /// Classifies many URLs at once, returning formats in input order
    ///
    /// URLs with a known extension are answered immediately. The rest run
    /// their header lookups concurrently, at most `max_concurrent_downloads`
    /// at a time.
    pub async fn classify_all(&self, urls: &[String]) -> Vec<ImageFormat> {
        let mut formats = vec![ImageFormat::Img; urls.len()];
        let semaphore = Arc::new(Semaphore::new(
            self.archive_options.max_concurrent_downloads.max(1),
        ));
        let mut tasks = JoinSet::new();

        for (index, url) in urls.iter().enumerate() {
            if let Some(format) = ImageFormat::from_url(url) {
                formats[index] = format;
                continue;
            }

            let harvester = self.clone();
            let semaphore = semaphore.clone();
            let url = url.clone();

            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                (index, harvester.classify(&url).await)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, format)) => formats[index] = format,
                Err(e) => tracing::error!("Classification task aborted: {}", e),
            }
        }

        formats
    }

    /// Downloads the selected URLs into a zip archive
    pub async fn build_archive(&self, selected: &[String]) -> Result<ArchiveOutcome> {
        build_archive(&self.fetcher, selected, &self.archive_options).await
    }
}
