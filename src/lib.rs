//! Image-Harvest: pull images off a web page and pack them into a zip
//!
//! This crate finds the images referenced by a page (or recognizes a direct
//! image link), classifies them by format, lets the caller pick a subset, and
//! packages the picked images into a single in-memory zip archive.
//!
//! Every network failure degrades to a usable value plus a [`Notice`] rather
//! than an error, so an interactive caller always has something to show.

pub mod archive;
pub mod classify;
pub mod config;
pub mod extract;
pub mod fetch;
pub mod harvester;
pub mod selection;

use std::fmt;
use thiserror::Error;

/// Main error type for Image-Harvest operations
///
/// Only setup problems and archive-writer failures end up here; per-URL
/// failures travel as [`Notice`] values instead.
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Failure of a single request, after the verification fallback has run
///
/// Certificate failures never appear here on their own: they trigger the
/// insecure retry and only surface as [`FetchError::Network`] if that retry
/// fails as well.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("Network error for {url}: {message}")]
    Network { url: String, message: String },

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("HTTP {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Parse error for {url}: {message}")]
    Parse { url: String, message: String },

    #[error("No content returned from {url}")]
    NoContent { url: String },
}

impl FetchError {
    /// The URL the failed request was aimed at
    pub fn url(&self) -> &str {
        match self {
            Self::Network { url, .. }
            | Self::Timeout { url }
            | Self::HttpStatus { url, .. }
            | Self::Parse { url, .. }
            | Self::NoContent { url } => url,
        }
    }

    /// Short machine-friendly name of the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Network { .. } => "network",
            Self::Timeout { .. } => "timeout",
            Self::HttpStatus { .. } => "http-status",
            Self::Parse { .. } => "parse",
            Self::NoContent { .. } => "no-content",
        }
    }
}

/// A non-fatal failure reported alongside a degraded result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// The URL the notice is about
    pub url: String,

    /// What went wrong
    pub error: FetchError,
}

impl From<FetchError> for Notice {
    fn from(error: FetchError) -> Self {
        Self {
            url: error.url().to_string(),
            error,
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)
    }
}

/// Result type alias for Image-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for single requests
pub type FetchResult<T> = std::result::Result<T, FetchError>;

// Re-export commonly used types
pub use archive::{build_archive, ArchiveOutcome};
pub use classify::{classify_with, ImageFormat};
pub use config::Config;
pub use extract::{extract, ExtractedImageSet, Extraction};
pub use fetch::{FetchedResponse, Fetcher, Headers};
pub use harvester::Harvester;
pub use selection::SelectionMap;
