//! Configuration module for Image-Harvest
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every section is optional, so running without a file is the same as running
//! with an empty one.
//!
//! # Example
//!
//! ```no_run
//! use image_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Cache TTL: {}s", config.cache.ttl_secs);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{ArchiveConfig, CacheConfig, Compression, Config, HttpConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
