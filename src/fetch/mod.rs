//! Resilient HTTP retrieval
//!
//! This module contains everything that talks to the network:
//! - GET and HEAD requests with a single verify-then-fallback retry
//! - A case-insensitive header map
//! - Injectable response caches with passive expiry

mod cache;
mod fetcher;
mod headers;

pub use cache::{CachedEntry, NoCache, ResponseCache, TtlCache};
pub use fetcher::{build_http_client, FetchedResponse, Fetcher};
pub use headers::Headers;
