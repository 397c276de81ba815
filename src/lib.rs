//! forum-harvest: a resilient forum thread crawler
//!
//! This crate tracks discussion threads on vBulletin-style ("legacy family")
//! and XenForo-style ("modern family") forums. It detects the engine, walks a
//! thread page by page through a blocking-aware HTTP session, extracts posts
//! with layered fallback selectors, normalizes their dates and yields them as
//! a lazy stream of events.

pub mod config;
pub mod crawler;
pub mod dates;
pub mod detect;
pub mod extract;
pub mod http;
pub mod model;

use thiserror::Error;

/// Main error type for forum-harvest operations
///
/// Only failures of the API itself are errors. Blocked pages, HTTP error
/// statuses and unparseable pages are reported inside the crawl as
/// [`model::CrawlEvent::Error`] events.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Request to {url} failed after {attempts} attempt(s): {source}")]
    Transport {
        url: String,
        attempts: usize,
        source: reqwest::Error,
    },

    #[error("Invalid URL {url}: {source}")]
    InvalidUrl {
        url: String,
        source: ::url::ParseError,
    },

    #[error("HTTP client error: {0}")]
    ClientBuild(reqwest::Error),

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

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for forum-harvest operations
pub type Result<T> = std::result::Result<T, CrawlError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{crawl_topic, crawl_topic_with, resolve_family, PaginationWalker};
pub use dates::{resolve_date, DateResolver};
pub use detect::{classify, detect, detect_with, Detection};
pub use extract::{Extractor, ForumEngine, LegacyExtractor, ModernExtractor};
pub use http::{ClientConfig, FetchOutcome, RetryClient, RetryPolicy};
pub use model::{CrawlEvent, CrawlRequest, ForumFamily, ForumType, Post, Topic};
