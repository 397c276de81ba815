//! Post extraction for the supported forum families
//!
//! Each family implements [`ForumEngine`]: how page URLs are built, how the
//! total page count is read from the pagination widget, and how posts are
//! pulled out of a page. Both implementations use layered fallback selectors
//! because every forum theme bends the markup a little differently.
//!
//! # Failure levels
//!
//! - A post whose fields cannot be resolved is logged and skipped
//!   ([`PostFieldError`]); it never reaches the caller.
//! - A page that cannot be decomposed at all returns [`ExtractError`]; the
//!   walker turns it into one error event and moves on.

mod legacy;
mod modern;
mod text;

pub use legacy::LegacyExtractor;
pub use modern::ModernExtractor;
pub use text::{absolute_link, stripped_text, text_without};

use crate::model::{ForumFamily, Post};
use chrono::{DateTime, Utc};
use scraper::Html;
use thiserror::Error;
use url::Url;

/// Page-level extraction failure
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractError {
    #[error("Page body is empty")]
    EmptyPage,

    #[error("Page has no HTML content")]
    NoMarkup,
}

/// Post-level extraction failure (logged, never surfaced)
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PostFieldError {
    #[error("no content region in post container")]
    MissingContent,
}

/// Per-page inputs shared by every post on the page
#[derive(Debug, Clone, Copy)]
pub struct PageContext<'a> {
    /// Topic the posts belong to
    pub topic_id: &'a str,

    /// URL the page was fetched from, for resolving permalinks
    pub page_url: Option<&'a Url>,

    /// Reference time for relative dates
    pub now: DateTime<Utc>,
}

impl<'a> PageContext<'a> {
    pub fn new(topic_id: &'a str) -> Self {
        Self {
            topic_id,
            page_url: None,
            now: Utc::now(),
        }
    }

    pub fn with_page_url(mut self, page_url: &'a Url) -> Self {
        self.page_url = Some(page_url);
        self
    }

    pub fn with_now(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }
}

/// Family-specific crawl rules
pub trait ForumEngine {
    /// The family this engine handles
    fn family(&self) -> ForumFamily;

    /// Builds the URL of `page` (1-based) from the thread's page-1 URL
    ///
    /// Page 1 is always `base_url` unchanged.
    fn page_url(&self, base_url: &str, page: u32) -> String;

    /// Reads the total page count from the pagination widget, 1 if absent
    fn total_pages(&self, document: &Html) -> u32;

    /// Extracts all resolvable posts from a page
    fn extract_posts(&self, document: &Html, ctx: &PageContext<'_>)
        -> Result<Vec<Post>, ExtractError>;
}

/// Engine selected by forum family
#[derive(Debug, Clone)]
pub enum Extractor {
    Legacy(LegacyExtractor),
    Modern(ModernExtractor),
}

impl Extractor {
    /// Returns the default engine for a family, or None for `Unknown`
    pub fn for_family(family: ForumFamily) -> Option<Self> {
        match family {
            ForumFamily::Legacy => Some(Self::Legacy(LegacyExtractor::default())),
            ForumFamily::Modern => Some(Self::Modern(ModernExtractor::default())),
            ForumFamily::Unknown => None,
        }
    }

    /// Parses raw markup and extracts its posts, resolving dates against now
    pub fn extract(&self, markup: &str, topic_id: &str) -> Result<Vec<Post>, ExtractError> {
        if markup.trim().is_empty() {
            return Err(ExtractError::EmptyPage);
        }
        let document = Html::parse_document(markup);
        self.extract_posts(&document, &PageContext::new(topic_id))
    }

    fn engine(&self) -> &dyn ForumEngine {
        match self {
            Self::Legacy(engine) => engine,
            Self::Modern(engine) => engine,
        }
    }
}

impl ForumEngine for Extractor {
    fn family(&self) -> ForumFamily {
        self.engine().family()
    }

    fn page_url(&self, base_url: &str, page: u32) -> String {
        self.engine().page_url(base_url, page)
    }

    fn total_pages(&self, document: &Html) -> u32 {
        self.engine().total_pages(document)
    }

    fn extract_posts(
        &self,
        document: &Html,
        ctx: &PageContext<'_>,
    ) -> Result<Vec<Post>, ExtractError> {
        self.engine().extract_posts(document, ctx)
    }
}

/// Rejects documents with nothing inside `<body>`
///
/// html5ever always synthesizes `<html><head><body>`, so an empty or
/// whitespace-only response still parses; it just carries no content.
pub(crate) fn ensure_markup(document: &Html) -> Result<(), ExtractError> {
    let root = document.root_element();
    let has_content = root.descendants().skip(1).any(|node| match node.value() {
        scraper::Node::Element(element) => !matches!(element.name(), "head" | "body"),
        scraper::Node::Text(text) => !text.trim().is_empty(),
        _ => false,
    });

    if has_content {
        Ok(())
    } else {
        Err(ExtractError::NoMarkup)
    }
}
