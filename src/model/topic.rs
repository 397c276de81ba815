/// Topic and crawl request definitions
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Forum engine configured for a topic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ForumType {
    /// vBulletin-style table/list markup
    #[serde(rename = "legacy-family", alias = "legacy", alias = "vbulletin")]
    Legacy,

    /// XenForo-style article markup
    #[serde(rename = "modern-family", alias = "modern", alias = "xenforo")]
    Modern,

    /// Let the detector decide
    #[serde(rename = "auto")]
    Auto,
}

impl Default for ForumType {
    fn default() -> Self {
        Self::Auto
    }
}

/// Forum family as seen by the detector and the extractors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ForumFamily {
    Legacy,
    Modern,
    Unknown,
}

impl ForumFamily {
    /// Guesses the family from the thread URL alone
    ///
    /// Used when detection is unavailable. Modern-family threads live under
    /// `/threads/`; everything else is assumed to be legacy.
    pub fn guess_from_url(url: &str) -> Self {
        let lower = url.to_lowercase();
        if lower.contains("xenforo") || lower.contains("/threads/") {
            Self::Modern
        } else {
            Self::Legacy
        }
    }

    /// Returns the string representation used in logs and CLI output
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Legacy => "legacy",
            Self::Modern => "modern",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ForumFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<ForumType> for ForumFamily {
    fn from(value: ForumType) -> Self {
        match value {
            ForumType::Legacy => Self::Legacy,
            ForumType::Modern => Self::Modern,
            ForumType::Auto => Self::Unknown,
        }
    }
}

/// One tracked thread
///
/// `url` is always the page-1 URL. Other page URLs are derived from it by the
/// walker and never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
    /// Caller-assigned opaque identifier
    pub id: String,

    /// Display name
    pub name: String,

    /// Canonical page-1 URL of the thread
    pub url: String,

    /// Configured forum engine
    #[serde(rename = "forum-type", default)]
    pub forum_type: ForumType,

    /// Session cookies to inject (e.g. `cf_clearance`)
    #[serde(default)]
    pub cookies: BTreeMap<String, String>,

    /// Fixed user agent; a random one from the pool is used when absent
    #[serde(rename = "user-agent", default)]
    pub user_agent: Option<String>,
}

impl Topic {
    /// Creates a topic with no cookies and no user-agent override
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        url: impl Into<String>,
        forum_type: ForumType,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            url: url.into(),
            forum_type,
            cookies: BTreeMap::new(),
            user_agent: None,
        }
    }
}

/// Per-crawl bounds passed to the walker
#[derive(Debug, Clone)]
pub struct CrawlRequest {
    /// Inclusive lower bound on post timestamps
    pub since: DateTime<Utc>,

    /// Hard ceiling on the number of pages fetched
    pub max_pages: u32,

    /// Pause between page fetches
    pub delay: Duration,
}

impl CrawlRequest {
    pub fn new(since: DateTime<Utc>, max_pages: u32, delay: Duration) -> Self {
        Self {
            since,
            max_pages,
            delay,
        }
    }
}
