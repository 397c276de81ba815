/// Crawl event definitions
use crate::model::Post;
use serde::{Deserialize, Serialize};

/// Error record interleaved with posts in the event stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventError {
    /// Human-readable description, including remediation hints when blocked
    pub message: String,

    /// Page number the error belongs to (1-based)
    pub page: u32,
}

/// An item yielded by the pagination walker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum CrawlEvent {
    Post(Post),
    Error(EventError),
}

impl CrawlEvent {
    pub fn error(message: impl Into<String>, page: u32) -> Self {
        Self::Error(EventError {
            message: message.into(),
            page,
        })
    }

    /// Returns the post if this event carries one
    pub fn as_post(&self) -> Option<&Post> {
        match self {
            Self::Post(post) => Some(post),
            Self::Error(_) => None,
        }
    }

    /// Returns the error if this event carries one
    pub fn as_error(&self) -> Option<&EventError> {
        match self {
            Self::Post(_) => None,
            Self::Error(err) => Some(err),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}
