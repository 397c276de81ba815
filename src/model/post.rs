/// Post record definitions
///
/// A `Post` is created by an extractor from one page's markup and is never
/// mutated by the crawler afterwards.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Author sentinel used when no author could be resolved
pub const UNKNOWN_AUTHOR: &str = "Unknown";

/// One forum message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    /// Forum-native identifier, or `unknown-<n>` when unparsable.
    /// Not unique across runs; see [`Post::fingerprint`].
    pub id: String,

    /// Identifier of the topic this post belongs to
    pub topic_id: String,

    /// Author display name, or [`UNKNOWN_AUTHOR`]
    pub author: String,

    /// Absolute post time (serialized as RFC 3339)
    pub timestamp: DateTime<Utc>,

    /// Plain text body with quote blocks removed
    pub content_original: String,

    /// Translated body, filled in by a downstream translation step
    #[serde(default)]
    pub content_translated: Option<String>,

    /// Absolute link to the post, when the markup exposes one
    #[serde(default)]
    pub permalink: Option<String>,
}

impl Post {
    /// Builds the synthesized identifier for the `index`-th post of a page
    pub fn fallback_id(index: usize) -> String {
        format!("unknown-{}", index)
    }

    /// Returns true if the id was synthesized rather than read from markup
    pub fn has_fallback_id(&self) -> bool {
        self.id.starts_with("unknown-")
    }

    /// Stable fingerprint of the post
    ///
    /// Hashes `(topic_id, author, timestamp, content)` with SHA-256. Unlike
    /// `id`, this survives repeated crawls of the same thread. The walker
    /// only falls back to it for posts without a native id.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.topic_id.as_bytes());
        hasher.update([0u8]);
        hasher.update(self.author.as_bytes());
        hasher.update([0u8]);
        hasher.update(self.timestamp.to_rfc3339().as_bytes());
        hasher.update([0u8]);
        hasher.update(self.content_original.as_bytes());
        hex::encode(hasher.finalize())
    }
}
