//! Crawl orchestration for tracked topics
//!
//! This module ties the pieces together:
//! - Resolving a topic's forum family (configured, detected or guessed)
//! - Binding the matching extractor and a fresh HTTP session into a
//!   [`PaginationWalker`]

mod walker;

pub use walker::{PaginationWalker, ProgressFn};

use crate::detect::detect_with;
use crate::extract::{Extractor, ForumEngine, LegacyExtractor};
use crate::http::{ClientConfig, RetryClient};
use crate::model::{CrawlRequest, ForumFamily, ForumType, Topic};
use crate::Result;

/// Resolves the family to crawl a topic with
///
/// Explicit types are used as-is. `auto` runs detection on the topic URL and,
/// when that fails or is inconclusive, falls back to a URL heuristic.
pub async fn resolve_family(topic: &Topic, client: &mut RetryClient) -> ForumFamily {
    if topic.forum_type != ForumType::Auto {
        return topic.forum_type.into();
    }

    match detect_with(client, &topic.url).await {
        Ok(detection) if detection.family != ForumFamily::Unknown => detection.family,
        Ok(detection) => {
            let guess = ForumFamily::guess_from_url(&topic.url);
            tracing::warn!(
                "Could not detect forum type for topic {} ({}), assuming {}",
                topic.id,
                detection.message.lines().next().unwrap_or_default(),
                guess
            );
            guess
        }
        Err(e) => {
            let guess = ForumFamily::guess_from_url(&topic.url);
            tracing::warn!(
                "Detection failed for topic {}: {}, assuming {}",
                topic.id,
                e,
                guess
            );
            guess
        }
    }
}

/// Prepares a walker for `topic` with its own session
pub async fn crawl_topic(topic: Topic, request: CrawlRequest) -> Result<PaginationWalker> {
    let client = RetryClient::new(ClientConfig::for_topic(&topic))?;
    Ok(crawl_topic_with(client, topic, request).await)
}

/// Prepares a walker for `topic` on an existing client
pub async fn crawl_topic_with(
    mut client: RetryClient,
    topic: Topic,
    request: CrawlRequest,
) -> PaginationWalker {
    let family = resolve_family(&topic, &mut client).await;
    let extractor = Extractor::for_family(family)
        .unwrap_or_else(|| Extractor::Legacy(LegacyExtractor::default()));

    tracing::debug!("Topic {} uses the {} extractor", topic.id, extractor.family());
    PaginationWalker::new(client, extractor, topic, request)
}
