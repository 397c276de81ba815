//! Page-by-page crawl of one topic
//!
//! The walker is a small state machine driven by [`PaginationWalker::next_event`]:
//!
//! ```text
//! Init -> Fetching(1) -> Fetching(2) -> ... -> Done
//!              \______________________________-> Aborted
//! ```
//!
//! Each `Fetching` step fetches one page, reads the total page count (first
//! page only), extracts and filters posts, and queues the resulting events.
//! Events are handed out one at a time, so nothing past the current page is
//! fetched until the caller asks for more.

use crate::extract::{ExtractError, Extractor, ForumEngine, PageContext};
use crate::http::{FetchOutcome, RetryClient, BLOCKED_REMEDIATION, DEFAULT_TIMEOUT};
use crate::model::{CrawlEvent, CrawlRequest, Post, Topic};
use crate::CrawlError;
use chrono::Utc;
use futures::Stream;
use scraper::Html;
use std::collections::{HashSet, VecDeque};
use std::time::Duration;
use url::Url;

/// Progress sink invoked with `(page, total)` after each page is fetched
pub type ProgressFn = Box<dyn FnMut(u32, u32) + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WalkState {
    Init,
    Fetching { page: u32, total: Option<u32> },
    Done,
    Aborted,
}

/// Drives the crawl of one topic
///
/// Owns its HTTP session; walkers for different topics share nothing and can
/// run on separate tasks.
pub struct PaginationWalker {
    client: RetryClient,
    extractor: Extractor,
    topic: Topic,
    request: CrawlRequest,
    timeout: Duration,
    progress: Option<ProgressFn>,
    state: WalkState,
    seen: HashSet<String>,
    pending: VecDeque<CrawlEvent>,
}

impl PaginationWalker {
    pub fn new(client: RetryClient, extractor: Extractor, topic: Topic, request: CrawlRequest) -> Self {
        Self {
            client,
            extractor,
            topic,
            request,
            timeout: DEFAULT_TIMEOUT,
            progress: None,
            state: WalkState::Init,
            seen: HashSet::new(),
            pending: VecDeque::new(),
        }
    }

    /// Sets the per-request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Registers a progress callback
    ///
    /// The callback runs on the walker's task between fetches and should
    /// return quickly.
    pub fn with_progress<F>(mut self, progress: F) -> Self
    where
        F: FnMut(u32, u32) + Send + 'static,
    {
        self.progress = Some(Box::new(progress));
        self
    }

    pub fn topic(&self) -> &Topic {
        &self.topic
    }

    pub fn extractor(&self) -> &Extractor {
        &self.extractor
    }

    /// Returns true once the walk has finished or aborted and every queued
    /// event has been handed out
    pub fn is_finished(&self) -> bool {
        self.pending.is_empty() && matches!(self.state, WalkState::Done | WalkState::Aborted)
    }

    /// Returns the next event, fetching further pages as needed
    ///
    /// `None` marks the end of the walk; the walker cannot be restarted.
    pub async fn next_event(&mut self) -> Option<CrawlEvent> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Some(event);
            }

            match self.state {
                WalkState::Done | WalkState::Aborted => return None,
                WalkState::Init => {
                    tracing::info!("Crawling topic {} ({})", self.topic.id, self.topic.url);
                    self.state = WalkState::Fetching {
                        page: 1,
                        total: None,
                    };
                }
                WalkState::Fetching { page, total } => {
                    self.state = self.walk_page(page, total).await;
                }
            }
        }
    }

    /// Drains the walk into a vector
    pub async fn collect_events(mut self) -> Vec<CrawlEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.next_event().await {
            events.push(event);
        }
        events
    }

    /// Turns the walker into a lazy stream of events
    pub fn into_stream(self) -> impl Stream<Item = CrawlEvent> + Send {
        futures::stream::unfold(self, |mut walker| async move {
            walker.next_event().await.map(|event| (event, walker))
        })
    }

    async fn walk_page(&mut self, page: u32, total: Option<u32>) -> WalkState {
        if page > 1 && !self.request.delay.is_zero() {
            let sleeper = self.client.sleeper();
            sleeper.sleep(self.request.delay).await;
        }

        let url = self.extractor.page_url(&self.topic.url, page);
        tracing::debug!("Fetching page {} of topic {}: {}", page, self.topic.id, url);

        let fetched = match self.client.get(&url, self.timeout).await {
            Ok(FetchOutcome::Page(fetched)) if fetched.is_success() => fetched,
            Ok(FetchOutcome::Page(fetched)) => {
                tracing::warn!("HTTP {} for {}, aborting topic {}", fetched.status, url, self.topic.id);
                self.pending.push_back(CrawlEvent::error(
                    format!("HTTP {} while fetching {}", fetched.status, url),
                    page,
                ));
                return WalkState::Aborted;
            }
            Ok(FetchOutcome::Blocked(_)) => {
                tracing::error!("Blocked on {}, aborting topic {}", url, self.topic.id);
                self.pending
                    .push_back(CrawlEvent::error(BLOCKED_REMEDIATION, page));
                return WalkState::Aborted;
            }
            Err(e) => {
                tracing::error!("Aborting topic {}: {}", self.topic.id, e);
                let message = match &e {
                    CrawlError::Transport { source, .. } => {
                        format!("Could not connect after several attempts: {}", source)
                    }
                    other => other.to_string(),
                };
                self.pending.push_back(CrawlEvent::error(message, page));
                return WalkState::Aborted;
            }
        };

        let total = self.process_page(page, total, &fetched.url, &fetched.body);

        if page >= total {
            tracing::info!("Finished topic {} after {} page(s)", self.topic.id, page);
            WalkState::Done
        } else {
            WalkState::Fetching {
                page: page + 1,
                total: Some(total),
            }
        }
    }

    /// Parses one page and queues its events, returning the total page count
    ///
    /// Kept synchronous: `Html` is not `Send` and must not live across an
    /// await point.
    fn process_page(&mut self, page: u32, total: Option<u32>, page_url: &str, body: &str) -> u32 {
        let document = Html::parse_document(body);

        let total = total.unwrap_or_else(|| {
            let detected = self.extractor.total_pages(&document).max(1);
            let clamped = detected.min(self.request.max_pages.max(1));
            tracing::debug!(
                "Topic {} has {} page(s), walking {}",
                self.topic.id,
                detected,
                clamped
            );
            clamped
        });

        if let Some(progress) = self.progress.as_mut() {
            progress(page, total);
        }

        let base = Url::parse(page_url).ok();
        let extracted = if body.trim().is_empty() {
            Err(ExtractError::EmptyPage)
        } else {
            let mut ctx = PageContext::new(&self.topic.id).with_now(Utc::now());
            if let Some(base) = base.as_ref() {
                ctx = ctx.with_page_url(base);
            }
            self.extractor.extract_posts(&document, &ctx)
        };

        match extracted {
            Ok(posts) => self.emit_posts(page, posts),
            Err(e) => {
                tracing::warn!("Page {} of topic {} could not be parsed: {}", page, self.topic.id, e);
                self.pending.push_back(CrawlEvent::error(
                    format!("Failed to parse page {}: {}", page, e),
                    page,
                ));
            }
        }

        total
    }

    fn emit_posts(&mut self, page: u32, posts: Vec<Post>) {
        let found = posts.len();
        let mut emitted = 0;

        for post in posts {
            if post.timestamp < self.request.since {
                continue;
            }
            if !self.seen.insert(dedup_key(&post)) {
                tracing::debug!("Dropping duplicate post {} on page {}", post.id, page);
                continue;
            }
            emitted += 1;
            self.pending.push_back(CrawlEvent::Post(post));
        }

        tracing::debug!(
            "Page {} of topic {}: {} post(s) found, {} emitted",
            page,
            self.topic.id,
            found,
            emitted
        );
    }
}

/// Key used to drop posts already emitted during this walk
///
/// Forum-native ids identify a post on their own; synthesized `unknown-<n>`
/// ids restart on every page, so those posts fall back to the fingerprint.
fn dedup_key(post: &Post) -> String {
    if post.has_fallback_id() {
        format!("fp:{}", post.fingerprint())
    } else {
        format!("id:{}", post.id)
    }
}
