use crate::http::{ClientConfig, UserAgentPool, DEFAULT_ACCEPT_LANGUAGE};
use crate::model::{CrawlRequest, Topic};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for forum-harvest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,

    #[serde(default)]
    pub identity: IdentityConfig,

    #[serde(default, rename = "topic")]
    pub topics: Vec<Topic>,
}

/// Crawl bounds shared by every topic
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// Hard ceiling on pages fetched per topic
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,

    /// Pause between page fetches (seconds)
    #[serde(default = "default_delay_secs")]
    pub delay_secs: f64,

    /// Per-request timeout (seconds)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Absolute lower bound on post timestamps; overrides `since-days`
    #[serde(default)]
    pub since: Option<DateTime<Utc>>,

    /// Relative lower bound used when `since` is absent
    #[serde(default = "default_since_days")]
    pub since_days: u32,

    /// Number of topics crawled at the same time
    #[serde(default = "default_max_concurrent_topics")]
    pub max_concurrent_topics: u32,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_pages: default_max_pages(),
            delay_secs: default_delay_secs(),
            timeout_secs: default_timeout_secs(),
            since: None,
            since_days: default_since_days(),
            max_concurrent_topics: default_max_concurrent_topics(),
        }
    }
}

impl CrawlerConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_secs_f64(self.delay_secs.max(0.0))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Resolves the inclusive lower bound relative to `now`
    pub fn since_at(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        self.since.unwrap_or_else(|| {
            now.checked_sub_signed(ChronoDuration::days(i64::from(self.since_days)))
                .unwrap_or(DateTime::<Utc>::MIN_UTC)
        })
    }

    /// Builds the per-crawl request, resolving `since` against `now`
    pub fn request_at(&self, now: DateTime<Utc>) -> CrawlRequest {
        CrawlRequest::new(self.since_at(now), self.max_pages, self.delay())
    }
}

fn default_max_pages() -> u32 {
    10
}

fn default_delay_secs() -> f64 {
    1.5
}

fn default_timeout_secs() -> u64 {
    15
}

fn default_since_days() -> u32 {
    7
}

fn default_max_concurrent_topics() -> u32 {
    2
}

/// Browser identity overrides
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct IdentityConfig {
    /// Replaces the built-in user-agent pool
    #[serde(default)]
    pub user_agents: Vec<String>,

    /// `Accept-Language` header value
    #[serde(default)]
    pub accept_language: Option<String>,
}

impl IdentityConfig {
    /// Client settings for one topic: its cookies and user agent plus the
    /// shared identity overrides
    pub fn client_config(&self, topic: &Topic) -> ClientConfig {
        let mut config = ClientConfig::for_topic(topic).with_accept_language(
            self.accept_language
                .clone()
                .unwrap_or_else(|| DEFAULT_ACCEPT_LANGUAGE.to_string()),
        );
        if let Some(pool) = UserAgentPool::new(self.user_agents.clone()) {
            config = config.with_user_agents(pool);
        }
        config
    }
}
