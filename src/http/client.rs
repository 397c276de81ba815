//! Retrying HTTP client
//!
//! This module wraps reqwest with the behaviour needed against bot-protected
//! forums:
//! - A persistent cookie-bearing session with caller cookies injected
//! - Browser navigation headers with a Referer/Origin derived from the target
//! - A fixed backoff schedule on HTTP 403 and transport failures, rotating the
//!   user agent between attempts
//! - No TLS certificate verification (many forums run broken certificates)

use crate::http::headers::{navigation_headers, origin_of, FetchSite, UserAgentPool};
use crate::http::headers::DEFAULT_ACCEPT_LANGUAGE;
use crate::http::sleeper::{Sleeper, TokioSleeper};
use crate::model::Topic;
use crate::CrawlError;
use rand::rngs::StdRng;
use rand::SeedableRng;
use reqwest::cookie::Jar;
use reqwest::header::HeaderMap;
use reqwest::{Client, StatusCode};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Default per-request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Backoff schedule applied between attempts
///
/// One retry is made per entry, so the default schedule of 2s, 5s and 10s
/// means four requests at most.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    delays: Vec<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(vec![
            Duration::from_secs(2),
            Duration::from_secs(5),
            Duration::from_secs(10),
        ])
    }
}

impl RetryPolicy {
    pub fn new(delays: Vec<Duration>) -> Self {
        Self { delays }
    }

    /// Disables retries
    pub fn no_retry() -> Self {
        Self::new(Vec::new())
    }

    pub fn delays(&self) -> &[Duration] {
        &self.delays
    }

    pub fn max_retries(&self) -> usize {
        self.delays.len()
    }

    /// Delay to wait after the given failed attempt (1-based), or None when
    /// retries are exhausted
    pub fn delay_after(&self, attempt: usize) -> Option<Duration> {
        attempt
            .checked_sub(1)
            .and_then(|index| self.delays.get(index))
            .copied()
    }

    /// Total time spent waiting when every retry is used
    pub fn total_backoff(&self) -> Duration {
        self.delays.iter().sum()
    }
}

/// Identity and session settings for one client instance
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Cookies injected into every origin the client visits
    pub cookies: BTreeMap<String, String>,

    /// Fixed user agent; when set it is never rotated
    pub user_agent: Option<String>,

    /// Pool to pick from when no fixed user agent is set
    pub user_agents: UserAgentPool,

    /// `Accept-Language` header value
    pub accept_language: String,

    /// Backoff schedule
    pub retry: RetryPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            cookies: BTreeMap::new(),
            user_agent: None,
            user_agents: UserAgentPool::default(),
            accept_language: DEFAULT_ACCEPT_LANGUAGE.to_string(),
            retry: RetryPolicy::default(),
        }
    }
}

impl ClientConfig {
    /// Builds a config carrying the topic's cookies and user-agent override
    pub fn for_topic(topic: &Topic) -> Self {
        Self {
            cookies: topic.cookies.clone(),
            user_agent: topic.user_agent.clone(),
            ..Self::default()
        }
    }

    pub fn with_user_agents(mut self, pool: UserAgentPool) -> Self {
        self.user_agents = pool;
        self
    }

    pub fn with_accept_language(mut self, value: impl Into<String>) -> Self {
        self.accept_language = value.into();
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

/// A response body with its status
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Final URL after redirects
    pub url: String,

    /// HTTP status code
    pub status: u16,

    /// Response body
    pub body: String,
}

impl FetchedPage {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Result of a GET that reached the server
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    /// Any non-403 response
    Page(FetchedPage),

    /// The final 403 once retries are exhausted
    Blocked(FetchedPage),
}

/// HTTP client with a persistent session and blocking-aware retries
///
/// Each crawl owns its own instance; nothing is shared between instances.
pub struct RetryClient {
    http: Client,
    jar: Arc<Jar>,
    config: ClientConfig,
    current_agent: String,
    rng: StdRng,
    sleeper: Arc<dyn Sleeper>,
    last_origin: Option<String>,
    seeded_origins: HashSet<String>,
}

impl RetryClient {
    /// Creates a client that sleeps on the tokio timer and seeds its random
    /// source from the OS
    pub fn new(config: ClientConfig) -> Result<Self, CrawlError> {
        Self::with_parts(config, Arc::new(TokioSleeper), StdRng::from_entropy())
    }

    /// Creates a client with an explicit sleeper and random source
    pub fn with_parts(
        config: ClientConfig,
        sleeper: Arc<dyn Sleeper>,
        mut rng: StdRng,
    ) -> Result<Self, CrawlError> {
        let jar = Arc::new(Jar::default());

        let http = Client::builder()
            .cookie_provider(jar.clone())
            .danger_accept_invalid_certs(true)
            .connect_timeout(Duration::from_secs(10))
            .gzip(true)
            .brotli(true)
            .build()
            .map_err(CrawlError::ClientBuild)?;

        let current_agent = match &config.user_agent {
            Some(agent) => agent.clone(),
            None => config.user_agents.pick(&mut rng).to_string(),
        };

        Ok(Self {
            http,
            jar,
            config,
            current_agent,
            rng,
            sleeper,
            last_origin: None,
            seeded_origins: HashSet::new(),
        })
    }

    /// The user agent the next request will carry
    pub fn user_agent(&self) -> &str {
        &self.current_agent
    }

    pub fn sleeper(&self) -> Arc<dyn Sleeper> {
        self.sleeper.clone()
    }

    /// Fetches a URL, retrying on 403 and transport failures
    ///
    /// # Retry Logic
    ///
    /// | Condition | Action |
    /// |-----------|--------|
    /// | HTTP 403 | Sleep per schedule, rotate user agent, retry |
    /// | HTTP 403, retries exhausted | `Ok(FetchOutcome::Blocked)` with the last response |
    /// | Transport error | Sleep per schedule, retry |
    /// | Transport error, retries exhausted | `Err(CrawlError::Transport)` |
    /// | Anything else | `Ok(FetchOutcome::Page)` |
    pub async fn get(&mut self, url: &str, timeout: Duration) -> Result<FetchOutcome, CrawlError> {
        let target = Url::parse(url).map_err(|source| CrawlError::InvalidUrl {
            url: url.to_string(),
            source,
        })?;

        let origin = origin_of(&target);
        let site = self.navigation_site(&origin);
        self.seed_cookies(&target, &origin);

        let mut attempt = 0;
        loop {
            attempt += 1;
            tracing::debug!(
                "GET {} (attempt {}/{})",
                url,
                attempt,
                self.config.retry.max_retries() + 1
            );

            let headers = navigation_headers(
                &self.current_agent,
                &self.config.accept_language,
                &origin,
                site,
            );
            let result = self.send(target.clone(), headers, timeout).await;
            let retry_delay = self.config.retry.delay_after(attempt);

            match result {
                Ok(page) if page.status == StatusCode::FORBIDDEN.as_u16() => match retry_delay {
                    Some(delay) => {
                        tracing::warn!(
                            "403 from {}, retry {}/{} in {:?}",
                            url,
                            attempt,
                            self.config.retry.max_retries(),
                            delay
                        );
                        self.sleeper.sleep(delay).await;
                        self.rotate_user_agent();
                    }
                    None => {
                        tracing::warn!("Still blocked by {} after {} attempts", url, attempt);
                        return Ok(FetchOutcome::Blocked(page));
                    }
                },
                Ok(page) => return Ok(FetchOutcome::Page(page)),
                Err(source) => match retry_delay {
                    Some(delay) => {
                        tracing::warn!("Request to {} failed: {}, retry in {:?}", url, source, delay);
                        self.sleeper.sleep(delay).await;
                    }
                    None => {
                        tracing::error!("Giving up on {} after {} attempts: {}", url, attempt, source);
                        return Err(CrawlError::Transport {
                            url: url.to_string(),
                            attempts: attempt,
                            source,
                        });
                    }
                },
            }
        }
    }

    async fn send(
        &self,
        url: Url,
        headers: HeaderMap,
        timeout: Duration,
    ) -> Result<FetchedPage, reqwest::Error> {
        let response = self
            .http
            .get(url)
            .headers(headers)
            .timeout(timeout)
            .send()
            .await?;

        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let body = response.text().await?;

        Ok(FetchedPage {
            url: final_url,
            status,
            body,
        })
    }

    /// First request to an origin navigates from nowhere; later ones are
    /// same-origin
    fn navigation_site(&mut self, origin: &str) -> FetchSite {
        let site = if self.last_origin.as_deref() == Some(origin) {
            FetchSite::SameOrigin
        } else {
            FetchSite::None
        };
        self.last_origin = Some(origin.to_string());
        site
    }

    fn seed_cookies(&mut self, target: &Url, origin: &str) {
        if self.config.cookies.is_empty() || !self.seeded_origins.insert(origin.to_string()) {
            return;
        }

        for (name, value) in &self.config.cookies {
            self.jar
                .add_cookie_str(&format!("{}={}; Path=/", name, value), target);
        }
        tracing::debug!(
            "Injected {} cookie(s) for {}",
            self.config.cookies.len(),
            origin
        );
    }

    fn rotate_user_agent(&mut self) {
        if self.config.user_agent.is_some() {
            return;
        }
        self.current_agent = self.config.user_agents.pick(&mut self.rng).to_string();
    }
}
