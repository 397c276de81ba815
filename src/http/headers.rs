//! Browser-like request headers
//!
//! Requests mimic a desktop browser navigating the forum: a realistic user
//! agent, the usual Accept/Sec-Fetch family, and a Referer/Origin derived
//! from the target URL.

use rand::seq::SliceRandom;
use rand::Rng;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::sync::Arc;
use url::Url;

/// Recent desktop user agents (Chrome, Firefox, Safari)
pub const DEFAULT_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:123.0) Gecko/20100101 Firefox/123.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Safari/605.1.15",
];

pub const DEFAULT_ACCEPT_LANGUAGE: &str = "es-ES,es;q=0.9,en-US;q=0.8,en;q=0.7";

const ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8,application/signed-exchange;v=b3;q=0.7";

/// Immutable pool of user agents shared by client instances
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserAgentPool {
    agents: Arc<[String]>,
}

impl Default for UserAgentPool {
    fn default() -> Self {
        Self {
            agents: DEFAULT_USER_AGENTS.iter().map(|ua| ua.to_string()).collect(),
        }
    }
}

impl UserAgentPool {
    /// Creates a pool; returns None for an empty list
    pub fn new(agents: Vec<String>) -> Option<Self> {
        if agents.is_empty() {
            return None;
        }
        Some(Self {
            agents: Arc::from(agents),
        })
    }

    /// Picks one agent using the given random source
    pub fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> &str {
        self.agents
            .choose(rng)
            .map(String::as_str)
            .unwrap_or(DEFAULT_USER_AGENTS[0])
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn contains(&self, agent: &str) -> bool {
        self.agents.iter().any(|a| a == agent)
    }
}

/// Value of `Sec-Fetch-Site` for a navigation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchSite {
    /// First request to an origin (typed in the address bar)
    None,
    /// Follow-up request on the same origin
    SameOrigin,
}

impl FetchSite {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::SameOrigin => "same-origin",
        }
    }
}

/// Returns the `scheme://host[:port]` origin of a URL
pub fn origin_of(url: &Url) -> String {
    url.origin().ascii_serialization()
}

/// Builds the full header set for one navigation request
///
/// `Accept-Encoding` is left to reqwest so responses are decoded transparently.
pub fn navigation_headers(
    user_agent: &str,
    accept_language: &str,
    origin: &str,
    site: FetchSite,
) -> HeaderMap {
    let mut headers = HeaderMap::new();

    let pairs: [(&'static str, &str); 14] = [
        ("user-agent", user_agent),
        ("accept", ACCEPT),
        ("accept-language", accept_language),
        ("upgrade-insecure-requests", "1"),
        ("sec-fetch-dest", "document"),
        ("sec-fetch-mode", "navigate"),
        ("sec-fetch-site", site.as_str()),
        ("sec-fetch-user", "?1"),
        (
            "sec-ch-ua",
            "\"Chromium\";v=\"122\", \"Not(A:Brand\";v=\"24\", \"Google Chrome\";v=\"122\"",
        ),
        ("sec-ch-ua-mobile", "?0"),
        ("sec-ch-ua-platform", "\"Windows\""),
        ("cache-control", "max-age=0"),
        ("referer", origin),
        ("origin", origin),
    ];

    for (name, value) in pairs {
        match HeaderValue::from_str(value) {
            Ok(value) => {
                headers.insert(HeaderName::from_static(name), value);
            }
            Err(_) => tracing::warn!("Dropping invalid {} header value", name),
        }
    }

    headers
}
