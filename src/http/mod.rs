//! HTTP access for forum crawling
//!
//! This module contains the outbound request machinery:
//! - `RetryClient`: persistent session with 403/transport backoff
//! - Browser-like header construction and the user-agent pool
//! - The `Sleeper` seam used for backoff and inter-page delays

mod client;
mod headers;
mod sleeper;

pub use client::{
    ClientConfig, FetchOutcome, FetchedPage, RetryClient, RetryPolicy, DEFAULT_TIMEOUT,
};
pub use headers::{
    navigation_headers, origin_of, FetchSite, UserAgentPool, DEFAULT_ACCEPT_LANGUAGE,
    DEFAULT_USER_AGENTS,
};
pub use sleeper::{RecordingSleeper, Sleeper, TokioSleeper};

/// Message surfaced when a site keeps answering 403
pub const BLOCKED_REMEDIATION: &str = "Access denied (403) after several attempts. Anti-bot protection detected.\n\
Solutions:\n\
1. Add the site's session cookies (e.g. cf_clearance) to the topic\n\
2. Export the cookies from a logged-in browser with a cookie editor extension\n\
3. Increase the delay between requests or wait a few minutes";
