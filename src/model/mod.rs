//! Data model for forum crawling
//!
//! This module defines the records that flow through a crawl:
//!
//! - `Topic`: a tracked thread and how to reach it
//! - `Post`: one extracted forum message
//! - `CrawlRequest`: per-crawl bounds (since-window, page ceiling, delay)
//! - `CrawlEvent`: the items yielded by the pagination walker

mod event;
mod post;
mod topic;

pub use event::{CrawlEvent, EventError};
pub use post::{Post, UNKNOWN_AUTHOR};
pub use topic::{CrawlRequest, ForumFamily, ForumType, Topic};
