//! Integration tests for forum-harvest
//!
//! These tests use wiremock to serve forum pages and exercise the client,
//! the detector and the pagination walker end-to-end. Backoff and
//! inter-page delays go through a recording sleeper, so nothing here waits.

mod crawl_tests;
mod detect_tests;

use forum_harvest::http::{ClientConfig, RecordingSleeper, RetryClient};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;

/// Builds a client whose sleeps are recorded instead of awaited
pub fn recording_client(config: ClientConfig) -> (RetryClient, RecordingSleeper) {
    let sleeper = RecordingSleeper::new();
    let client = RetryClient::with_parts(config, Arc::new(sleeper.clone()), StdRng::seed_from_u64(42))
        .expect("Failed to build client");
    (client, sleeper)
}

/// Renders a modern-family thread page
///
/// Each post is `(id, iso_datetime, text)`.
pub fn modern_page(posts: &[(&str, &str, &str)], total_pages: u32) -> String {
    let nav: String = (1..=total_pages)
        .map(|n| format!(r#"<li class="pageNav-page"><a href="page-{n}">{n}</a></li>"#))
        .collect();

    let articles: String = posts
        .iter()
        .map(|(id, datetime, text)| {
            format!(
                r#"<article class="message message--post" data-author="autor-{id}" data-content="{id}">
                     <header class="message-attribution">
                       <a class="u-concealed" href="/threads/topic.42/{id}"><time datetime="{datetime}">fecha</time></a>
                     </header>
                     <div class="message-content"><div class="bbWrapper">
                       <blockquote class="bbCodeBlock--quote">cita anterior</blockquote>{text}
                     </div></div>
                   </article>"#
            )
        })
        .collect();

    format!(
        r#"<!DOCTYPE html><html data-app="public"><body><div class="p-body">
           <div class="pageNavWrapper"><ul class="pageNav-main">{nav}</ul></div>
           {articles}
           </div></body></html>"#
    )
}

/// Renders a legacy-family (list postbit) thread page
///
/// Each post is `(numeric_id, date_text, text)`.
pub fn legacy_page(posts: &[(&str, &str, &str)], page: u32, total_pages: u32) -> String {
    let items: String = posts
        .iter()
        .map(|(id, date, text)| {
            format!(
                r#"<li class="postbitlegacy postcontainer" id="post_{id}">
                     <div class="posthead"><span class="postdate"><span class="date">{date}</span></span>
                       <a class="postcounter" href="showthread.php?t=42&amp;p={id}#post{id}">#</a></div>
                     <div class="userinfo"><a class="username" href="member.php?u=1">usuario{id}</a></div>
                     <div class="content"><div id="post_message_{id}">
                       <div class="bbcode_quote">cita</div>{text}
                     </div></div>
                   </li>"#
            )
        })
        .collect();

    format!(
        r#"<html><body>
           <div class="pagenav"><table><tr><td>Página {page} de {total_pages}</td></tr></table></div>
           <ol id="posts">{items}</ol>
           </body></html>"#
    )
}
