//! Legacy family (vBulletin-style) extraction
//!
//! The legacy engine has shipped many markup dialects: list-based postbits
//! (3.8/4.x), `div.postbit` themes and the classic bordered tables where the
//! only stable hook is `div#post_message_<id>`. Pagination is either a query
//! parameter (`showthread.php?t=1&page=2`) or a rewritten path segment
//! (`/threads/123-title/page2`).

use crate::dates::DateResolver;
use crate::extract::text::{attr, css, first_match, first_tier, stripped_text, text_without};
use crate::extract::{
    absolute_link, ensure_markup, ExtractError, ForumEngine, PageContext, PostFieldError,
};
use crate::model::{ForumFamily, Post, UNKNOWN_AUTHOR};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use std::sync::OnceLock;

struct LegacySelectors {
    containers: Vec<Selector>,
    message_body: Selector,
    table: Selector,
    post_anchor: Selector,
    link: Selector,
    author: Vec<Selector>,
    date: Vec<Selector>,
    content: Vec<Selector>,
    quote: Selector,
    permalink: Selector,
    pagenav: Vec<Selector>,
    anchor: Selector,
}

fn selectors() -> &'static LegacySelectors {
    static SELECTORS: OnceLock<LegacySelectors> = OnceLock::new();
    SELECTORS.get_or_init(|| LegacySelectors {
        containers: vec![css("li.postbit, li.postbitlegacy, div.postbit")],
        message_body: css("div[id^='post_message_']"),
        table: css("table"),
        post_anchor: css("a[id^='post']"),
        link: css("a[href]"),
        author: vec![css("a.username"), css("a.bigusername"), css(".username")],
        date: vec![css("span.date"), css("span.time")],
        content: vec![css("div.content"), css("div[id^='post_message_']")],
        quote: css("div.quote, div.bbcode_quote"),
        permalink: css("a.postcounter"),
        pagenav: vec![css("div.pagenav"), css(".pagination")],
        anchor: css("a"),
    })
}

struct LegacyPatterns {
    anchor_id: Regex,
    post_param: Regex,
    container_id: Regex,
    page_param: Regex,
    page_of: Regex,
    last_page_query: Regex,
    last_page_path: Regex,
}

fn patterns() -> &'static LegacyPatterns {
    static PATTERNS: OnceLock<LegacyPatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| LegacyPatterns {
        anchor_id: Regex::new(r"^post\d+").expect("valid regex"),
        post_param: Regex::new(r"\bp=(\d+)").expect("valid regex"),
        container_id: Regex::new(r"^post_?\d+$").expect("valid regex"),
        page_param: Regex::new(r"\bpage=\d+").expect("valid regex"),
        page_of: Regex::new(r"(?i)(?:page|p[áa]gina) \d+ (?:of|de) (\d+)").expect("valid regex"),
        last_page_query: Regex::new(r"\bpage=(\d+)").expect("valid regex"),
        last_page_path: Regex::new(r"page(\d+)").expect("valid regex"),
    })
}

/// Extractor for vBulletin-style forums
#[derive(Debug, Clone, Default)]
pub struct LegacyExtractor {
    resolver: DateResolver,
}

impl LegacyExtractor {
    pub fn new(resolver: DateResolver) -> Self {
        Self { resolver }
    }

    /// Locates post containers
    ///
    /// Postbit lists and divs come first. Table layouts are reached by walking
    /// up from each `post_message_` div to its enclosing table. Containers
    /// nested inside another container are dropped.
    fn containers<'a>(&self, document: &'a Html) -> Vec<ElementRef<'a>> {
        let sel = selectors();

        let mut found = first_tier(&sel.containers, |s| document.select(s).collect());
        if found.is_empty() {
            found = document
                .select(&sel.message_body)
                .filter_map(|message| {
                    message
                        .ancestors()
                        .filter_map(ElementRef::wrap)
                        .find(|el| sel.table.matches(el))
                })
                .collect();
        }

        let mut outer = HashSet::new();
        found.retain(|el| outer.insert(el.id()));
        found
            .into_iter()
            .filter(|el| !el.ancestors().any(|a| outer.contains(&a.id())))
            .collect()
    }

    fn parse_post(
        &self,
        item: ElementRef<'_>,
        index: usize,
        ctx: &PageContext<'_>,
    ) -> Result<Post, PostFieldError> {
        let sel = selectors();

        let content_region = first_match(item, &sel.content).ok_or(PostFieldError::MissingContent)?;
        let content = text_without(content_region, &sel.quote);

        let id = self
            .post_id(item)
            .unwrap_or_else(|| Post::fallback_id(index));

        let author = first_match(item, &sel.author)
            .map(stripped_text)
            .filter(|a| !a.is_empty())
            .unwrap_or_else(|| UNKNOWN_AUTHOR.to_string());

        let date_raw = self.date_string(item);
        let timestamp = self.resolver.resolve(&date_raw, ctx.now);

        let permalink = item
            .select(&sel.permalink)
            .next()
            .and_then(|a| attr(a, "href"))
            .and_then(|href| absolute_link(href, ctx.page_url));

        Ok(Post {
            id,
            topic_id: ctx.topic_id.to_string(),
            author,
            timestamp,
            content_original: content,
            content_translated: None,
            permalink,
        })
    }

    /// Post id: `post<digits>` anchor, then a `p=<digits>` link, then the
    /// container's own id
    fn post_id(&self, item: ElementRef<'_>) -> Option<String> {
        let sel = selectors();
        let pat = patterns();

        let from_anchor = item
            .select(&sel.post_anchor)
            .filter_map(|a| attr(a, "id"))
            .find(|id| pat.anchor_id.is_match(id))
            .map(str::to_string);
        if from_anchor.is_some() {
            return from_anchor;
        }

        let from_link = item
            .select(&sel.link)
            .filter_map(|a| attr(a, "href"))
            .find_map(|href| pat.post_param.captures(href))
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string());
        if from_link.is_some() {
            return from_link;
        }

        attr(item, "id")
            .filter(|id| pat.container_id.is_match(id))
            .map(str::to_string)
    }

    /// Raw date text: the element wrapping `span.date`/`span.time` (so the
    /// time travels with the day), else the first text that looks like a date
    fn date_string(&self, item: ElementRef<'_>) -> String {
        let sel = selectors();

        if let Some(date_el) = first_match(item, &sel.date) {
            let wrapper = date_el
                .parent()
                .and_then(ElementRef::wrap)
                .unwrap_or(date_el);
            return stripped_text(wrapper);
        }

        item.text()
            .map(str::trim)
            .find(|s| !s.is_empty() && self.resolver.looks_like_date(s))
            .map(str::to_string)
            .unwrap_or_default()
    }
}

impl ForumEngine for LegacyExtractor {
    fn family(&self) -> ForumFamily {
        ForumFamily::Legacy
    }

    /// Query style: `showthread.php?t=1` → `showthread.php?t=1&page=2`.
    /// Path style: `/threads/123-title` → `/threads/123-title/page2`.
    fn page_url(&self, base_url: &str, page: u32) -> String {
        if page <= 1 {
            return base_url.to_string();
        }

        let pat = patterns();
        if base_url.contains('?') {
            if pat.page_param.is_match(base_url) {
                return pat
                    .page_param
                    .replace(base_url, format!("page={}", page).as_str())
                    .into_owned();
            }
            return format!("{}&page={}", base_url, page);
        }

        if base_url.ends_with('/') {
            format!("{}page{}", base_url, page)
        } else {
            format!("{}/page{}", base_url, page)
        }
    }

    /// Reads "Page X of Y" text, then the "last page" link, then the highest
    /// numbered pagination link
    fn total_pages(&self, document: &Html) -> u32 {
        let sel = selectors();
        let pat = patterns();

        let from_text = document
            .root_element()
            .text()
            .find_map(|t| pat.page_of.captures(t))
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse::<u32>().ok());
        if let Some(total) = from_text {
            return total;
        }

        let Some(nav) = first_tier(&sel.pagenav, |s| document.select(s).take(1).collect())
            .into_iter()
            .next()
        else {
            return 1;
        };

        let mut max_page = 1;
        for link in nav.select(&sel.anchor) {
            let title = attr(link, "title").unwrap_or_default().to_lowercase();
            if title.contains("last") || title.contains("última") || title.contains("ultima") {
                let href = attr(link, "href").unwrap_or_default();
                let last = pat
                    .last_page_query
                    .captures(href)
                    .or_else(|| pat.last_page_path.captures(href))
                    .and_then(|caps| caps.get(1))
                    .and_then(|m| m.as_str().parse::<u32>().ok());
                if let Some(last) = last {
                    return last;
                }
            }

            if let Ok(number) = stripped_text(link).parse::<u32>() {
                max_page = max_page.max(number);
            }
        }
        max_page
    }

    fn extract_posts(
        &self,
        document: &Html,
        ctx: &PageContext<'_>,
    ) -> Result<Vec<Post>, ExtractError> {
        ensure_markup(document)?;

        let mut posts = Vec::new();
        for item in self.containers(document) {
            match self.parse_post(item, posts.len(), ctx) {
                Ok(post) => posts.push(post),
                Err(e) => tracing::debug!("Skipping legacy post in topic {}: {}", ctx.topic_id, e),
            }
        }
        Ok(posts)
    }
}
