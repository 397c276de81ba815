//! Modern family (XenForo-style) extraction

use crate::dates::DateResolver;
use crate::extract::text::{attr, css, first_match, first_tier, stripped_text, text_without};
use crate::extract::{
    absolute_link, ensure_markup, ExtractError, ForumEngine, PageContext, PostFieldError,
};
use crate::model::{ForumFamily, Post, UNKNOWN_AUTHOR};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::OnceLock;

struct ModernSelectors {
    containers: Vec<Selector>,
    author: Vec<Selector>,
    time: Vec<Selector>,
    attribution: Selector,
    content: Vec<Selector>,
    quote: Selector,
    permalink: Selector,
    page_nav: Selector,
    nav_page: Selector,
    anchor: Selector,
}

fn selectors() -> &'static ModernSelectors {
    static SELECTORS: OnceLock<ModernSelectors> = OnceLock::new();
    SELECTORS.get_or_init(|| ModernSelectors {
        containers: vec![css("article.message"), css("div.message")],
        author: vec![css("a.username"), css("span.username")],
        time: vec![css(".message-attribution time"), css("time")],
        attribution: css("div.message-attribution, header.message-attribution"),
        content: vec![css("div.bbWrapper"), css("div.message-body")],
        quote: css("blockquote"),
        permalink: css("a.u-concealed"),
        page_nav: css(".pageNavWrapper"),
        nav_page: css("li.pageNav-page"),
        anchor: css("a"),
    })
}

fn page_segment() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"/page-\d+(/|\?|#|$)").expect("valid regex"))
}

/// Extractor for XenForo-style forums
#[derive(Debug, Clone, Default)]
pub struct ModernExtractor {
    resolver: DateResolver,
}

impl ModernExtractor {
    pub fn new(resolver: DateResolver) -> Self {
        Self { resolver }
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

        let id = attr(item, "data-content")
            .or_else(|| attr(item, "id"))
            .map(str::to_string)
            .unwrap_or_else(|| Post::fallback_id(index));

        let author = attr(item, "data-author")
            .map(str::to_string)
            .or_else(|| {
                first_match(item, &sel.author)
                    .map(stripped_text)
                    .filter(|a| !a.is_empty())
            })
            .unwrap_or_else(|| UNKNOWN_AUTHOR.to_string());

        let timestamp = self.resolver.resolve(&self.date_string(item), ctx.now);

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

    /// Prefers the machine-readable `datetime` attribute over display text
    fn date_string(&self, item: ElementRef<'_>) -> String {
        let sel = selectors();

        if let Some(time) = first_match(item, &sel.time) {
            return attr(time, "datetime")
                .map(str::to_string)
                .unwrap_or_else(|| stripped_text(time));
        }

        item.select(&sel.attribution)
            .next()
            .map(stripped_text)
            .unwrap_or_default()
    }
}

impl ForumEngine for ModernExtractor {
    fn family(&self) -> ForumFamily {
        ForumFamily::Modern
    }

    /// `/threads/topic.42/` → `/threads/topic.42/page-2`, replacing any
    /// existing `page-N` segment
    fn page_url(&self, base_url: &str, page: u32) -> String {
        if page <= 1 {
            return base_url.to_string();
        }

        let segment = format!("page-{}", page);
        if page_segment().is_match(base_url) {
            let replacement = format!("/{}${{1}}", segment);
            return page_segment()
                .replace(base_url, replacement.as_str())
                .into_owned();
        }

        let (path, query) = match base_url.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (base_url, None),
        };
        let mut url = if path.ends_with('/') {
            format!("{}{}", path, segment)
        } else {
            format!("{}/{}", path, segment)
        };
        if let Some(query) = query {
            url.push('?');
            url.push_str(query);
        }
        url
    }

    /// Reads the last `pageNav-page` entry, falling back to the highest
    /// numeric link in the widget
    fn total_pages(&self, document: &Html) -> u32 {
        let sel = selectors();

        let Some(nav) = document.select(&sel.page_nav).next() else {
            return 1;
        };

        let last = nav
            .select(&sel.nav_page)
            .last()
            .and_then(|li| stripped_text(li).parse::<u32>().ok());
        if let Some(last) = last {
            return last;
        }

        nav.select(&sel.anchor)
            .filter_map(|a| stripped_text(a).parse::<u32>().ok())
            .max()
            .unwrap_or(1)
    }

    fn extract_posts(
        &self,
        document: &Html,
        ctx: &PageContext<'_>,
    ) -> Result<Vec<Post>, ExtractError> {
        ensure_markup(document)?;

        let items = first_tier(&selectors().containers, |s| document.select(s).collect());

        let mut posts = Vec::new();
        for item in items {
            match self.parse_post(item, posts.len(), ctx) {
                Ok(post) => posts.push(post),
                Err(e) => tracing::debug!("Skipping modern post in topic {}: {}", ctx.topic_id, e),
            }
        }
        Ok(posts)
    }
}
