//! Text helpers shared by the extractors

use scraper::{ElementRef, Selector};
use url::Url;

/// Parses a selector literal
///
/// Only used for the extractors' built-in selector tables, which the unit
/// tests exercise.
pub(crate) fn css(selector: &str) -> Selector {
    Selector::parse(selector).unwrap_or_else(|e| panic!("invalid selector {:?}: {:?}", selector, e))
}

/// Returns the elements matched by the first selector that matches anything
pub(crate) fn first_tier<'a, I>(tiers: &[Selector], mut select: I) -> Vec<ElementRef<'a>>
where
    I: FnMut(&Selector) -> Vec<ElementRef<'a>>,
{
    for tier in tiers {
        let found = select(tier);
        if !found.is_empty() {
            return found;
        }
    }
    Vec::new()
}

/// Returns the first descendant matched by the earliest selector in `tiers`
pub(crate) fn first_match<'a>(element: ElementRef<'a>, tiers: &[Selector]) -> Option<ElementRef<'a>> {
    tiers
        .iter()
        .find_map(|tier| element.select(tier).next())
}

/// Collapses an element's text nodes into one space-separated line
pub fn stripped_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Extracts an element's text, one line per text node, skipping any subtree
/// matched by `skip` as well as scripts and styles
///
/// Used to drop quoted replies so they are not counted twice downstream.
pub fn text_without(element: ElementRef<'_>, skip: &Selector) -> String {
    let mut lines = Vec::new();
    collect_text(element, skip, &mut lines);
    lines.join("\n")
}

fn collect_text(element: ElementRef<'_>, skip: &Selector, lines: &mut Vec<String>) {
    for child in element.children() {
        if let Some(child_element) = ElementRef::wrap(child) {
            let name = child_element.value().name();
            if name == "script" || name == "style" || skip.matches(&child_element) {
                continue;
            }
            collect_text(child_element, skip, lines);
        } else if let Some(text) = child.value().as_text() {
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                lines.push(trimmed.to_string());
            }
        }
    }
}

/// Resolves a possibly relative href against the page URL
pub fn absolute_link(href: &str, page_url: Option<&Url>) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with("javascript:") {
        return None;
    }

    match page_url {
        Some(base) => base.join(href).ok().map(|u| u.to_string()),
        None => Some(href.to_string()),
    }
}

/// Returns a non-empty, trimmed attribute value
pub(crate) fn attr<'a>(element: ElementRef<'a>, name: &str) -> Option<&'a str> {
    element
        .value()
        .attr(name)
        .map(str::trim)
        .filter(|v| !v.is_empty())
}
