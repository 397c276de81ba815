//! Forum engine detection
//!
//! Fetches a thread's first page and classifies the engine family from
//! markup signatures. The modern family's `data-app="public"` root attribute
//! is specific enough to decide on its own; the generic modern hints only
//! count when no legacy signature is present, because the legacy engine has
//! too many historical dialects for a narrow check.

use crate::http::{ClientConfig, FetchOutcome, RetryClient, BLOCKED_REMEDIATION, DEFAULT_TIMEOUT};
use crate::model::ForumFamily;
use crate::Result;
use scraper::{Html, Selector};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Verdict with a human-readable diagnostic
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Detection {
    pub family: ForumFamily,
    pub message: String,
}

impl Detection {
    fn new(family: ForumFamily, message: impl Into<String>) -> Self {
        Self {
            family,
            message: message.into(),
        }
    }
}

struct Signatures {
    public_app: Selector,
    modern_structure: Vec<Selector>,
    legacy_structure: Vec<Selector>,
}

fn signatures() -> &'static Signatures {
    static SIGNATURES: OnceLock<Signatures> = OnceLock::new();
    SIGNATURES.get_or_init(|| Signatures {
        public_app: parse("html[data-app='public']"),
        modern_structure: vec![parse("div.p-body"), parse("div.p-pageWrapper")],
        legacy_structure: vec![
            parse("div.vb-postbit"),
            parse("div#vbulletin_html"),
            parse("div.postbit"),
            parse("table.tborder"),
        ],
    })
}

fn parse(selector: &str) -> Selector {
    Selector::parse(selector).unwrap_or_else(|e| panic!("invalid selector {:?}: {:?}", selector, e))
}

const MODERN_TOKENS: &[&str] = &["xenforo", "xf-", "bbwrapper"];
const LEGACY_TOKENS: &[&str] = &["vbulletin", "vb_", "postcontainer"];

/// Classifies a page body
pub fn classify(body: &str) -> Detection {
    let lower = body.to_lowercase();
    let document = Html::parse_document(body);
    let sig = signatures();

    let has = |selector: &Selector| document.select(selector).next().is_some();

    let strong_modern = has(&sig.public_app);
    let weak_modern = MODERN_TOKENS.iter().any(|t| lower.contains(t))
        || sig.modern_structure.iter().any(|s| has(s));
    let legacy = LEGACY_TOKENS.iter().any(|t| lower.contains(t))
        || sig.legacy_structure.iter().any(|s| has(s));

    if strong_modern {
        Detection::new(ForumFamily::Modern, "Modern-family forum detected (HTML signature)")
    } else if legacy {
        Detection::new(ForumFamily::Legacy, "Legacy-family forum detected")
    } else if weak_modern {
        Detection::new(ForumFamily::Modern, "Modern-family forum detected (weak signals)")
    } else {
        Detection::new(
            ForumFamily::Unknown,
            "Forum type not recognized or unknown structure",
        )
    }
}

/// Fetches `url` with a fresh session and classifies it
pub async fn detect(
    url: &str,
    cookies: BTreeMap<String, String>,
    user_agent: Option<String>,
) -> Result<Detection> {
    let config = ClientConfig {
        cookies,
        user_agent,
        ..ClientConfig::default()
    };
    let mut client = RetryClient::new(config)?;
    detect_with(&mut client, url).await
}

/// Classifies `url` using an existing client session
///
/// A persistent 403 is not an error: it yields `Unknown` with remediation
/// steps. Transport failures after retries are returned as errors.
pub async fn detect_with(client: &mut RetryClient, url: &str) -> Result<Detection> {
    match client.get(url, DEFAULT_TIMEOUT).await? {
        FetchOutcome::Blocked(_) => Ok(Detection::new(ForumFamily::Unknown, BLOCKED_REMEDIATION)),
        FetchOutcome::Page(page) => {
            if !page.is_success() {
                tracing::warn!("Detection fetch of {} returned HTTP {}", url, page.status);
            }
            let detection = classify(&page.body);
            tracing::info!("Detected {} for {}: {}", detection.family, url, detection.message);
            Ok(detection)
        }
    }
}
