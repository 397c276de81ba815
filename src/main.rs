//! forum-harvest main entry point
//!
//! This is the command-line interface for the forum thread crawler.

use chrono::{DateTime, Utc};
use clap::Parser;
use forum_harvest::config::{load_config_with_hash, Config};
use forum_harvest::crawler::crawl_topic_with;
use forum_harvest::detect::detect_with;
use forum_harvest::http::{ClientConfig, RetryClient};
use forum_harvest::model::{CrawlEvent, CrawlRequest, Topic};
use futures::StreamExt;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tracing_subscriber::EnvFilter;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// forum-harvest: a resilient forum thread crawler
///
/// Crawls the configured forum threads, prints every post newer than the
/// configured window as one JSON object per line on stdout, and logs
/// progress on stderr.
#[derive(Parser, Debug)]
#[command(name = "forum-harvest")]
#[command(version = "1.0.0")]
#[command(about = "A resilient forum thread crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Detect each topic's forum engine and exit
    #[arg(long)]
    detect: bool,

    /// Only keep posts at or after this RFC 3339 timestamp
    #[arg(long, value_name = "RFC3339")]
    since: Option<DateTime<Utc>>,

    /// Maximum number of pages to fetch per topic
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=1000))]
    max_pages: Option<u32>,
}

/// One line of crawl output
#[derive(Debug, Serialize)]
struct TopicEvent {
    topic: String,
    event: CrawlEvent,
}

/// Per-topic tallies reported when a topic finishes
#[derive(Debug, Default)]
struct TopicSummary {
    posts: usize,
    errors: usize,
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let config = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            cfg
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if cli.detect {
        handle_detect(&config).await
    } else {
        handle_crawl(config, cli.since, cli.max_pages).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// Logs go to stderr; stdout carries the JSON event lines.
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("forum_harvest=info,warn"),
            1 => EnvFilter::new("forum_harvest=debug,info"),
            2 => EnvFilter::new("forum_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --detect mode: prints the detected engine of every topic
async fn handle_detect(config: &Config) -> Result<(), BoxError> {
    println!("=== Forum Detection ===\n");

    for topic in &config.topics {
        let mut client = RetryClient::new(config.identity.client_config(topic))?;
        match detect_with(&mut client, &topic.url).await {
            Ok(detection) => {
                println!("{} ({})", topic.id, topic.url);
                println!("  Family: {}", detection.family);
                for line in detection.message.lines() {
                    println!("  {}", line);
                }
            }
            Err(e) => {
                println!("{} ({})", topic.id, topic.url);
                println!("  Connection error during detection: {}", e);
            }
        }
        println!();
    }

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(
    config: Config,
    since: Option<DateTime<Utc>>,
    max_pages: Option<u32>,
) -> Result<(), BoxError> {
    let mut crawler = config.crawler.clone();
    if since.is_some() {
        crawler.since = since;
    }
    if let Some(max_pages) = max_pages {
        crawler.max_pages = max_pages;
    }

    let request = crawler.request_at(Utc::now());
    tracing::info!(
        "Crawling {} topic(s) since {} (max {} pages each, {} at a time)",
        config.topics.len(),
        request.since.to_rfc3339(),
        request.max_pages,
        crawler.max_concurrent_topics
    );

    let permits = Arc::new(Semaphore::new(crawler.max_concurrent_topics as usize));
    let (tx, mut rx) = mpsc::channel::<TopicEvent>(256);
    let mut tasks = JoinSet::new();

    for topic in config.topics.iter().cloned() {
        let client_config = config.identity.client_config(&topic);
        let request = request.clone();
        let timeout = crawler.timeout();
        let permits = permits.clone();
        let tx = tx.clone();

        tasks.spawn(async move {
            let _permit = permits.acquire_owned().await?;
            let topic_id = topic.id.clone();
            let summary = crawl_one(topic, client_config, request, timeout, tx).await;
            Ok::<_, BoxError>((topic_id, summary?))
        });
    }
    drop(tx);

    while let Some(line) = rx.recv().await {
        println!("{}", serde_json::to_string(&line)?);
    }

    let mut failed = 0;
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(Ok((topic_id, summary))) => tracing::info!(
                "Topic {} done: {} post(s), {} error(s)",
                topic_id,
                summary.posts,
                summary.errors
            ),
            Ok(Err(e)) => {
                failed += 1;
                tracing::error!("Topic crawl failed: {}", e);
            }
            Err(e) => {
                failed += 1;
                tracing::error!("Topic task panicked or was cancelled: {}", e);
            }
        }
    }

    if failed > 0 {
        tracing::warn!("{} topic(s) could not be crawled", failed);
    }
    tracing::info!("Crawl completed");
    Ok(())
}

/// Crawls one topic, forwarding its events to the writer
async fn crawl_one(
    topic: Topic,
    client_config: ClientConfig,
    request: CrawlRequest,
    timeout: Duration,
    tx: mpsc::Sender<TopicEvent>,
) -> Result<TopicSummary, BoxError> {
    let client = RetryClient::new(client_config)?;
    let topic_id = topic.id.clone();
    let progress_id = topic.id.clone();

    let walker = crawl_topic_with(client, topic, request)
        .await
        .with_timeout(timeout)
        .with_progress(move |page, total| {
            tracing::info!("[{}] page {}/{}", progress_id, page, total);
        });

    let mut summary = TopicSummary::default();
    let events = walker.into_stream();
    futures::pin_mut!(events);

    while let Some(event) = events.next().await {
        if event.is_error() {
            summary.errors += 1;
        } else {
            summary.posts += 1;
        }

        let line = TopicEvent {
            topic: topic_id.clone(),
            event,
        };
        if tx.send(line).await.is_err() {
            tracing::warn!("Output closed, stopping topic {}", topic_id);
            break;
        }
    }

    Ok(summary)
}
