use crate::config::types::{Config, CrawlerConfig, IdentityConfig};
use crate::model::Topic;
use crate::ConfigError;
use std::collections::HashSet;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_identity_config(&config.identity)?;
    validate_topics(&config.topics)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_pages < 1 || config.max_pages > 1000 {
        return Err(ConfigError::Validation(format!(
            "max-pages must be between 1 and 1000, got {}",
            config.max_pages
        )));
    }

    if !config.delay_secs.is_finite() || config.delay_secs < 0.0 {
        return Err(ConfigError::Validation(format!(
            "delay-secs must be a non-negative number, got {}",
            config.delay_secs
        )));
    }

    if config.timeout_secs < 1 || config.timeout_secs > 300 {
        return Err(ConfigError::Validation(format!(
            "timeout-secs must be between 1 and 300, got {}",
            config.timeout_secs
        )));
    }

    if config.since_days < 1 || config.since_days > 36500 {
        return Err(ConfigError::Validation(format!(
            "since-days must be between 1 and 36500, got {}",
            config.since_days
        )));
    }

    if config.max_concurrent_topics < 1 || config.max_concurrent_topics > 16 {
        return Err(ConfigError::Validation(format!(
            "max-concurrent-topics must be between 1 and 16, got {}",
            config.max_concurrent_topics
        )));
    }

    Ok(())
}

/// Validates identity overrides
fn validate_identity_config(config: &IdentityConfig) -> Result<(), ConfigError> {
    if config.user_agents.iter().any(|ua| ua.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "user-agents cannot contain empty entries".to_string(),
        ));
    }

    if let Some(language) = &config.accept_language {
        if language.trim().is_empty() {
            return Err(ConfigError::Validation(
                "accept-language cannot be empty".to_string(),
            ));
        }
    }

    Ok(())
}

/// Validates topic entries
fn validate_topics(topics: &[Topic]) -> Result<(), ConfigError> {
    if topics.is_empty() {
        return Err(ConfigError::Validation(
            "at least one [[topic]] must be configured".to_string(),
        ));
    }

    let mut ids = HashSet::new();
    for topic in topics {
        if topic.id.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "topic '{}' has an empty id",
                topic.name
            )));
        }

        if !ids.insert(topic.id.as_str()) {
            return Err(ConfigError::Validation(format!(
                "duplicate topic id '{}'",
                topic.id
            )));
        }

        validate_topic_url(topic)?;

        if let Some(agent) = &topic.user_agent {
            if agent.trim().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "topic '{}' has an empty user-agent",
                    topic.id
                )));
            }
        }
    }

    Ok(())
}

/// Validates that a topic URL is an absolute http(s) URL
fn validate_topic_url(topic: &Topic) -> Result<(), ConfigError> {
    let url = Url::parse(&topic.url).map_err(|e| {
        ConfigError::InvalidUrl(format!("topic '{}' url '{}': {}", topic.id, topic.url, e))
    })?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "topic '{}' url must be http or https, got '{}'",
            topic.id, topic.url
        )));
    }

    if url.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(format!(
            "topic '{}' url has no host: '{}'",
            topic.id, topic.url
        )));
    }

    Ok(())
}
