use crate::config::types::{
    ActivityConfig, Config, ForumConfig, MembershipConfig, NetworkConfig, RetryConfig,
    TopicsConfig,
};
use crate::ConfigError;
use chrono_tz::Tz;
use scraper::Selector;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_forum_config(&config.forum)?;
    validate_credentials(&config.credentials.username)?;
    validate_network_config(&config.network)?;
    validate_retry_config(&config.retry)?;
    validate_topics_config(&config.topics)?;
    validate_activity_config(&config.activity)?;
    validate_membership_config(&config.membership)?;

    if config.storage.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates site location and login conventions
fn validate_forum_config(config: &ForumConfig) -> Result<(), ConfigError> {
    let base = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base_url: {}", e)))?;

    if base.scheme() != "http" && base.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "base_url '{}' must use http or https",
            config.base_url
        )));
    }

    for path in [&config.main_forum_path, &config.login_path] {
        base.join(path)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid path '{}': {}", path, e)))?;
    }

    if config.login_form_id.is_empty() {
        return Err(ConfigError::Validation(
            "login_form_id cannot be empty".to_string(),
        ));
    }

    if config.logout_markers.iter().all(|m| m.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "logout_markers must contain at least one non-empty marker".to_string(),
        ));
    }

    validate_selector(&config.login_error_selector)?;

    Ok(())
}

fn validate_credentials(username: &str) -> Result<(), ConfigError> {
    if username.trim().is_empty() {
        return Err(ConfigError::Validation(
            "credentials.username cannot be empty".to_string(),
        ));
    }
    Ok(())
}

/// Validates proxy and concurrency settings
fn validate_network_config(config: &NetworkConfig) -> Result<(), ConfigError> {
    if let Some(proxy) = &config.proxy_url {
        let url = Url::parse(proxy)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid proxy_url: {}", e)))?;
        if !matches!(url.scheme(), "socks5" | "socks5h" | "http" | "https") {
            return Err(ConfigError::Validation(format!(
                "proxy_url '{}' must use socks5, socks5h, http or https",
                proxy
            )));
        }
    }

    if let Some(api) = &config.header_api_url {
        Url::parse(api)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid header_api_url: {}", e)))?;
    }

    if config.header_count < 1 {
        return Err(ConfigError::Validation(
            "header_count must be >= 1".to_string(),
        ));
    }

    // Concurrent requests should rarely share an identity
    if config.max_concurrent_requests < 1 || config.max_concurrent_requests > config.header_count
    {
        return Err(ConfigError::Validation(format!(
            "max_concurrent_requests must be between 1 and header_count ({}), got {}",
            config.header_count, config.max_concurrent_requests
        )));
    }

    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "request_timeout_secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

fn validate_retry_config(config: &RetryConfig) -> Result<(), ConfigError> {
    for (name, attempts) in [
        ("fetch_attempts", config.fetch_attempts),
        ("login_attempts", config.login_attempts),
        ("roster_attempts", config.roster_attempts),
    ] {
        if attempts < 1 {
            return Err(ConfigError::Validation(format!(
                "{} must be >= 1, got {}",
                name, attempts
            )));
        }
    }

    if !(config.fetch_backoff >= 1.0) {
        return Err(ConfigError::Validation(format!(
            "fetch_backoff must be >= 1.0, got {}",
            config.fetch_backoff
        )));
    }

    Ok(())
}

fn validate_topics_config(config: &TopicsConfig) -> Result<(), ConfigError> {
    for selector in [
        &config.subforum_selector,
        &config.sub_subforum_selector,
        &config.topic_selector,
        &config.next_selector,
        &config.next_icon_selector,
    ] {
        validate_selector(selector)?;
    }

    if config.collation_alphabet.is_empty() {
        return Err(ConfigError::Validation(
            "collation_alphabet cannot be empty".to_string(),
        ));
    }

    if config.output_dir.is_empty() || config.archive_path.is_empty() {
        return Err(ConfigError::Validation(
            "output_dir and archive_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_activity_config(config: &ActivityConfig) -> Result<(), ConfigError> {
    if config.page_size < 1 {
        return Err(ConfigError::Validation(
            "activity.page_size must be >= 1".to_string(),
        ));
    }

    config.timezone.parse::<Tz>().map_err(|_| {
        ConfigError::Validation(format!("Unknown timezone '{}'", config.timezone))
    })?;

    for class in [
        &config.row_class,
        &config.action_class,
        &config.label_class,
        &config.member_link_class,
    ] {
        validate_class_name(class)?;
    }

    if config.moderator_label.is_empty() || config.time_label.is_empty() {
        return Err(ConfigError::Validation(
            "activity labels cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_membership_config(config: &MembershipConfig) -> Result<(), ConfigError> {
    if config.offsets.is_empty() {
        return Err(ConfigError::Validation(
            "membership.offsets must list at least one offset".to_string(),
        ));
    }

    validate_class_name(&config.member_block_class)?;
    validate_class_name(&config.member_link_class)?;

    Ok(())
}

fn validate_selector(selector: &str) -> Result<(), ConfigError> {
    Selector::parse(selector)
        .map(|_| ())
        .map_err(|_| ConfigError::InvalidSelector(format!("'{}'", selector)))
}

/// Class names are turned into `.class` selectors, so they must be bare identifiers
fn validate_class_name(class: &str) -> Result<(), ConfigError> {
    if class.is_empty()
        || !class
            .chars()
            .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ConfigError::Validation(format!(
            "Invalid class name '{}'",
            class
        )));
    }
    Ok(())
}
