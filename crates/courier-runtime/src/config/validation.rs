//! Configuration validation utilities.

use url::Url;

use super::error::{ConfigError, ConfigResult};
use super::schema::{CourierConfig, TransportMode, WebhookConfig};

/// Validates the entire configuration.
pub fn validate_config(config: &CourierConfig) -> ConfigResult<()> {
    validate_base_url(&config.api.base_url)?;

    if config.transport == TransportMode::Webhook {
        validate_webhook_config(&config.webhook)?;
    }

    Ok(())
}

/// Validates push mode settings.
fn validate_webhook_config(webhook: &WebhookConfig) -> ConfigResult<()> {
    if webhook.host.is_empty() {
        return Err(ConfigError::validation("webhook.host must not be empty"));
    }

    validate_path(&webhook.path)?;

    match &webhook.public_url {
        Some(url) => {
            validate_url(url)?;
        }
        None if !webhook.tunnel => {
            return Err(ConfigError::validation(
                "webhook mode needs either webhook.public_url or webhook.tunnel = true",
            ));
        }
        None => {
            if webhook.tunnel_command.is_empty() {
                return Err(ConfigError::validation(
                    "webhook.tunnel_command must not be empty",
                ));
            }
        }
    }

    Ok(())
}

/// Validates an HTTP(S) URL.
fn validate_url(url: &str) -> ConfigResult<Url> {
    if url.is_empty() {
        return Err(ConfigError::invalid_url(url, "URL must not be empty"));
    }

    let parsed = Url::parse(url).map_err(|e| ConfigError::invalid_url(url, e.to_string()))?;

    let valid_schemes = ["http", "https"];
    if !valid_schemes.contains(&parsed.scheme()) {
        return Err(ConfigError::invalid_url(
            url,
            format!("URL scheme must be one of: {:?}", valid_schemes),
        ));
    }

    Ok(parsed)
}

/// Validates the API base URL. The token is appended to it verbatim, so it
/// must end in a path segment prefix such as `/bot`.
fn validate_base_url(url: &str) -> ConfigResult<()> {
    let parsed = validate_url(url)?;

    if parsed.query().is_some() || parsed.fragment().is_some() {
        return Err(ConfigError::invalid_url(
            url,
            "base URL must not carry a query or fragment",
        ));
    }
    if parsed.path().ends_with('/') {
        return Err(ConfigError::invalid_url(
            url,
            "base URL must end with a path segment prefix, e.g. '/bot'",
        ));
    }

    Ok(())
}

/// Validates a path.
fn validate_path(path: &str) -> ConfigResult<()> {
    if !path.starts_with('/') {
        return Err(ConfigError::validation("Path must start with '/'"));
    }
    Ok(())
}
