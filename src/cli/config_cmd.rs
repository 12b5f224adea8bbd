//! Config command handler

use crate::application::ports::ConfigStore;
use crate::domain::error::ConfigError;
use crate::infrastructure::capture::CaptureEnvironment;

use super::args::{is_valid_config_key, ConfigAction, VALID_CONFIG_KEYS};
use super::presenter::Presenter;

/// Handle config subcommand
pub async fn handle_config_command<S: ConfigStore>(
    action: ConfigAction,
    store: &S,
    presenter: &Presenter,
) -> Result<(), ConfigError> {
    match action {
        ConfigAction::Init => handle_init(store, presenter).await,
        ConfigAction::Set { key, value } => handle_set(store, presenter, &key, &value).await,
        ConfigAction::Get { key } => handle_get(store, presenter, &key).await,
        ConfigAction::List => handle_list(store, presenter).await,
        ConfigAction::Path => handle_path(store, presenter),
    }
}

async fn handle_init<S: ConfigStore>(store: &S, presenter: &Presenter) -> Result<(), ConfigError> {
    store.init().await?;
    presenter.success(&format!(
        "Config file created at: {}",
        store.path().display()
    ));
    Ok(())
}

async fn handle_set<S: ConfigStore>(
    store: &S,
    presenter: &Presenter,
    key: &str,
    value: &str,
) -> Result<(), ConfigError> {
    // Validate key
    if !is_valid_config_key(key) {
        return Err(ConfigError::ValidationError {
            key: key.to_string(),
            message: format!("Unknown key. Valid keys: {}", VALID_CONFIG_KEYS.join(", ")),
        });
    }

    // Validate value based on key type
    validate_config_value(key, value)?;

    // Load existing config
    let mut config = store.load().await?;

    // Update the appropriate field
    match key {
        "api_key" => config.api_key = Some(value.to_string()),
        "api_url" => config.api_url = Some(value.to_string()),
        "backend" => config.backend = Some(value.to_lowercase()),
        "voice_style" => config.voice_style = Some(value.to_string()),
        "max_duration" => config.max_duration = Some(value.to_string()),
        "cache_ttl" => config.cache_ttl = Some(value.to_string()),
        "output_dir" => config.output_dir = Some(value.to_string()),
        _ => unreachable!(), // Already validated
    }

    // Save config
    store.save(&config).await?;
    presenter.success(&format!("{} = {}", key, value));

    Ok(())
}

async fn handle_get<S: ConfigStore>(
    store: &S,
    presenter: &Presenter,
    key: &str,
) -> Result<(), ConfigError> {
    // Validate key
    if !is_valid_config_key(key) {
        return Err(ConfigError::ValidationError {
            key: key.to_string(),
            message: format!("Unknown key. Valid keys: {}", VALID_CONFIG_KEYS.join(", ")),
        });
    }

    let config = store.load().await?;

    let value = match key {
        "api_key" => config.api_key.map(|s| mask_api_key(&s)),
        "api_url" => config.api_url,
        "backend" => config.backend,
        "voice_style" => config.voice_style,
        "max_duration" => config.max_duration,
        "cache_ttl" => config.cache_ttl,
        "output_dir" => config.output_dir,
        _ => unreachable!(),
    };

    match value {
        Some(v) => presenter.output(&v),
        None => presenter.output("(not set)"),
    }

    Ok(())
}

async fn handle_list<S: ConfigStore>(store: &S, presenter: &Presenter) -> Result<(), ConfigError> {
    let config = store.load().await?;

    presenter.key_value(
        "api_key",
        &config
            .api_key
            .map(|s| mask_api_key(&s))
            .unwrap_or_else(|| "(not set)".to_string()),
    );
    presenter.key_value("api_url", config.api_url.as_deref().unwrap_or("(not set)"));
    presenter.key_value("backend", config.backend.as_deref().unwrap_or("(not set)"));
    presenter.key_value(
        "voice_style",
        config.voice_style.as_deref().unwrap_or("(not set)"),
    );
    presenter.key_value(
        "max_duration",
        config.max_duration.as_deref().unwrap_or("(not set)"),
    );
    presenter.key_value(
        "cache_ttl",
        config.cache_ttl.as_deref().unwrap_or("(not set)"),
    );
    presenter.key_value(
        "output_dir",
        config.output_dir.as_deref().unwrap_or("(not set)"),
    );

    Ok(())
}

fn handle_path<S: ConfigStore>(store: &S, presenter: &Presenter) -> Result<(), ConfigError> {
    presenter.output(&store.path().to_string_lossy());
    Ok(())
}

/// Validate a config value based on key type
fn validate_config_value(key: &str, value: &str) -> Result<(), ConfigError> {
    match key {
        "max_duration" | "cache_ttl" => {
            value
                .parse::<crate::domain::recording::Duration>()
                .map_err(|e| ConfigError::ValidationError {
                    key: key.to_string(),
                    message: e.to_string(),
                })?;
        }
        "backend" => {
            value
                .parse::<CaptureEnvironment>()
                .map_err(|e| ConfigError::ValidationError {
                    key: key.to_string(),
                    message: e.to_string(),
                })?;
        }
        "api_url" => {
            if !value.starts_with("http://") && !value.starts_with("https://") {
                return Err(ConfigError::ValidationError {
                    key: key.to_string(),
                    message: format!("Invalid URL '{}'. Must start with http:// or https://", value),
                });
            }
        }
        "voice_style" => {
            if value.trim().is_empty() {
                return Err(ConfigError::ValidationError {
                    key: key.to_string(),
                    message: "Voice style cannot be empty".to_string(),
                });
            }
        }
        _ => {} // api_key and output_dir accept any string
    }
    Ok(())
}

/// Mask API key for display (show first 4 and last 4 chars)
fn mask_api_key(key: &str) -> String {
    if key.len() <= 8 {
        "*".repeat(key.len())
    } else {
        format!("{}...{}", &key[..4], &key[key.len() - 4..])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_api_key_long() {
        let masked = mask_api_key("abcdefghijklmnop");
        assert_eq!(masked, "abcd...mnop");
    }

    #[test]
    fn mask_api_key_short() {
        let masked = mask_api_key("short");
        assert_eq!(masked, "*****");
    }

    #[test]
    fn validate_duration_valid() {
        assert!(validate_config_value("max_duration", "30s").is_ok());
        assert!(validate_config_value("max_duration", "1m").is_ok());
        assert!(validate_config_value("cache_ttl", "2m30s").is_ok());
    }

    #[test]
    fn validate_duration_invalid() {
        assert!(validate_config_value("max_duration", "invalid").is_err());
        assert!(validate_config_value("cache_ttl", "0s").is_err());
    }

    #[test]
    fn validate_backend_valid() {
        assert!(validate_config_value("backend", "native").is_ok());
        assert!(validate_config_value("backend", "stream").is_ok());
        assert!(validate_config_value("backend", "STREAM").is_ok());
    }

    #[test]
    fn validate_backend_invalid() {
        assert!(validate_config_value("backend", "cassette").is_err());
    }

    #[test]
    fn validate_api_url() {
        assert!(validate_config_value("api_url", "https://api.example.com/v1").is_ok());
        assert!(validate_config_value("api_url", "http://localhost:9999").is_ok());
        assert!(validate_config_value("api_url", "ftp://nope").is_err());
    }

    #[test]
    fn validate_voice_style() {
        assert!(validate_config_value("voice_style", "narrator-warm").is_ok());
        assert!(validate_config_value("voice_style", "  ").is_err());
    }

    #[test]
    fn api_key_accepts_any_string() {
        assert!(validate_config_value("api_key", "sk-anything-goes").is_ok());
    }
}
