//! Application configuration value object

use serde::{Deserialize, Serialize};

/// Default capture backend for this platform
pub const fn default_backend() -> &'static str {
    if cfg!(unix) {
        "native"
    } else {
        "stream"
    }
}

/// Application configuration.
/// All fields are optional to support partial configs and merging.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub api_key: Option<String>,
    pub api_url: Option<String>,
    pub backend: Option<String>,
    pub voice_style: Option<String>,
    pub max_duration: Option<String>,
    pub cache_ttl: Option<String>,
    pub output_dir: Option<String>,
}

impl AppConfig {
    /// Create config with default values
    pub fn defaults() -> Self {
        Self {
            api_key: None,
            api_url: None,
            backend: Some(default_backend().to_string()),
            voice_style: None,
            max_duration: Some("10m".to_string()),
            cache_ttl: Some("5m".to_string()),
            output_dir: None,
        }
    }

    /// Create an empty config (all None)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Merge this config with another, where other takes precedence.
    /// Only non-None values from other will override this.
    pub fn merge(self, other: Self) -> Self {
        Self {
            api_key: other.api_key.or(self.api_key),
            api_url: other.api_url.or(self.api_url),
            backend: other.backend.or(self.backend),
            voice_style: other.voice_style.or(self.voice_style),
            max_duration: other.max_duration.or(self.max_duration),
            cache_ttl: other.cache_ttl.or(self.cache_ttl),
            output_dir: other.output_dir.or(self.output_dir),
        }
    }

    /// Get the capture backend tag, or the platform default if not set
    pub fn backend_or_default(&self) -> &str {
        self.backend.as_deref().unwrap_or_else(|| default_backend())
    }
}
