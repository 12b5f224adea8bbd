//! CLI argument definitions using Clap

use clap::{Args, Parser, Subcommand};

use std::path::PathBuf;

use crate::domain::recording::Duration;
use crate::domain::restyle::VoiceStyleId;
use crate::infrastructure::capture::CaptureEnvironment;

/// VoiceMorph - record your voice and restyle it with AI
#[derive(Parser, Debug)]
#[command(name = "voice-morph")]
#[command(version)]
#[command(about = "Record your voice and restyle it into a different AI voice")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Record a take interactively, optionally applying a voice style
    Record(RecordArgs),
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Arguments for the record command
#[derive(Args, Debug, Clone, Default)]
pub struct RecordArgs {
    /// Capture backend (native, stream)
    #[arg(short = 'b', long, value_name = "BACKEND")]
    pub backend: Option<String>,

    /// Voice style to apply after recording (e.g. narrator-warm)
    #[arg(short = 's', long, value_name = "STYLE")]
    pub style: Option<String>,

    /// Enhancement as CATEGORY=VALUE, repeatable (e.g. -e denoise=high)
    #[arg(
        short = 'e',
        long = "enhance",
        value_name = "CATEGORY=VALUE",
        value_parser = parse_enhancement
    )]
    pub enhance: Vec<(String, String)>,

    /// Write the final audio to this path instead of a generated name
    #[arg(short = 'o', long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Stop automatically after this long (e.g., 30s, 5m, 2m30s)
    #[arg(long, value_name = "TIME")]
    pub max_duration: Option<String>,

    /// Keep the raw recording next to the restyled result
    #[arg(long)]
    pub keep_original: bool,

    /// Transformation API base URL
    #[arg(long, value_name = "URL", env = "VOICEMORPH_API_URL")]
    pub api_url: Option<String>,
}

/// Config action subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Create config file with defaults
    Init,
    /// Set a config value
    Set {
        /// Config key
        key: String,
        /// Config value
        value: String,
    },
    /// Get a config value
    Get {
        /// Config key
        key: String,
    },
    /// List all config values
    List,
    /// Show config file path
    Path,
}

/// Parse a CATEGORY=VALUE enhancement argument
pub fn parse_enhancement(raw: &str) -> Result<(String, String), String> {
    let Some((category, value)) = raw.split_once('=') else {
        return Err(format!(
            "invalid enhancement '{raw}'. Expected CATEGORY=VALUE, e.g. denoise=high"
        ));
    };

    let category = category.trim();
    let value = value.trim();
    if category.is_empty() || value.is_empty() {
        return Err(format!(
            "invalid enhancement '{raw}'. Expected CATEGORY=VALUE, e.g. denoise=high"
        ));
    }

    Ok((category.to_string(), value.to_string()))
}

/// Resolved record options after merging config sources
#[derive(Debug, Clone)]
pub struct RecordOptions {
    pub backend: CaptureEnvironment,
    pub style: Option<VoiceStyleId>,
    pub enhancements: Vec<(String, String)>,
    pub output: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub max_duration: Duration,
    pub cache_ttl: Duration,
    pub keep_original: bool,
    pub api_url: Option<String>,
}

/// Valid config keys
pub const VALID_CONFIG_KEYS: &[&str] = &[
    "api_key",
    "api_url",
    "backend",
    "voice_style",
    "max_duration",
    "cache_ttl",
    "output_dir",
];

/// Check if a config key is valid
pub fn is_valid_config_key(key: &str) -> bool {
    VALID_CONFIG_KEYS.contains(&key)
}
