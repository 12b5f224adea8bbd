//! Audio capture backends and their selection

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use crate::application::permission::PermissionGate;
use crate::application::ports::{CaptureBackend, CaptureBackendFactory, CaptureError};

#[cfg(unix)]
mod native;
mod stream;

#[cfg(unix)]
pub use native::NativeCaptureBackend;
pub use stream::StreamCaptureBackend;

/// Lifecycle phase of a single backend instance.
///
/// Backends track their own phase independently of the session, so
/// out-of-order calls are rejected at the device boundary too.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BackendPhase {
    Idle,
    Capturing,
    Paused,
    Done,
}

impl fmt::Display for BackendPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            BackendPhase::Idle => "idle",
            BackendPhase::Capturing => "capturing",
            BackendPhase::Paused => "paused",
            BackendPhase::Done => "done",
        };
        write!(f, "{tag}")
    }
}

/// Which capture implementation to run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureEnvironment {
    /// Drive the host's ffmpeg against the default PulseAudio source (Unix)
    Native,
    /// Capture in-process through the cpal audio stack
    Stream,
}

impl Default for CaptureEnvironment {
    fn default() -> Self {
        if cfg!(unix) {
            CaptureEnvironment::Native
        } else {
            CaptureEnvironment::Stream
        }
    }
}

impl fmt::Display for CaptureEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureEnvironment::Native => write!(f, "native"),
            CaptureEnvironment::Stream => write!(f, "stream"),
        }
    }
}

/// Error type for parsing a capture backend tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseCaptureEnvironmentError {
    pub value: String,
    pub valid_options: &'static str,
}

impl fmt::Display for ParseCaptureEnvironmentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid capture backend '{}'. Valid options: {}",
            self.value, self.valid_options
        )
    }
}

impl std::error::Error for ParseCaptureEnvironmentError {}

impl FromStr for CaptureEnvironment {
    type Err = ParseCaptureEnvironmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "native" => Ok(CaptureEnvironment::Native),
            "stream" => Ok(CaptureEnvironment::Stream),
            _ => Err(ParseCaptureEnvironmentError {
                value: s.to_string(),
                valid_options: "native, stream",
            }),
        }
    }
}

/// Settings shared by capture backends
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Directory holding in-progress recordings (native backend)
    pub temp_dir: PathBuf,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            temp_dir: std::env::temp_dir(),
        }
    }
}

/// Create a capture backend for one take in the given environment.
///
/// The permission gate is shared across takes so an already-granted
/// microphone prompt is not repeated.
pub fn create_capture_backend(
    environment: CaptureEnvironment,
    gate: Arc<PermissionGate>,
    config: &CaptureConfig,
) -> Result<Box<dyn CaptureBackend>, CaptureError> {
    match environment {
        CaptureEnvironment::Native => {
            #[cfg(unix)]
            {
                Ok(Box::new(NativeCaptureBackend::new(gate, config.temp_dir.clone()))
                    as Box<dyn CaptureBackend>)
            }
            #[cfg(not(unix))]
            {
                let _ = (gate, config);
                Err(CaptureError::StartFailed(
                    "the native backend requires a Unix host".to_string(),
                ))
            }
        }
        CaptureEnvironment::Stream => {
            Ok(Box::new(StreamCaptureBackend::new(gate)) as Box<dyn CaptureBackend>)
        }
    }
}

/// Hands the session layer a fresh backend for every take
pub struct EnvironmentBackendFactory {
    environment: CaptureEnvironment,
    gate: Arc<PermissionGate>,
    config: CaptureConfig,
}

impl EnvironmentBackendFactory {
    pub fn new(
        environment: CaptureEnvironment,
        gate: Arc<PermissionGate>,
        config: CaptureConfig,
    ) -> Self {
        Self {
            environment,
            gate,
            config,
        }
    }

    pub fn environment(&self) -> CaptureEnvironment {
        self.environment
    }
}

impl CaptureBackendFactory for EnvironmentBackendFactory {
    fn create(&self) -> Result<Box<dyn CaptureBackend>, CaptureError> {
        create_capture_backend(self.environment, self.gate.clone(), &self.config)
    }
}
