//! Capture backend port interface

use async_trait::async_trait;
use thiserror::Error;

use crate::application::ports::permission::PermissionDecision;
use crate::domain::recording::{Artifact, StateError};

/// Capture errors
#[derive(Debug, Clone, Error)]
pub enum CaptureError {
    #[error("Microphone access denied")]
    PermissionDenied,

    #[error(transparent)]
    State(#[from] StateError),

    #[error("No audio input device available")]
    NoInputDevice,

    #[error("Failed to start capture: {0}")]
    StartFailed(String),

    #[error("Audio device failed: {0}")]
    DeviceFailed(String),

    #[error("Failed to finalize capture: {0}")]
    FinalizeFailed(String),
}

/// Port for one audio capture resource.
///
/// A backend instance carries exactly one take from permission request to
/// stop or cancel. The session layer guarantees operations arrive in a valid
/// order; a backend still rejects out-of-order calls with
/// `CaptureError::State` rather than misbehaving.
///
/// Elapsed time is maintained by the backend's own background notifier (the
/// recording facility's progress reports, or a polling task) and excludes
/// paused intervals. The notifier only updates the counter; it never drives
/// lifecycle changes.
#[async_trait]
pub trait CaptureBackend: Send + Sync {
    /// Ask the platform for microphone access.
    ///
    /// Idempotent; a prior grant may be cached for the process lifetime.
    async fn request_access(&self) -> PermissionDecision;

    /// Begin capturing audio.
    ///
    /// Fails if access was not granted or the device cannot be opened.
    async fn start(&self) -> Result<(), CaptureError>;

    /// Suspend capture. Valid only while actively capturing.
    async fn pause(&self) -> Result<(), CaptureError>;

    /// Continue capture after a pause. Valid only while paused.
    async fn resume(&self) -> Result<(), CaptureError>;

    /// Finalize the capture, release the underlying device, and return the
    /// produced artifact. Valid exactly once per backend instance.
    async fn stop(&self) -> Result<Artifact, CaptureError>;

    /// Abort the capture, discarding any produced data (including on-disk
    /// partials). Releases the underlying device.
    async fn cancel(&self) -> Result<(), CaptureError>;

    /// Audible time captured so far, in milliseconds. Frozen while paused.
    fn elapsed_millis(&self) -> u64;

    /// Short backend tag for logging, e.g. `"native"`
    fn kind(&self) -> &'static str;
}

/// Port for creating capture backends.
///
/// Lets the session layer begin fresh takes without knowing which concrete
/// backend the shell selected.
pub trait CaptureBackendFactory: Send + Sync {
    /// Create a backend for one new take
    fn create(&self) -> Result<Box<dyn CaptureBackend>, CaptureError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_error_converts_into_capture_error() {
        let err: CaptureError = StateError::new("pause", "idle").into();
        assert!(matches!(err, CaptureError::State(_)));
        assert_eq!(err.to_string(), "cannot pause while idle");
    }

    #[test]
    fn error_display() {
        assert_eq!(
            CaptureError::PermissionDenied.to_string(),
            "Microphone access denied"
        );
        assert_eq!(
            CaptureError::StartFailed("device busy".into()).to_string(),
            "Failed to start capture: device busy"
        );
    }
}
