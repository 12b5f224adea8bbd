//! Infrastructure layer - Adapter implementations
//!
//! Contains concrete implementations of the port interfaces,
//! integrating with ffmpeg, the cpal audio stack, the transformation
//! API, and the XDG config directory.

pub mod capture;
pub mod config;
pub mod permission;
pub mod restyle;

// Re-export adapters
#[cfg(unix)]
pub use capture::NativeCaptureBackend;
pub use capture::{
    create_capture_backend, CaptureConfig, CaptureEnvironment, EnvironmentBackendFactory,
    ParseCaptureEnvironmentError, StreamCaptureBackend,
};
pub use config::XdgConfigStore;
pub use permission::StaticPermissionHost;
pub use restyle::HttpRestyleProvider;
