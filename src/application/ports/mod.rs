//! Port interfaces (traits) for external systems
//!
//! These traits define the boundaries between the application
//! and infrastructure layers.

pub mod capture;
pub mod config;
pub mod permission;
pub mod restyler;

// Re-export common types
pub use capture::{CaptureBackend, CaptureBackendFactory, CaptureError};
pub use config::ConfigStore;
pub use permission::{PermissionDecision, PermissionHost};
pub use restyler::{ProviderError, RestyleProvider, RestyledAudio};
