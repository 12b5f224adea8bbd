//! Domain layer - Core business logic
//!
//! Contains value objects, entities, and domain errors.
//! This layer has no dependencies on external systems.

pub mod recording;
pub mod restyle;
pub mod config;
pub mod error;

// Re-export common types
pub use error::*;
pub use recording::{Artifact, ArtifactLocator, AudioMimeType, Duration, SessionState, StateError};
pub use restyle::{Fingerprint, RestyleRequest, VoiceStyleId};
pub use config::AppConfig;
