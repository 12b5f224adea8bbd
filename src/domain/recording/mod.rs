//! Recording domain module

mod artifact;
mod clock;
mod duration;
mod state;

pub use artifact::{Artifact, ArtifactLocator, AudioMimeType};
pub use clock::PauseAwareClock;
pub use duration::Duration;
pub use state::{SessionState, StateError};
