//! Application layer - Use cases and port interfaces
//!
//! Contains the core business operations and trait definitions
//! for external system interactions.

pub mod cache;
pub mod permission;
pub mod ports;
pub mod restyle;
pub mod session;

// Re-export use cases
pub use cache::{RestyleCache, DEFAULT_TTL};
pub use permission::PermissionGate;
pub use restyle::{RestyleError, RestyleOrchestrator, RestyleOutcome};
pub use session::RecordingSession;
