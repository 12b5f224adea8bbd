//! Permission host port interface

use async_trait::async_trait;

/// Outcome of a microphone access request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionDecision {
    Granted,
    Denied,
}

impl PermissionDecision {
    /// Check whether access was granted
    pub const fn is_granted(&self) -> bool {
        matches!(self, Self::Granted)
    }
}

/// Port for the platform's microphone permission prompt.
///
/// The host may block for user interaction; callers must await it. The core
/// only interprets the returned decision.
#[async_trait]
pub trait PermissionHost: Send + Sync {
    /// Ask the platform for microphone access
    async fn request_microphone(&self) -> PermissionDecision;
}

/// Blanket implementation for boxed permission hosts
#[async_trait]
impl PermissionHost for Box<dyn PermissionHost> {
    async fn request_microphone(&self) -> PermissionDecision {
        self.as_ref().request_microphone().await
    }
}
