//! Microphone permission gate

use std::sync::Arc;
use tokio::sync::Mutex;

use crate::application::ports::{PermissionDecision, PermissionHost};

/// Caches microphone access approval for the process lifetime.
///
/// A grant is remembered and never re-prompts; a denial is not remembered,
/// so the user can be asked again on the next attempt. Requests serialize
/// through an internal lock, which also collapses concurrent prompts into
/// one host interaction.
pub struct PermissionGate {
    host: Arc<dyn PermissionHost>,
    granted: Mutex<bool>,
}

impl PermissionGate {
    /// Create a gate over the given permission host
    pub fn new(host: Arc<dyn PermissionHost>) -> Self {
        Self {
            host,
            granted: Mutex::new(false),
        }
    }

    /// Request microphone access, prompting the host only when no grant is
    /// cached yet
    pub async fn request(&self) -> PermissionDecision {
        let mut granted = self.granted.lock().await;
        if *granted {
            return PermissionDecision::Granted;
        }

        let decision = self.host.request_microphone().await;
        if decision.is_granted() {
            *granted = true;
        }
        decision
    }

    /// Check whether a grant is already cached
    pub async fn is_granted(&self) -> bool {
        *self.granted.lock().await
    }
}
