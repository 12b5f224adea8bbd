//! Platform permission hosts

use async_trait::async_trait;

use crate::application::ports::{PermissionDecision, PermissionHost};

/// Permission host with a fixed answer.
///
/// Desktop shells running from a terminal have no separate prompt broker
/// for microphone access; the device either opens or it does not. The
/// static host models that by answering immediately. A denying host
/// exercises the denial path without touching any device.
pub struct StaticPermissionHost {
    decision: PermissionDecision,
}

impl StaticPermissionHost {
    /// Host that always grants microphone access
    pub fn granted() -> Self {
        Self {
            decision: PermissionDecision::Granted,
        }
    }

    /// Host that always denies microphone access
    pub fn denied() -> Self {
        Self {
            decision: PermissionDecision::Denied,
        }
    }
}

#[async_trait]
impl PermissionHost for StaticPermissionHost {
    async fn request_microphone(&self) -> PermissionDecision {
        self.decision
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn granted_host_grants() {
        let host = StaticPermissionHost::granted();
        assert_eq!(host.request_microphone().await, PermissionDecision::Granted);
    }

    #[tokio::test]
    async fn denied_host_denies() {
        let host = StaticPermissionHost::denied();
        assert_eq!(host.request_microphone().await, PermissionDecision::Denied);
    }
}
