//! Recording session states

use std::fmt;
use thiserror::Error;

/// Lifecycle states of a recording session.
///
/// `Stopped`, `Cancelled` and `Failed` are terminal: the session will never
/// transition out of them on its own, but a fresh `start` may begin a new
/// take from any of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionState {
    #[default]
    Idle,
    RequestingPermission,
    Recording,
    Paused,
    Stopping,
    Stopped,
    Cancelled,
    Failed,
}

impl SessionState {
    /// Get the string representation
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::RequestingPermission => "requesting permission",
            Self::Recording => "recording",
            Self::Paused => "paused",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
        }
    }

    /// Check whether the state is terminal
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Stopped | Self::Cancelled | Self::Failed)
    }

    /// Check whether audio hardware is currently held
    pub const fn is_active(&self) -> bool {
        matches!(self, Self::Recording | Self::Paused)
    }

    /// Check whether a new take may begin from this state
    pub const fn accepts_start(&self) -> bool {
        matches!(self, Self::Idle) || self.is_terminal()
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error when an operation is attempted in a state that does not permit it.
///
/// The state is kept as a string so that capture backends can report their
/// own internal phases through the same error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot {operation} while {state}")]
pub struct StateError {
    pub operation: String,
    pub state: String,
}

impl StateError {
    /// Create a state error for a rejected operation
    pub fn new(operation: impl Into<String>, state: impl fmt::Display) -> Self {
        Self {
            operation: operation.into(),
            state: state.to_string(),
        }
    }
}
