//! Recording session state machine

use tokio::sync::Mutex;
use tracing::debug;

use crate::application::ports::{CaptureBackend, CaptureBackendFactory, CaptureError};
use crate::domain::recording::{Artifact, SessionState, StateError};

struct SessionInner {
    state: SessionState,
    backend: Option<Box<dyn CaptureBackend>>,
    artifact: Option<Artifact>,
    last_error: Option<CaptureError>,
    final_elapsed_ms: u64,
}

/// Drives one voice recording from idle through to an artifact.
///
/// State machine (terminals: stopped, cancelled, failed):
///
///   IDLE -> REQUESTING_PERMISSION (start)
///   REQUESTING_PERMISSION -> RECORDING (access granted)
///   REQUESTING_PERMISSION -> FAILED (access denied)
///   REQUESTING_PERMISSION -> CANCELLED (cancel)
///   RECORDING <-> PAUSED (pause / resume)
///   RECORDING | PAUSED -> STOPPING -> STOPPED (stop)
///   RECORDING | PAUSED -> CANCELLED (cancel)
///   any non-terminal -> FAILED (backend fault)
///
/// A fresh `start` is also accepted from any terminal state, beginning a new
/// take. Every path out of an active state releases the backend's device
/// handle exactly once, before any error is propagated.
///
/// Transitions serialize through an internal async lock. The lock is
/// deliberately released across the two long awaits (the permission prompt
/// and backend finalization) so `RequestingPermission` and `Stopping` are
/// observable and a concurrent `cancel` can win; the state is re-validated
/// when the lock is reacquired.
pub struct RecordingSession<F: CaptureBackendFactory> {
    factory: F,
    inner: Mutex<SessionInner>,
}

impl<F: CaptureBackendFactory> RecordingSession<F> {
    /// Create an idle session over the given backend factory
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            inner: Mutex::new(SessionInner {
                state: SessionState::Idle,
                backend: None,
                artifact: None,
                last_error: None,
                final_elapsed_ms: 0,
            }),
        }
    }

    /// Get the current state
    pub async fn state(&self) -> SessionState {
        self.inner.lock().await.state
    }

    /// Audible milliseconds captured so far. While a backend is held this
    /// reads its live counter; once the take ends it reads the value
    /// snapshotted when stop or cancel began.
    pub async fn elapsed_millis(&self) -> u64 {
        let inner = self.inner.lock().await;
        match &inner.backend {
            Some(backend) => backend.elapsed_millis(),
            None => inner.final_elapsed_ms,
        }
    }

    /// Artifact of the last take; `Some` only while stopped
    pub async fn artifact(&self) -> Option<Artifact> {
        self.inner.lock().await.artifact.clone()
    }

    /// Error that ended the last take; `Some` only while failed
    pub async fn last_error(&self) -> Option<CaptureError> {
        self.inner.lock().await.last_error.clone()
    }

    /// Begin a new take: request microphone access, then start capturing.
    ///
    /// Accepted from idle or any terminal state; rejected with a
    /// `StateError` otherwise. Clears the previous take's artifact and
    /// error before anything else.
    pub async fn start(&self) -> Result<(), CaptureError> {
        let backend = {
            let mut inner = self.inner.lock().await;
            if !inner.state.accepts_start() {
                return Err(StateError::new("start", inner.state).into());
            }

            inner.artifact = None;
            inner.last_error = None;
            inner.final_elapsed_ms = 0;

            let backend = match self.factory.create() {
                Ok(backend) => backend,
                Err(e) => {
                    inner.last_error = Some(e.clone());
                    transition(&mut inner, SessionState::Failed);
                    return Err(e);
                }
            };
            transition(&mut inner, SessionState::RequestingPermission);
            backend
        };

        // The prompt may block on user interaction; run it unlocked so the
        // session stays observable and cancellable meanwhile.
        let decision = backend.request_access().await;

        let mut inner = self.inner.lock().await;
        if inner.state != SessionState::RequestingPermission {
            // A concurrent cancel won; the never-started backend is dropped.
            return Err(StateError::new("start", inner.state).into());
        }

        if !decision.is_granted() {
            inner.last_error = Some(CaptureError::PermissionDenied);
            transition(&mut inner, SessionState::Failed);
            return Err(CaptureError::PermissionDenied);
        }

        match backend.start().await {
            Ok(()) => {
                debug!(backend = backend.kind(), "capture started");
                inner.backend = Some(backend);
                transition(&mut inner, SessionState::Recording);
                Ok(())
            }
            Err(e) => {
                let _ = backend.cancel().await;
                inner.last_error = Some(e.clone());
                transition(&mut inner, SessionState::Failed);
                Err(e)
            }
        }
    }

    /// Suspend the current take. Elapsed time freezes until resume.
    pub async fn pause(&self) -> Result<(), CaptureError> {
        let mut inner = self.inner.lock().await;
        if inner.state != SessionState::Recording {
            return Err(StateError::new("pause", inner.state).into());
        }

        let result = match inner.backend.as_ref() {
            Some(backend) => backend.pause().await,
            None => return Err(StateError::new("pause", inner.state).into()),
        };

        match result {
            Ok(()) => {
                transition(&mut inner, SessionState::Paused);
                Ok(())
            }
            Err(e) => {
                release_after_fault(&mut inner, &e).await;
                Err(e)
            }
        }
    }

    /// Continue a paused take
    pub async fn resume(&self) -> Result<(), CaptureError> {
        let mut inner = self.inner.lock().await;
        if inner.state != SessionState::Paused {
            return Err(StateError::new("resume", inner.state).into());
        }

        let result = match inner.backend.as_ref() {
            Some(backend) => backend.resume().await,
            None => return Err(StateError::new("resume", inner.state).into()),
        };

        match result {
            Ok(()) => {
                transition(&mut inner, SessionState::Recording);
                Ok(())
            }
            Err(e) => {
                release_after_fault(&mut inner, &e).await;
                Err(e)
            }
        }
    }

    /// Finalize the current take and return its artifact.
    ///
    /// Valid from recording or paused. The elapsed total is snapshotted the
    /// moment stopping begins; a second `stop` finds a non-active state and
    /// returns a `StateError`.
    pub async fn stop(&self) -> Result<Artifact, CaptureError> {
        let backend = {
            let mut inner = self.inner.lock().await;
            if !inner.state.is_active() {
                return Err(StateError::new("stop", inner.state).into());
            }
            let backend = match inner.backend.take() {
                Some(backend) => backend,
                None => return Err(StateError::new("stop", inner.state).into()),
            };
            inner.final_elapsed_ms = backend.elapsed_millis();
            transition(&mut inner, SessionState::Stopping);
            backend
        };

        // Finalization can take a while; run it unlocked so the stopping
        // state is observable. Operations arriving meanwhile get StateErrors.
        let result = backend.stop().await;

        let mut inner = self.inner.lock().await;
        match result {
            Ok(artifact) => {
                debug!(
                    backend = backend.kind(),
                    duration_ms = artifact.duration_millis(),
                    "capture finalized"
                );
                inner.artifact = Some(artifact.clone());
                transition(&mut inner, SessionState::Stopped);
                Ok(artifact)
            }
            Err(e) => {
                // Device release still comes first
                let _ = backend.cancel().await;
                inner.last_error = Some(e.clone());
                transition(&mut inner, SessionState::Failed);
                Err(e)
            }
        }
    }

    /// Abort the current take, discarding any captured data.
    ///
    /// Valid from any non-terminal state except idle and stopping. The
    /// session reaches `Cancelled` and drops its backend even when the
    /// hardware release fails; such an error is propagated afterwards.
    pub async fn cancel(&self) -> Result<(), CaptureError> {
        let mut inner = self.inner.lock().await;
        match inner.state {
            SessionState::RequestingPermission => {
                // The pending start sees the state change and gives up.
                transition(&mut inner, SessionState::Cancelled);
                Ok(())
            }
            SessionState::Recording | SessionState::Paused => {
                let result = match inner.backend.take() {
                    Some(backend) => {
                        inner.final_elapsed_ms = backend.elapsed_millis();
                        backend.cancel().await
                    }
                    None => Ok(()),
                };
                transition(&mut inner, SessionState::Cancelled);
                result
            }
            state => Err(StateError::new("cancel", state).into()),
        }
    }
}

fn transition(inner: &mut SessionInner, to: SessionState) {
    debug!(from = %inner.state, to = %to, "session state change");
    inner.state = to;
}

/// Take and release the backend after a device fault, then mark the session
/// failed. Release always happens before the caller propagates the error.
async fn release_after_fault(inner: &mut SessionInner, error: &CaptureError) {
    if let Some(backend) = inner.backend.take() {
        inner.final_elapsed_ms = backend.elapsed_millis();
        let _ = backend.cancel().await;
    }
    inner.last_error = Some(error.clone());
    transition(inner, SessionState::Failed);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::PermissionDecision;
    use crate::domain::recording::AudioMimeType;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Clone)]
    struct Script {
        decision: PermissionDecision,
        fail_start: bool,
        fail_stop: bool,
    }

    impl Default for Script {
        fn default() -> Self {
            Self {
                decision: PermissionDecision::Granted,
                fail_start: false,
                fail_stop: false,
            }
        }
    }

    struct ScriptedBackend {
        script: Script,
        elapsed: Arc<AtomicU64>,
        holding_device: Arc<AtomicBool>,
        cancels: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl CaptureBackend for ScriptedBackend {
        async fn request_access(&self) -> PermissionDecision {
            self.script.decision
        }

        async fn start(&self) -> Result<(), CaptureError> {
            if self.script.fail_start {
                return Err(CaptureError::StartFailed("scripted".into()));
            }
            self.holding_device.store(true, Ordering::SeqCst);
            Ok(())
        }

        async fn pause(&self) -> Result<(), CaptureError> {
            Ok(())
        }

        async fn resume(&self) -> Result<(), CaptureError> {
            Ok(())
        }

        async fn stop(&self) -> Result<Artifact, CaptureError> {
            if self.script.fail_stop {
                return Err(CaptureError::FinalizeFailed("scripted".into()));
            }
            self.holding_device.store(false, Ordering::SeqCst);
            Ok(Artifact::from_buffer(
                vec![1, 2, 3],
                self.elapsed.load(Ordering::SeqCst),
                AudioMimeType::Wav,
            ))
        }

        async fn cancel(&self) -> Result<(), CaptureError> {
            self.cancels.fetch_add(1, Ordering::SeqCst);
            self.holding_device.store(false, Ordering::SeqCst);
            Ok(())
        }

        fn elapsed_millis(&self) -> u64 {
            self.elapsed.load(Ordering::SeqCst)
        }

        fn kind(&self) -> &'static str {
            "scripted"
        }
    }

    struct ScriptedFactory {
        script: Script,
        elapsed: Arc<AtomicU64>,
        holding_device: Arc<AtomicBool>,
        cancels: Arc<AtomicUsize>,
        creates: Arc<AtomicUsize>,
    }

    impl ScriptedFactory {
        fn new(script: Script) -> Self {
            Self {
                script,
                elapsed: Arc::new(AtomicU64::new(0)),
                holding_device: Arc::new(AtomicBool::new(false)),
                cancels: Arc::new(AtomicUsize::new(0)),
                creates: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    impl CaptureBackendFactory for ScriptedFactory {
        fn create(&self) -> Result<Box<dyn CaptureBackend>, CaptureError> {
            self.creates.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(ScriptedBackend {
                script: self.script.clone(),
                elapsed: self.elapsed.clone(),
                holding_device: self.holding_device.clone(),
                cancels: self.cancels.clone(),
            }))
        }
    }

    fn session_with(script: Script) -> RecordingSession<ScriptedFactory> {
        RecordingSession::new(ScriptedFactory::new(script))
    }

    #[tokio::test]
    async fn start_from_idle_reaches_recording() {
        let session = session_with(Script::default());
        assert_eq!(session.state().await, SessionState::Idle);

        session.start().await.unwrap();
        assert_eq!(session.state().await, SessionState::Recording);
        assert!(session.factory.holding_device.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn start_while_recording_rejected_without_new_backend() {
        let session = session_with(Script::default());
        session.start().await.unwrap();

        let err = session.start().await.unwrap_err();
        assert!(matches!(err, CaptureError::State(_)));
        assert_eq!(session.state().await, SessionState::Recording);
        assert_eq!(session.factory.creates.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn permission_denied_fails_session_without_device() {
        let session = session_with(Script {
            decision: PermissionDecision::Denied,
            ..Script::default()
        });

        let err = session.start().await.unwrap_err();
        assert!(matches!(err, CaptureError::PermissionDenied));
        assert_eq!(session.state().await, SessionState::Failed);
        assert!(matches!(
            session.last_error().await,
            Some(CaptureError::PermissionDenied)
        ));
        assert!(!session.factory.holding_device.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn operations_after_denial_are_state_errors() {
        let session = session_with(Script {
            decision: PermissionDecision::Denied,
            ..Script::default()
        });
        let _ = session.start().await;

        assert!(matches!(
            session.pause().await.unwrap_err(),
            CaptureError::State(_)
        ));
        assert!(matches!(
            session.resume().await.unwrap_err(),
            CaptureError::State(_)
        ));
        assert!(matches!(
            session.stop().await.unwrap_err(),
            CaptureError::State(_)
        ));
    }

    #[tokio::test]
    async fn pause_and_resume_round_trip() {
        let session = session_with(Script::default());
        session.start().await.unwrap();

        session.pause().await.unwrap();
        assert_eq!(session.state().await, SessionState::Paused);

        session.resume().await.unwrap();
        assert_eq!(session.state().await, SessionState::Recording);
    }

    #[tokio::test]
    async fn pause_while_idle_is_state_error() {
        let session = session_with(Script::default());
        let err = session.pause().await.unwrap_err();
        assert!(matches!(err, CaptureError::State(_)));
        assert_eq!(err.to_string(), "cannot pause while idle");
    }

    #[tokio::test]
    async fn resume_while_recording_is_state_error() {
        let session = session_with(Script::default());
        session.start().await.unwrap();

        let err = session.resume().await.unwrap_err();
        assert!(matches!(err, CaptureError::State(_)));
        assert_eq!(session.state().await, SessionState::Recording);
    }

    #[tokio::test]
    async fn stop_produces_artifact_and_releases_device() {
        let session = session_with(Script::default());
        session.start().await.unwrap();
        session.factory.elapsed.store(1500, Ordering::SeqCst);

        let artifact = session.stop().await.unwrap();
        assert_eq!(artifact.duration_millis(), 1500);
        assert_eq!(session.state().await, SessionState::Stopped);
        assert_eq!(session.artifact().await, Some(artifact));
        assert!(!session.factory.holding_device.load(Ordering::SeqCst));
        assert_eq!(session.elapsed_millis().await, 1500);
    }

    #[tokio::test]
    async fn stop_from_paused_succeeds() {
        let session = session_with(Script::default());
        session.start().await.unwrap();
        session.pause().await.unwrap();

        let artifact = session.stop().await.unwrap();
        assert_eq!(session.state().await, SessionState::Stopped);
        assert!(artifact.bytes().is_some());
    }

    #[tokio::test]
    async fn second_stop_is_state_error() {
        let session = session_with(Script::default());
        session.start().await.unwrap();
        session.stop().await.unwrap();

        let err = session.stop().await.unwrap_err();
        assert!(matches!(err, CaptureError::State(_)));
        assert_eq!(err.to_string(), "cannot stop while stopped");
    }

    #[tokio::test]
    async fn cancel_discards_take_and_releases_device() {
        let session = session_with(Script::default());
        session.start().await.unwrap();

        session.cancel().await.unwrap();
        assert_eq!(session.state().await, SessionState::Cancelled);
        assert_eq!(session.artifact().await, None);
        assert!(!session.factory.holding_device.load(Ordering::SeqCst));
        assert_eq!(session.factory.cancels.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cancel_from_paused_succeeds() {
        let session = session_with(Script::default());
        session.start().await.unwrap();
        session.pause().await.unwrap();

        session.cancel().await.unwrap();
        assert_eq!(session.state().await, SessionState::Cancelled);
    }

    #[tokio::test]
    async fn cancel_while_idle_is_state_error() {
        let session = session_with(Script::default());
        let err = session.cancel().await.unwrap_err();
        assert!(matches!(err, CaptureError::State(_)));
    }

    #[tokio::test]
    async fn start_from_terminal_state_begins_fresh_take() {
        let session = session_with(Script::default());
        session.start().await.unwrap();
        session.stop().await.unwrap();
        assert!(session.artifact().await.is_some());

        session.start().await.unwrap();
        assert_eq!(session.state().await, SessionState::Recording);
        assert_eq!(session.artifact().await, None);
        assert_eq!(session.factory.creates.load(Ordering::SeqCst), 2);

        session.cancel().await.unwrap();
        session.start().await.unwrap();
        assert_eq!(session.state().await, SessionState::Recording);
    }

    #[tokio::test]
    async fn backend_start_failure_fails_session_and_releases() {
        let session = session_with(Script {
            fail_start: true,
            ..Script::default()
        });

        let err = session.start().await.unwrap_err();
        assert!(matches!(err, CaptureError::StartFailed(_)));
        assert_eq!(session.state().await, SessionState::Failed);
        assert_eq!(session.factory.cancels.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn stop_failure_fails_session_and_releases() {
        let session = session_with(Script {
            fail_stop: true,
            ..Script::default()
        });
        session.start().await.unwrap();

        let err = session.stop().await.unwrap_err();
        assert!(matches!(err, CaptureError::FinalizeFailed(_)));
        assert_eq!(session.state().await, SessionState::Failed);
        assert_eq!(session.artifact().await, None);
        assert!(!session.factory.holding_device.load(Ordering::SeqCst));
        assert_eq!(session.factory.cancels.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn elapsed_reads_live_counter_then_snapshot() {
        let session = session_with(Script::default());
        session.start().await.unwrap();

        session.factory.elapsed.store(700, Ordering::SeqCst);
        assert_eq!(session.elapsed_millis().await, 700);

        session.factory.elapsed.store(900, Ordering::SeqCst);
        session.cancel().await.unwrap();
        assert_eq!(session.elapsed_millis().await, 900);
    }
}
