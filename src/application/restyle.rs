//! Restyle orchestration use case

use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::application::cache::RestyleCache;
use crate::application::ports::{ProviderError, RestyleProvider};
use crate::domain::recording::{Artifact, ArtifactLocator};
use crate::domain::restyle::RestyleRequest;

/// Errors from the restyle use case
#[derive(Debug, Error)]
pub enum RestyleError {
    #[error("Restyle failed: {0}")]
    Provider(#[from] ProviderError),

    #[error("Failed to read source audio: {0}")]
    SourceUnreadable(String),
}

/// Output of one restyle invocation
#[derive(Debug, Clone)]
pub struct RestyleOutcome {
    /// The transformed audio
    pub artifact: Artifact,
    /// Whether the result came from the cache instead of the provider
    pub from_cache: bool,
}

/// Routes restyle requests through the cache, calling the provider only on
/// a miss.
///
/// A provider failure is surfaced unchanged and caches nothing, so an
/// identical retry goes back to the provider. Concurrent identical requests
/// are not collapsed; each miss pays for its own provider call.
pub struct RestyleOrchestrator<P: RestyleProvider> {
    provider: P,
    cache: Arc<RestyleCache>,
}

impl<P: RestyleProvider> RestyleOrchestrator<P> {
    /// Create an orchestrator over the given provider and shared cache
    pub fn new(provider: P, cache: Arc<RestyleCache>) -> Self {
        Self { provider, cache }
    }

    /// Get the shared cache
    pub fn cache(&self) -> &RestyleCache {
        &self.cache
    }

    /// Transform a recorded artifact into the requested voice style.
    ///
    /// The returned artifact inherits the source's duration and carries the
    /// mime type declared by the provider.
    pub async fn restyle(
        &self,
        source: &Artifact,
        request: &RestyleRequest,
    ) -> Result<RestyleOutcome, RestyleError> {
        let fingerprint = request.fingerprint();

        if let Some(artifact) = self.cache.lookup(&fingerprint) {
            debug!(fingerprint = %fingerprint, "restyle served from cache");
            return Ok(RestyleOutcome {
                artifact,
                from_cache: true,
            });
        }

        let restyled = match source.locator() {
            ArtifactLocator::Buffer(bytes) => {
                self.provider
                    .transform(
                        bytes,
                        source.mime_type(),
                        request.style(),
                        request.enhancements(),
                    )
                    .await?
            }
            ArtifactLocator::File(path) => {
                let bytes = tokio::fs::read(path).await.map_err(|e| {
                    RestyleError::SourceUnreadable(format!("{}: {}", path.display(), e))
                })?;
                self.provider
                    .transform(
                        &bytes,
                        source.mime_type(),
                        request.style(),
                        request.enhancements(),
                    )
                    .await?
            }
        };

        let artifact = Artifact::from_buffer(
            restyled.data,
            source.duration_millis(),
            restyled.mime_type,
        );
        debug!(fingerprint = %fingerprint, "restyle result cached");
        self.cache.insert(fingerprint, artifact.clone());

        Ok(RestyleOutcome {
            artifact,
            from_cache: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::RestyledAudio;
    use crate::domain::recording::AudioMimeType;
    use crate::domain::restyle::VoiceStyleId;
    use async_trait::async_trait;
    use std::collections::BTreeMap;
    use std::io::Write;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Clone, Copy)]
    enum ProviderScript {
        AlwaysOk,
        OkThenFail,
        FailThenOk,
    }

    struct ScriptedProvider {
        script: ProviderScript,
        calls: AtomicUsize,
        received: Mutex<Vec<u8>>,
    }

    impl ScriptedProvider {
        fn new(script: ProviderScript) -> Self {
            Self {
                script,
                calls: AtomicUsize::new(0),
                received: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl RestyleProvider for &ScriptedProvider {
        async fn transform(
            &self,
            audio: &[u8],
            _mime_type: AudioMimeType,
            _style: &VoiceStyleId,
            _enhancements: &BTreeMap<String, String>,
        ) -> Result<RestyledAudio, ProviderError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            *self.received.lock().unwrap() = audio.to_vec();

            let fail = match self.script {
                ProviderScript::AlwaysOk => false,
                ProviderScript::OkThenFail => call > 0,
                ProviderScript::FailThenOk => call == 0,
            };
            if fail {
                return Err(ProviderError::ApiError("scripted failure".into()));
            }
            Ok(RestyledAudio {
                data: vec![9, 9, 9],
                mime_type: AudioMimeType::Mp3,
            })
        }
    }

    fn source() -> Artifact {
        Artifact::from_buffer(vec![1, 2, 3, 4], 2000, AudioMimeType::Wav)
    }

    fn request() -> RestyleRequest {
        RestyleRequest::new("narrator-warm").with_enhancement("emotion", "calm")
    }

    #[tokio::test]
    async fn miss_invokes_provider_then_identical_request_hits_cache() {
        let provider = ScriptedProvider::new(ProviderScript::AlwaysOk);
        let orchestrator = RestyleOrchestrator::new(&provider, Arc::new(RestyleCache::new()));

        let first = orchestrator.restyle(&source(), &request()).await.unwrap();
        assert!(!first.from_cache);

        let second = orchestrator.restyle(&source(), &request()).await.unwrap();
        assert!(second.from_cache);
        assert_eq!(second.artifact, first.artifact);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn provider_wired_to_succeed_once_still_serves_identical_retries() {
        let provider = ScriptedProvider::new(ProviderScript::OkThenFail);
        let orchestrator = RestyleOrchestrator::new(&provider, Arc::new(RestyleCache::new()));

        let first = orchestrator.restyle(&source(), &request()).await.unwrap();
        let second = orchestrator.restyle(&source(), &request()).await.unwrap();
        assert!(!first.from_cache);
        assert!(second.from_cache);
    }

    #[tokio::test]
    async fn provider_failure_is_surfaced_and_not_cached() {
        let provider = ScriptedProvider::new(ProviderScript::FailThenOk);
        let orchestrator = RestyleOrchestrator::new(&provider, Arc::new(RestyleCache::new()));

        let err = orchestrator.restyle(&source(), &request()).await.unwrap_err();
        assert!(matches!(err, RestyleError::Provider(_)));
        assert_eq!(orchestrator.cache().len(), 0);

        // The retry misses the cache and reaches the provider again
        let outcome = orchestrator.restyle(&source(), &request()).await.unwrap();
        assert!(!outcome.from_cache);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn different_enhancements_do_not_share_cache_entries() {
        let provider = ScriptedProvider::new(ProviderScript::AlwaysOk);
        let orchestrator = RestyleOrchestrator::new(&provider, Arc::new(RestyleCache::new()));

        let calm = request();
        let bright = RestyleRequest::new("narrator-warm").with_enhancement("emotion", "bright");

        orchestrator.restyle(&source(), &calm).await.unwrap();
        let outcome = orchestrator.restyle(&source(), &bright).await.unwrap();
        assert!(!outcome.from_cache);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
        assert_eq!(orchestrator.cache().len(), 2);
    }

    #[tokio::test]
    async fn buffer_source_bytes_reach_the_provider() {
        let provider = ScriptedProvider::new(ProviderScript::AlwaysOk);
        let orchestrator = RestyleOrchestrator::new(&provider, Arc::new(RestyleCache::new()));

        orchestrator.restyle(&source(), &request()).await.unwrap();
        assert_eq!(*provider.received.lock().unwrap(), vec![1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn file_source_is_read_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[7, 8, 9]).unwrap();
        let artifact = Artifact::from_file(file.path().to_path_buf(), 1200, AudioMimeType::Ogg);

        let provider = ScriptedProvider::new(ProviderScript::AlwaysOk);
        let orchestrator = RestyleOrchestrator::new(&provider, Arc::new(RestyleCache::new()));

        let outcome = orchestrator.restyle(&artifact, &request()).await.unwrap();
        assert_eq!(*provider.received.lock().unwrap(), vec![7, 8, 9]);
        assert_eq!(outcome.artifact.duration_millis(), 1200);
    }

    #[tokio::test]
    async fn missing_file_source_is_unreadable_not_provider_error() {
        let artifact = Artifact::from_file(
            std::path::PathBuf::from("/nonexistent/take.ogg"),
            1000,
            AudioMimeType::Ogg,
        );

        let provider = ScriptedProvider::new(ProviderScript::AlwaysOk);
        let orchestrator = RestyleOrchestrator::new(&provider, Arc::new(RestyleCache::new()));

        let err = orchestrator.restyle(&artifact, &request()).await.unwrap_err();
        assert!(matches!(err, RestyleError::SourceUnreadable(_)));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn restyled_artifact_inherits_duration_and_provider_mime() {
        let provider = ScriptedProvider::new(ProviderScript::AlwaysOk);
        let orchestrator = RestyleOrchestrator::new(&provider, Arc::new(RestyleCache::new()));

        let outcome = orchestrator.restyle(&source(), &request()).await.unwrap();
        assert_eq!(outcome.artifact.duration_millis(), 2000);
        assert_eq!(outcome.artifact.mime_type(), AudioMimeType::Mp3);
        assert_eq!(outcome.artifact.bytes(), Some(&[9u8, 9, 9][..]));
    }
}
