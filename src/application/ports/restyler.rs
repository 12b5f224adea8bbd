//! Restyle provider port interface

use async_trait::async_trait;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::domain::recording::AudioMimeType;
use crate::domain::restyle::VoiceStyleId;

/// Provider errors
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("Invalid API key")]
    InvalidApiKey,

    #[error("Rate limit exceeded. Please try again later.")]
    RateLimited,

    #[error("Provider returned no audio")]
    EmptyAudio,

    #[error("API request failed: {0}")]
    RequestFailed(String),

    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    #[error("API error: {0}")]
    ApiError(String),
}

/// Transformed audio returned by a provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestyledAudio {
    pub data: Vec<u8>,
    pub mime_type: AudioMimeType,
}

/// Port for the external voice transformation capability.
///
/// Each call is billed by the provider, so callers are expected to
/// deduplicate identical requests before invoking it.
#[async_trait]
pub trait RestyleProvider: Send + Sync {
    /// Transform recorded audio into the given voice style.
    ///
    /// # Arguments
    /// * `audio` - Raw bytes of the source recording
    /// * `mime_type` - Container type of `audio`
    /// * `style` - Target voice style
    /// * `enhancements` - Category -> value tuning pairs
    ///
    /// # Returns
    /// The restyled audio or an error
    async fn transform(
        &self,
        audio: &[u8],
        mime_type: AudioMimeType,
        style: &VoiceStyleId,
        enhancements: &BTreeMap<String, String>,
    ) -> Result<RestyledAudio, ProviderError>;
}
