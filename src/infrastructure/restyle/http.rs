//! HTTP restyle provider adapter

use std::collections::BTreeMap;

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};

use crate::application::ports::{ProviderError, RestyleProvider, RestyledAudio};
use crate::domain::recording::AudioMimeType;
use crate::domain::restyle::VoiceStyleId;

/// Default transformation API base URL
const DEFAULT_BASE_URL: &str = "https://api.voicemorph.dev/v1";

// Request types for the transformation API

#[derive(Debug, Serialize)]
struct TransformRequest {
    audio: AudioPayload,
    style: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    enhancements: BTreeMap<String, String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AudioPayload {
    mime_type: String,
    data: String,
}

// Response types for the transformation API

#[derive(Debug, Deserialize)]
struct TransformResponse {
    audio: Option<ResponseAudio>,
    error: Option<ApiErrorBody>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponseAudio {
    mime_type: Option<String>,
    data: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// Voice transformation provider speaking the hosted HTTP API
pub struct HttpRestyleProvider {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl HttpRestyleProvider {
    /// Create a provider against the hosted API
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    /// Create a provider against a custom base URL
    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Build the transform endpoint URL
    fn transform_url(&self) -> String {
        format!("{}/transform", self.base_url.trim_end_matches('/'))
    }

    /// Build the request body
    fn build_request(
        audio: &[u8],
        mime_type: AudioMimeType,
        style: &VoiceStyleId,
        enhancements: &BTreeMap<String, String>,
    ) -> TransformRequest {
        TransformRequest {
            audio: AudioPayload {
                mime_type: mime_type.to_string(),
                data: general_purpose::STANDARD.encode(audio),
            },
            style: style.to_string(),
            enhancements: enhancements.clone(),
        }
    }

    /// Decode the restyled audio out of a response body
    fn extract_audio(response: TransformResponse) -> Result<RestyledAudio, ProviderError> {
        if let Some(error) = response.error {
            return Err(ProviderError::ApiError(error.message));
        }

        let audio = response.audio.ok_or(ProviderError::EmptyAudio)?;
        let encoded = audio.data.ok_or(ProviderError::EmptyAudio)?;
        if encoded.is_empty() {
            return Err(ProviderError::EmptyAudio);
        }

        let data = general_purpose::STANDARD
            .decode(encoded.as_bytes())
            .map_err(|e| ProviderError::ParseError(format!("invalid base64 audio: {e}")))?;
        if data.is_empty() {
            return Err(ProviderError::EmptyAudio);
        }

        let mime_type = audio
            .mime_type
            .as_deref()
            .and_then(AudioMimeType::parse)
            .unwrap_or_default();

        Ok(RestyledAudio { data, mime_type })
    }
}

#[async_trait]
impl RestyleProvider for HttpRestyleProvider {
    async fn transform(
        &self,
        audio: &[u8],
        mime_type: AudioMimeType,
        style: &VoiceStyleId,
        enhancements: &BTreeMap<String, String>,
    ) -> Result<RestyledAudio, ProviderError> {
        let url = self.transform_url();
        let body = Self::build_request(audio, mime_type, style, enhancements);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;

        let status = response.status();

        // Handle HTTP errors
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(ProviderError::InvalidApiKey);
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ProviderError::RateLimited);
        }

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ProviderError::ApiError(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        // Parse response
        let response: TransformResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        Self::extract_audio(response)
    }
}
