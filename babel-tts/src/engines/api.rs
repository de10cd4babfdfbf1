//! HTTP TTS engine
//! Posts SSML text to a remote synthesis API and decodes the returned audio

use crate::config::ApiTtsConfig;
use crate::engines::TtsEngine;
use crate::error::SpeechError;
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use bytes::Bytes;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Remote API TTS engine
pub struct ApiTtsEngine {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    sample_rate: u32,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    api_token: &'a str,
    text: &'a str,
    speaker: &'a str,
    ssml: bool,
    word_ts: bool,
    put_accent: bool,
    put_yo: bool,
    sample_rate: u32,
    format: &'a str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    results: Vec<GenerateResult>,
}

#[derive(Deserialize)]
struct GenerateResult {
    audio: String,
}

impl ApiTtsEngine {
    pub fn new(config: &ApiTtsConfig) -> Result<Self, SpeechError> {
        config.validate().map_err(SpeechError::Config)?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SpeechError::Engine(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            sample_rate: config.sample_rate,
        })
    }

    fn api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var("BABEL_TTS_API_KEY").ok())
    }
}

#[async_trait]
impl TtsEngine for ApiTtsEngine {
    async fn synthesize(&self, speaker: &str, ssml: &str) -> Result<Bytes, SpeechError> {
        if ssml.is_empty() {
            return Err(SpeechError::Engine("Text cannot be empty".to_string()));
        }

        let api_key = self
            .api_key()
            .ok_or_else(|| SpeechError::Engine("TTS API key not provided".to_string()))?;

        let request = GenerateRequest {
            api_token: &api_key,
            text: ssml,
            speaker,
            ssml: true,
            word_ts: false,
            put_accent: true,
            put_yo: false,
            sample_rate: self.sample_rate,
            format: "ogg",
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| SpeechError::Engine(format!("TTS API request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            return Err(SpeechError::Engine(format!("TTS API error ({}): {}", status, error_text)));
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| SpeechError::Engine(format!("Failed to parse TTS response: {}", e)))?;

        let audio = body
            .results
            .first()
            .ok_or_else(|| SpeechError::Engine("TTS response has no results".to_string()))?;

        let bytes = general_purpose::STANDARD
            .decode(&audio.audio)
            .map_err(|e| SpeechError::Engine(format!("Failed to decode base64 audio: {}", e)))?;

        debug!(speaker, bytes = bytes.len(), "TTS API returned audio");
        Ok(Bytes::from(bytes))
    }

    fn is_available(&self) -> bool {
        self.api_key().is_some()
    }

    fn name(&self) -> &str {
        "api"
    }
}
