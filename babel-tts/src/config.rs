//! Configuration for speech synthesis and dispatch

use crate::error::SpeechError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Speech synthesis configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    /// Enable speech synthesis (off by default)
    pub enabled: bool,

    /// Remote synthesis API
    pub api: Option<ApiTtsConfig>,

    /// Upper bound for a single engine call, in milliseconds
    pub synthesis_timeout_ms: u64,

    /// Enable audio caching
    pub enable_cache: bool,

    /// Maximum cache size in MB
    pub max_cache_size_mb: u64,

    /// Maximum number of engine calls in flight
    pub queue_size: usize,

    /// Per-channel message limits
    pub chat: ChatLimits,

    /// Whispers are inaudible at or beyond this distance
    pub whisper_range: f32,

    /// Area of interest used to collect whisper candidates
    pub pvs_range: f32,

    /// Fixed offset between an announcement and its audio
    pub announce_delay_ms: u64,

    /// Voice preview settings
    pub preview: PreviewConfig,
}

/// Message length limits, counted in characters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatLimits {
    pub max_message_chars: usize,
    pub max_announcement_length: usize,
}

/// Remote TTS API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiTtsConfig {
    /// API endpoint URL
    pub endpoint: String,

    /// API token (optional, can be set via BABEL_TTS_API_KEY)
    pub api_key: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Output sample rate requested from the engine
    pub sample_rate: u32,
}

/// Voice preview configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    /// Requests allowed per session within `period_ms`
    pub max_requests: usize,

    pub period_ms: u64,

    /// Sentences a preview is picked from
    pub samples: Vec<String>,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            enabled: false, // Off by default
            api: None,
            synthesis_timeout_ms: 10_000,
            enable_cache: true,
            max_cache_size_mb: 100,
            queue_size: 16,
            chat: ChatLimits::default(),
            whisper_range: 10.0,
            pvs_range: 25.0,
            announce_delay_ms: 6_000,
            preview: PreviewConfig::default(),
        }
    }
}

impl Default for ChatLimits {
    fn default() -> Self {
        Self {
            max_message_chars: 300,
            max_announcement_length: 256,
        }
    }
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            max_requests: 3,
            period_ms: 2_000,
            samples: default_samples(),
        }
    }
}

fn default_samples() -> Vec<String> {
    [
        "The quick brown fox jumps over the lazy engineer.",
        "Clown, stop leaving banana peels in front of security!",
        "Captain, are you sure you want to promote the janitor?",
        "Security! There is someone in a grey jumpsuit with a toolbox!",
        "I hope the engineers are keeping an eye on the engine.",
        "Did you hear those noises in maintenance? I'm not going back there.",
        "Has anyone seen the station pet? It ran into the kitchen.",
        "Is there a doctor on board? We need medical help right now!",
        "Hull breach near the evacuation shuttle! Engineers, please respond!",
        "Bartender, pour me the strongest thing you've got.",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl Default for ApiTtsConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            api_key: None,
            timeout_secs: 10,
            sample_rate: 24_000,
        }
    }
}

impl SpeechConfig {
    /// Load configuration from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, SpeechError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Load configuration from a JSON, TOML or YAML document
    pub fn from_str(content: &str) -> Result<Self, SpeechError> {
        if let Ok(config) = serde_json::from_str::<SpeechConfig>(content) {
            return Ok(config);
        }

        if let Ok(config) = toml::from_str::<SpeechConfig>(content) {
            return Ok(config);
        }

        if let Ok(config) = serde_yaml::from_str::<SpeechConfig>(content) {
            return Ok(config);
        }

        Err(SpeechError::Config("Unknown config format".to_string()))
    }

    /// Apply `BABEL_TTS_*` environment overrides on top of `self`
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(enabled) = std::env::var("BABEL_TTS_ENABLED") {
            if let Ok(v) = enabled.parse::<bool>() {
                self.enabled = v;
            }
        }

        if let Ok(endpoint) = std::env::var("BABEL_TTS_API_URL") {
            let api = self.api.get_or_insert_with(ApiTtsConfig::default);
            api.endpoint = endpoint;
        }

        if let Ok(key) = std::env::var("BABEL_TTS_API_KEY") {
            let api = self.api.get_or_insert_with(ApiTtsConfig::default);
            api.api_key = Some(key);
        }

        if let Ok(timeout) = std::env::var("BABEL_TTS_TIMEOUT_MS") {
            if let Ok(ms) = timeout.parse::<u64>() {
                self.synthesis_timeout_ms = ms;
            }
        }

        self
    }

    /// Default configuration with environment overrides applied
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    pub fn synthesis_timeout(&self) -> Duration {
        Duration::from_millis(self.synthesis_timeout_ms)
    }

    pub fn announce_delay(&self) -> Duration {
        Duration::from_millis(self.announce_delay_ms)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.queue_size == 0 {
            return Err("Queue size must be greater than 0".to_string());
        }

        if self.queue_size > 10_000 {
            return Err("Queue size too large (max 10000)".to_string());
        }

        if self.synthesis_timeout_ms == 0 {
            return Err("Synthesis timeout must be greater than 0".to_string());
        }

        const MAX_CACHE_SIZE_MB: u64 = 10_000;
        if self.max_cache_size_mb > MAX_CACHE_SIZE_MB {
            return Err(format!("Cache size too large (max {} MB)", MAX_CACHE_SIZE_MB));
        }

        if self.enable_cache && self.max_cache_size_mb == 0 {
            return Err("Cache size must be greater than 0 (or disable the cache)".to_string());
        }

        if self.chat.max_message_chars == 0 || self.chat.max_announcement_length == 0 {
            return Err("Message limits must be greater than 0".to_string());
        }

        if !self.whisper_range.is_finite() || self.whisper_range <= 0.0 {
            return Err("Whisper range must be a positive number".to_string());
        }

        if !self.pvs_range.is_finite() || self.pvs_range < self.whisper_range {
            return Err("PVS range must be at least the whisper range".to_string());
        }

        if self.preview.max_requests == 0 || self.preview.period_ms == 0 {
            return Err("Preview rate limit must allow at least one request per period".to_string());
        }

        if self.preview.samples.iter().all(|s| s.trim().is_empty()) {
            return Err("At least one preview sample sentence is required".to_string());
        }

        if let Some(api) = &self.api {
            api.validate()?;
        }

        Ok(())
    }
}

impl ApiTtsConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.endpoint.is_empty() {
            return Err("API endpoint cannot be empty".to_string());
        }

        if self.endpoint.len() > 2048 {
            return Err("API endpoint URL too long (max 2048 chars)".to_string());
        }

        let url = url::Url::parse(&self.endpoint)
            .map_err(|e| format!("Invalid API endpoint: {}", e))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err("API endpoint must use http or https".to_string());
        }

        if self.timeout_secs == 0 {
            return Err("API timeout must be greater than 0".to_string());
        }

        if self.timeout_secs > 300 {
            return Err("API timeout too large (max 300 seconds)".to_string());
        }

        Ok(())
    }
}
