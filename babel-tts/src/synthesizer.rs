//! Speech synthesizer with caching and queue management

use crate::config::SpeechConfig;
use crate::engines::api::ApiTtsEngine;
use crate::engines::TtsEngine;
use crate::error::SpeechError;
use crate::text;
use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, info};

const MAX_AUDIO_SIZE: usize = 10 * 1024 * 1024; // 10MB

#[derive(Clone)]
struct CachedAudio {
    audio: Bytes,
    timestamp: chrono::DateTime<chrono::Utc>,
}

/// Completed synthesis results keyed by (speaker, prepared text).
///
/// Only successful audio is stored. Two in-flight requests for the same
/// uncached phrase both reach the engine; the first insert wins.
pub struct SynthesisCache {
    entries: RwLock<HashMap<String, CachedAudio>>,
    max_size_bytes: usize,
}

impl SynthesisCache {
    pub fn new(max_cache_size_mb: u64) -> Self {
        let max_size_bytes = max_cache_size_mb
            .checked_mul(1024 * 1024)
            .and_then(|b| usize::try_from(b).ok())
            .unwrap_or(usize::MAX);
        Self {
            entries: RwLock::new(HashMap::new()),
            max_size_bytes,
        }
    }

    /// Cache key for a speaker handle and prepared SSML text
    pub fn key(speaker: &str, ssml: &str) -> String {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(speaker.as_bytes());
        hasher.update([0u8]);
        hasher.update(ssml.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    pub fn get(&self, key: &str) -> Option<Bytes> {
        self.entries.read().get(key).map(|c| c.audio.clone())
    }

    /// Store audio unless the key is already present
    pub fn insert(&self, key: String, audio: Bytes) {
        {
            let mut entries = self.entries.write();
            entries.entry(key).or_insert_with(|| CachedAudio {
                audio,
                timestamp: chrono::Utc::now(),
            });
        }
        self.cleanup();
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn total_bytes(&self) -> usize {
        self.entries.read().values().map(|c| c.audio.len()).sum()
    }

    /// Evict oldest entries until the cache is back under 80% of its budget
    fn cleanup(&self) {
        let mut entries = self.entries.write();
        let total_size: usize = entries.values().map(|c| c.audio.len()).sum();
        if total_size <= self.max_size_bytes {
            return;
        }

        let mut by_age: Vec<_> = entries
            .iter()
            .map(|(k, v)| (k.clone(), v.timestamp, v.audio.len()))
            .collect();
        by_age.sort_by_key(|(_, timestamp, _)| *timestamp);

        let target_size = self.max_size_bytes / 100 * 80;
        let mut remaining = total_size;
        let mut removed = 0usize;
        for (key, _, size) in by_age {
            if remaining <= target_size {
                break;
            }
            entries.remove(&key);
            remaining -= size;
            removed += 1;
        }
        info!(removed, remaining, "Cleaned up synthesis cache");
    }
}

/// Speech synthesizer with caching and queue management
pub struct SpeechSynthesizer {
    config: Arc<SpeechConfig>,
    engine: Arc<dyn TtsEngine>,
    cache: SynthesisCache,
    queue_semaphore: Arc<Semaphore>,
}

impl SpeechSynthesizer {
    /// Create a synthesizer backed by the configured remote API
    pub fn new(config: SpeechConfig) -> Result<Self, SpeechError> {
        config.validate().map_err(SpeechError::Config)?;

        let api_config = config
            .api
            .as_ref()
            .ok_or_else(|| SpeechError::Config("API config required for TTS".to_string()))?;
        let engine = ApiTtsEngine::new(api_config)?;
        if !engine.is_available() {
            return Err(SpeechError::Engine("TTS API not available (API key missing)".to_string()));
        }

        Self::with_engine(config, Arc::new(engine))
    }

    /// Create a synthesizer around an already constructed engine
    pub fn with_engine(config: SpeechConfig, engine: Arc<dyn TtsEngine>) -> Result<Self, SpeechError> {
        config.validate().map_err(SpeechError::Config)?;

        let queue_semaphore = Arc::new(Semaphore::new(config.queue_size));
        let cache = SynthesisCache::new(config.max_cache_size_mb);
        info!(engine = engine.name(), "Speech synthesizer initialized");

        Ok(Self {
            config: Arc::new(config),
            engine,
            cache,
            queue_semaphore,
        })
    }

    /// Synthesize `text` with the given speaker handle.
    ///
    /// Whispers get a very low pitch, everything else is sped up.
    pub async fn synthesize(&self, speaker: &str, text: &str, is_whisper: bool) -> Result<Bytes, SpeechError> {
        let ssml = text::prepare(text, is_whisper)?;
        let cache_key = SynthesisCache::key(speaker, &ssml);

        if self.config.enable_cache {
            if let Some(audio) = self.cache.get(&cache_key) {
                debug!(speaker, "Cache hit");
                return Ok(audio);
            }
        }

        let audio = {
            let _permit = self
                .queue_semaphore
                .acquire()
                .await
                .map_err(|e| SpeechError::Synthesizer(format!("Failed to acquire queue permit: {}", e)))?;

            let timeout = self.config.synthesis_timeout();
            tokio::time::timeout(timeout, self.engine.synthesize(speaker, &ssml))
                .await
                .map_err(|_| SpeechError::Timeout(self.config.synthesis_timeout_ms))??
        };

        if audio.is_empty() {
            return Err(SpeechError::Synthesizer("Engine returned empty audio".to_string()));
        }

        if audio.len() > MAX_AUDIO_SIZE {
            return Err(SpeechError::Synthesizer(format!(
                "Generated audio too large ({} bytes, max {} bytes)",
                audio.len(),
                MAX_AUDIO_SIZE
            )));
        }

        if self.config.enable_cache {
            self.cache.insert(cache_key, audio.clone());
        }
        Ok(audio)
    }

    /// Drop every cached result; used on round restart
    pub fn reset_cache(&self) {
        let dropped = self.cache.len();
        self.cache.clear();
        info!(dropped, "Synthesis cache reset");
    }

    pub fn cache(&self) -> &SynthesisCache {
        &self.cache
    }

    pub fn config(&self) -> &SpeechConfig {
        &self.config
    }

    /// Number of engine calls currently holding a queue slot
    pub fn queue_usage(&self) -> usize {
        let available = self.queue_semaphore.available_permits();
        self.config.queue_size.saturating_sub(available)
    }

    pub fn queue_capacity(&self) -> usize {
        self.config.queue_size
    }

    pub fn is_queue_full(&self) -> bool {
        self.queue_semaphore.available_permits() == 0
    }
}
