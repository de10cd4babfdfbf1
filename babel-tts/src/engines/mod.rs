//! TTS engine implementations

pub mod api;
pub mod custom;

use crate::error::SpeechError;
use async_trait::async_trait;
use bytes::Bytes;

/// Trait for TTS engines
#[async_trait]
pub trait TtsEngine: Send + Sync {
    /// Render SSML-marked text with the given speaker handle
    async fn synthesize(&self, speaker: &str, ssml: &str) -> Result<Bytes, SpeechError>;

    /// Check if engine is available
    fn is_available(&self) -> bool;

    /// Get engine name
    fn name(&self) -> &str;
}
