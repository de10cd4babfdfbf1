//! Custom TTS engine implementation
//! Allows embedders (and tests) to plug their own synthesis backend

use crate::engines::TtsEngine;
use crate::error::SpeechError;
use async_trait::async_trait;
use bytes::Bytes;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

type SynthesizeFuture = Pin<Box<dyn Future<Output = Result<Bytes, SpeechError>> + Send>>;
type SynthesizeFn = dyn Fn(String, String) -> SynthesizeFuture + Send + Sync;

/// Custom TTS engine wrapper
pub struct CustomTtsEngine {
    name: String,
    synthesize_fn: Arc<SynthesizeFn>,
    is_available_fn: Arc<dyn Fn() -> bool + Send + Sync>,
}

impl CustomTtsEngine {
    /// Create an engine from a synchronous `(speaker, ssml)` function
    pub fn new<F1, F2>(name: impl Into<String>, synthesize_fn: F1, is_available_fn: F2) -> Self
    where
        F1: Fn(&str, &str) -> Result<Bytes, SpeechError> + Send + Sync + 'static,
        F2: Fn() -> bool + Send + Sync + 'static,
    {
        let synthesize_fn = Arc::new(synthesize_fn);
        Self {
            name: name.into(),
            synthesize_fn: Arc::new(move |speaker: String, ssml: String| -> SynthesizeFuture {
                let result = synthesize_fn(&speaker, &ssml);
                Box::pin(async move { result })
            }),
            is_available_fn: Arc::new(is_available_fn),
        }
    }

    /// Create an engine from an async `(speaker, ssml)` function
    pub fn from_async<F, Fut>(name: impl Into<String>, synthesize_fn: F) -> Self
    where
        F: Fn(String, String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Bytes, SpeechError>> + Send + 'static,
    {
        Self {
            name: name.into(),
            synthesize_fn: Arc::new(move |speaker: String, ssml: String| -> SynthesizeFuture {
                Box::pin(synthesize_fn(speaker, ssml))
            }),
            is_available_fn: Arc::new(|| true),
        }
    }
}

#[async_trait]
impl TtsEngine for CustomTtsEngine {
    async fn synthesize(&self, speaker: &str, ssml: &str) -> Result<Bytes, SpeechError> {
        if ssml.is_empty() {
            return Err(SpeechError::Engine("Text cannot be empty".to_string()));
        }

        (self.synthesize_fn)(speaker.to_string(), ssml.to_string()).await
    }

    fn is_available(&self) -> bool {
        (self.is_available_fn)()
    }

    fn name(&self) -> &str {
        &self.name
    }
}
