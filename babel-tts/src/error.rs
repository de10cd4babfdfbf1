//! Error types for babel-tts

use babel_core::Error as CoreError;
use thiserror::Error;

/// Speech synthesis and dispatch errors
#[derive(Error, Debug)]
pub enum SpeechError {
    #[error("Speech synthesis is disabled")]
    Disabled,

    #[error("Unknown voice: {0}")]
    UnknownVoice(String),

    #[error("Unknown language: {0}")]
    UnknownLanguage(String),

    #[error("Message too long ({len} chars, max {max})")]
    MessageTooLong { len: usize, max: usize },

    #[error("Whisper from {0} has no origin position")]
    MissingOrigin(String),

    #[error("Text is empty after sanitizing")]
    EmptyText,

    #[error("Synthesis timed out after {0} ms")]
    Timeout(u64),

    #[error("Synthesizer error: {0}")]
    Synthesizer(String),

    #[error("Engine error: {0}")]
    Engine(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Delivery error: {0}")]
    Delivery(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Core error: {0}")]
    Core(#[from] CoreError),
}

impl SpeechError {
    /// Content lookups that failed (unresolvable voice or language)
    pub fn is_configuration_miss(&self) -> bool {
        matches!(self, SpeechError::UnknownVoice(_) | SpeechError::UnknownLanguage(_))
    }

    /// Errors raised by the synthesis stage; the utterance is dropped as a whole
    pub fn is_synthesis_failure(&self) -> bool {
        matches!(
            self,
            SpeechError::EmptyText
                | SpeechError::Timeout(_)
                | SpeechError::Synthesizer(_)
                | SpeechError::Engine(_)
        )
    }
}

