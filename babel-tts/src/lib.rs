//! babel-tts: comprehension-gated speech synthesis
//!
//! Provides:
//! - Dual-variant synthesis (true and lexicon-garbled) with result caching
//! - Per-listener dispatch for say, direct, radio, announcement and whisper channels
//! - Whisper range filtering
//! - Rate-limited voice previews
//! - Configurable and off by default

pub mod error;
pub mod config;
pub mod engines;
pub mod text;
pub mod synthesizer;
pub mod lexicon;
pub mod comprehension;
pub mod proximity;
pub mod listeners;
pub mod dispatch;
pub mod rate_limiter;
pub mod router;
pub mod service;

pub use error::SpeechError;
pub use config::{SpeechConfig, ApiTtsConfig, ChatLimits, PreviewConfig};
pub use engines::TtsEngine;
pub use synthesizer::{SpeechSynthesizer, SynthesisCache};
pub use lexicon::LexiconObfuscator;
pub use comprehension::LanguageRegistry;
pub use listeners::{Listener, ListenerDirectory, InMemoryDirectory};
pub use dispatch::{AudioSink, ChannelSink, DispatchDecision, PlayTts};
pub use rate_limiter::PreviewRateLimiter;
pub use router::{Channel, ComprehensionRouter, DispatchReport, PreviewOutcome, Utterance, VoiceTransform};
pub use service::{ServiceStats, TtsCommand, TtsService};
