//! Comprehension-gated dispatch.
//!
//! Every utterance is synthesized twice: once as spoken and once garbled
//! through the language lexicon. Each candidate listener then gets exactly
//! one of the two renderings (or nothing, for out-of-range whispers).
//! If either rendering fails nobody hears anything, so the true audio can
//! never reach a listener that was meant to get the garbled one.

use crate::comprehension::LanguageRegistry;
use crate::config::SpeechConfig;
use crate::dispatch::{AudioSink, DispatchDecision, PlayTts};
use crate::error::SpeechError;
use crate::lexicon::LexiconObfuscator;
use crate::listeners::{Listener, ListenerDirectory};
use crate::proximity;
use crate::rate_limiter::PreviewRateLimiter;
use crate::synthesizer::SpeechSynthesizer;
use babel_core::{ActorId, ChannelKind, ContentCatalog, LanguageId, Position, SessionId, VoiceId};
use bytes::Bytes;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Where an utterance goes
#[derive(Debug, Clone, PartialEq)]
pub enum Channel {
    Say,
    DirectSay { target: ActorId },
    Radio { receivers: Vec<ActorId> },
    Announce,
    Whisper,
}

impl Channel {
    pub fn kind(&self) -> ChannelKind {
        match self {
            Channel::Say => ChannelKind::Say,
            Channel::DirectSay { .. } => ChannelKind::DirectSay,
            Channel::Radio { .. } => ChannelKind::Radio,
            Channel::Announce => ChannelKind::Announce,
            Channel::Whisper => ChannelKind::Whisper,
        }
    }
}

/// One spoken or transmitted line
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub speaker: Option<ActorId>,
    pub voice: VoiceId,
    pub message: String,
    pub language: LanguageId,
    pub channel: Channel,
    /// Source position; whispers fall back to the speaker's tracked position
    pub origin: Option<Position>,
}

impl Utterance {
    pub fn new(
        speaker: Option<ActorId>,
        voice: impl Into<VoiceId>,
        message: impl Into<String>,
        language: impl Into<LanguageId>,
        channel: Channel,
    ) -> Self {
        Self {
            speaker,
            voice: voice.into(),
            message: message.into(),
            language: language.into(),
            channel,
            origin: None,
        }
    }

    pub fn say(speaker: ActorId, voice: impl Into<VoiceId>, message: impl Into<String>, language: impl Into<LanguageId>) -> Self {
        Self::new(Some(speaker), voice, message, language, Channel::Say)
    }

    pub fn whisper(speaker: ActorId, voice: impl Into<VoiceId>, message: impl Into<String>, language: impl Into<LanguageId>) -> Self {
        Self::new(Some(speaker), voice, message, language, Channel::Whisper)
    }

    pub fn announce(voice: impl Into<VoiceId>, message: impl Into<String>, language: impl Into<LanguageId>) -> Self {
        Self::new(None, voice, message, language, Channel::Announce)
    }

    pub fn with_origin(mut self, origin: Position) -> Self {
        self.origin = Some(origin);
        self
    }
}

/// Per-utterance delivery counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub true_sent: usize,
    pub obfuscated_sent: usize,
    pub suppressed: usize,
    /// Listeners that went away before their audio could be sent
    pub skipped: usize,
}

impl DispatchReport {
    pub fn delivered(&self) -> usize {
        self.true_sent + self.obfuscated_sent
    }
}

/// Replaces a speaker's voice before it is resolved (masks, voice changers)
pub type VoiceTransform = dyn Fn(ActorId, &VoiceId) -> VoiceId + Send + Sync;

/// Result of a preview request that passed validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewOutcome {
    Delivered,
    RateLimited,
}

pub struct ComprehensionRouter {
    config: Arc<SpeechConfig>,
    enabled: AtomicBool,
    catalog: Arc<ContentCatalog>,
    synthesizer: Arc<SpeechSynthesizer>,
    registry: Arc<LanguageRegistry>,
    directory: Arc<dyn ListenerDirectory>,
    sink: Arc<dyn AudioSink>,
    obfuscator: LexiconObfuscator,
    preview_limiter: PreviewRateLimiter,
    preview_rng: Mutex<StdRng>,
    voice_transform: Option<Arc<VoiceTransform>>,
}

impl ComprehensionRouter {
    pub fn new(
        synthesizer: Arc<SpeechSynthesizer>,
        catalog: Arc<ContentCatalog>,
        registry: Arc<LanguageRegistry>,
        directory: Arc<dyn ListenerDirectory>,
        sink: Arc<dyn AudioSink>,
    ) -> Self {
        let config = Arc::new(synthesizer.config().clone());
        let preview_limiter = PreviewRateLimiter::new(
            config.preview.max_requests,
            Duration::from_millis(config.preview.period_ms),
        );

        Self {
            enabled: AtomicBool::new(config.enabled),
            config,
            catalog,
            synthesizer,
            registry,
            directory,
            sink,
            obfuscator: LexiconObfuscator::new(),
            preview_limiter,
            preview_rng: Mutex::new(StdRng::from_entropy()),
            voice_transform: None,
        }
    }

    /// Seed every random choice the router makes
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.obfuscator = LexiconObfuscator::seeded(seed);
        self.preview_rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    /// Let gameplay override the voice a speaker talks in
    pub fn with_voice_transform<F>(mut self, transform: F) -> Self
    where
        F: Fn(ActorId, &VoiceId) -> VoiceId + Send + Sync + 'static,
    {
        self.voice_transform = Some(Arc::new(transform));
        self
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
        info!(enabled, "Speech dispatch toggled");
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    pub fn registry(&self) -> &Arc<LanguageRegistry> {
        &self.registry
    }

    pub fn synthesizer(&self) -> &Arc<SpeechSynthesizer> {
        &self.synthesizer
    }

    /// Round restart: forget every synthesized phrase
    pub fn reset_cache(&self) {
        self.synthesizer.reset_cache();
    }

    /// Synthesize `utterance` and send each candidate listener its variant.
    ///
    /// Announcements wait out the configured delay first.
    pub async fn handle_utterance(&self, utterance: Utterance) -> Result<DispatchReport, SpeechError> {
        let delay = utterance.channel == Channel::Announce;
        self.log_failure(&utterance, self.run(&utterance, delay).await)
    }

    /// Like [`handle_utterance`](Self::handle_utterance) but never waits;
    /// used once an announcement's delay has already been served elsewhere.
    pub async fn handle_utterance_now(&self, utterance: Utterance) -> Result<DispatchReport, SpeechError> {
        self.log_failure(&utterance, self.run(&utterance, false).await)
    }

    /// Checks run before any waiting or synthesis
    pub fn validate_utterance(&self, utterance: &Utterance) -> Result<(), SpeechError> {
        let result = self.validate(utterance).and_then(|_| match utterance.channel {
            Channel::Whisper => self.whisper_origin(utterance).map(|_| ()),
            _ => Ok(()),
        });
        self.log_failure(utterance, result)
    }

    pub fn announce_delay(&self) -> Duration {
        self.config.announce_delay()
    }

    fn log_failure<T>(&self, utterance: &Utterance, result: Result<T, SpeechError>) -> Result<T, SpeechError> {
        if let Err(e) = &result {
            warn!(
                channel = %utterance.channel.kind(),
                language = %utterance.language,
                voice = %utterance.voice,
                "Utterance dropped: {}", e
            );
        }
        result
    }

    async fn run(&self, utterance: &Utterance, delay: bool) -> Result<DispatchReport, SpeechError> {
        let speaker = self.validate(utterance)?;
        let whisper_origin = match utterance.channel {
            Channel::Whisper => Some(self.whisper_origin(utterance)?),
            _ => None,
        };

        if delay {
            tokio::time::sleep(self.config.announce_delay()).await;
        }

        let language = self.catalog.language(&utterance.language);
        let garbled = self.obfuscator.obfuscate(&utterance.message, language);

        let is_whisper = whisper_origin.is_some();
        let (true_audio, garbled_audio) = tokio::join!(
            self.synthesizer.synthesize(&speaker, &utterance.message, is_whisper),
            self.synthesizer.synthesize(&speaker, &garbled, is_whisper),
        );
        let true_audio = true_audio?;
        let garbled_audio = garbled_audio?;

        let candidates = self.candidates(utterance, whisper_origin);
        Ok(self.dispatch(utterance, whisper_origin, candidates, true_audio, garbled_audio))
    }

    /// Resolve the speaker handle and enforce message limits
    fn validate(&self, utterance: &Utterance) -> Result<String, SpeechError> {
        if !self.is_enabled() {
            return Err(SpeechError::Disabled);
        }

        let voice_id = match (utterance.speaker, &self.voice_transform) {
            (Some(speaker), Some(transform)) => {
                let voice_id = transform(speaker, &utterance.voice);
                if voice_id != utterance.voice {
                    debug!(%speaker, from = %utterance.voice, to = %voice_id, "Voice overridden");
                }
                voice_id
            }
            _ => utterance.voice.clone(),
        };
        let voice = self
            .catalog
            .voice(&voice_id)
            .ok_or_else(|| SpeechError::UnknownVoice(voice_id.to_string()))?;

        if self.catalog.language(&utterance.language).is_none() {
            return Err(SpeechError::UnknownLanguage(utterance.language.to_string()));
        }

        let max = match utterance.channel {
            Channel::Announce => self.config.chat.max_announcement_length,
            _ => self.config.chat.max_message_chars,
        };
        let len = utterance.message.chars().count();
        if len > max {
            return Err(SpeechError::MessageTooLong { len, max });
        }

        Ok(voice.speaker.clone())
    }

    fn whisper_origin(&self, utterance: &Utterance) -> Result<Position, SpeechError> {
        utterance
            .origin
            .or_else(|| utterance.speaker.and_then(|s| self.directory.position_of(s)))
            .ok_or_else(|| {
                let who = utterance
                    .speaker
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "unknown speaker".to_string());
                SpeechError::MissingOrigin(who)
            })
    }

    fn candidates(&self, utterance: &Utterance, whisper_origin: Option<Position>) -> Vec<Listener> {
        match &utterance.channel {
            Channel::Say | Channel::Announce => self.directory.all(),
            Channel::DirectSay { target } => self.directory.sessions_of(*target),
            Channel::Radio { receivers } => {
                let mut seen = HashSet::new();
                receivers
                    .iter()
                    .flat_map(|receiver| self.directory.sessions_of(*receiver))
                    .filter(|listener| seen.insert(listener.session))
                    .collect()
            }
            Channel::Whisper => match whisper_origin {
                Some(origin) => self.directory.within(origin, self.config.pvs_range),
                None => Vec::new(),
            },
        }
    }

    /// Pick the variant for one listener
    pub fn decide(&self, listener: &Listener, language: &LanguageId, whisper_origin: Option<Position>) -> DispatchDecision {
        if let Some(origin) = whisper_origin {
            let audible = listener
                .position
                .map(|p| proximity::in_range(origin, p, self.config.whisper_range))
                .unwrap_or(false);
            if !audible {
                return DispatchDecision::Suppress;
            }
        }

        if self.registry.knows(listener, language) {
            DispatchDecision::SendTrue
        } else {
            DispatchDecision::SendObfuscated
        }
    }

    fn dispatch(
        &self,
        utterance: &Utterance,
        whisper_origin: Option<Position>,
        candidates: Vec<Listener>,
        true_audio: Bytes,
        garbled_audio: Bytes,
    ) -> DispatchReport {
        let origin = match utterance.channel {
            Channel::Announce => None,
            _ => utterance.speaker,
        };
        let mut report = DispatchReport::default();

        for listener in candidates {
            let decision = self.decide(&listener, &utterance.language, whisper_origin);
            let audio = match decision {
                DispatchDecision::SendTrue => &true_audio,
                DispatchDecision::SendObfuscated => &garbled_audio,
                DispatchDecision::Suppress => {
                    report.suppressed += 1;
                    continue;
                }
            };

            if !self.directory.is_connected(listener.session) {
                debug!(session = %listener.session, "Listener left before dispatch");
                report.skipped += 1;
                continue;
            }

            let event = PlayTts {
                audio: audio.clone(),
                origin,
                language: Some(utterance.language.clone()),
            };
            match self.sink.deliver(listener.session, event) {
                Ok(()) => match decision {
                    DispatchDecision::SendTrue => report.true_sent += 1,
                    _ => report.obfuscated_sent += 1,
                },
                Err(e) => {
                    warn!(session = %listener.session, "Failed to deliver speech: {}", e);
                    report.skipped += 1;
                }
            }
        }

        debug!(
            channel = %utterance.channel.kind(),
            true_sent = report.true_sent,
            obfuscated_sent = report.obfuscated_sent,
            suppressed = report.suppressed,
            skipped = report.skipped,
            "Utterance dispatched"
        );
        report
    }

    /// Render a random sample sentence in `voice` for the requesting session only
    pub async fn handle_preview(&self, session: SessionId, voice: &VoiceId) -> Result<PreviewOutcome, SpeechError> {
        if !self.is_enabled() {
            return Err(SpeechError::Disabled);
        }

        let speaker = self
            .catalog
            .voice(voice)
            .map(|v| v.speaker.clone())
            .ok_or_else(|| SpeechError::UnknownVoice(voice.to_string()))?;

        if !self.preview_limiter.allow(session) {
            debug!(%session, "Preview request rate limited");
            return Ok(PreviewOutcome::RateLimited);
        }

        let sample = {
            let samples: Vec<&String> = self
                .config
                .preview
                .samples
                .iter()
                .filter(|s| !s.trim().is_empty())
                .collect();
            let mut rng = self.preview_rng.lock();
            samples
                .choose(&mut *rng)
                .map(|s| s.to_string())
                .ok_or_else(|| SpeechError::Config("No preview samples configured".to_string()))?
        };

        let audio = self.synthesizer.synthesize(&speaker, &sample, false).await?;
        let event = PlayTts {
            audio,
            origin: None,
            language: None,
        };
        self.sink.deliver(session, event)?;
        Ok(PreviewOutcome::Delivered)
    }

    /// Session went away
    pub fn forget_session(&self, session: SessionId) {
        self.preview_limiter.forget(session);
    }
}
