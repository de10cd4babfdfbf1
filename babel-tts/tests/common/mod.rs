//! Shared fixtures for babel-tts integration tests
#![allow(dead_code)]

use babel_core::{ActorId, ContentCatalog, Language, Position, SessionId, Voice};
use babel_tts::engines::custom::CustomTtsEngine;
use babel_tts::{
    AudioSink, ComprehensionRouter, InMemoryDirectory, LanguageRegistry, ListenerDirectory, PlayTts,
    SpeechConfig, SpeechError, SpeechSynthesizer,
};
use bytes::Bytes;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub const VOICE: &str = "Narrator";
pub const SPEAKER: &str = "narrator";
pub const ROBOT_VOICE: &str = "Robot";
pub const ROBOT_SPEAKER: &str = "robot";

/// Sink that remembers every delivery
#[derive(Default)]
pub struct RecordingSink {
    deliveries: Mutex<Vec<(SessionId, PlayTts)>>,
}

impl RecordingSink {
    pub fn all(&self) -> Vec<(SessionId, PlayTts)> {
        self.deliveries.lock().clone()
    }

    pub fn for_session(&self, session: SessionId) -> Vec<PlayTts> {
        self.deliveries
            .lock()
            .iter()
            .filter(|(s, _)| *s == session)
            .map(|(_, e)| e.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.deliveries.lock().len()
    }
}

impl AudioSink for RecordingSink {
    fn deliver(&self, session: SessionId, event: PlayTts) -> Result<(), SpeechError> {
        self.deliveries.lock().push((session, event));
        Ok(())
    }
}

/// Decode an echo-engine payload back into the SSML it was made from
pub fn text_of(event: &PlayTts) -> String {
    String::from_utf8_lossy(&event.audio).to_string()
}

pub fn config() -> SpeechConfig {
    let mut config = SpeechConfig::default();
    config.enabled = true;
    config.announce_delay_ms = 0;
    config.whisper_range = 5.0;
    config.pvs_range = 25.0;
    config
}

pub fn catalog() -> ContentCatalog {
    let mut catalog = ContentCatalog::new();
    catalog
        .add_language(Language::new("Galactic", "Galactic Common", vec!["blah".to_string()]))
        .unwrap();
    catalog
        .add_language(Language::new(
            "Sol",
            "Sol Common",
            ["ka", "ro", "mi", "su", "te"].iter().map(|w| w.to_string()).collect(),
        ))
        .unwrap();
    catalog.add_language(Language::new("Mute", "Sign", vec![])).unwrap();
    catalog.add_voice(Voice::new(VOICE, SPEAKER)).unwrap();
    catalog.add_voice(Voice::new(ROBOT_VOICE, ROBOT_SPEAKER)).unwrap();
    catalog
}

/// Engine that answers with `speaker|ssml` and counts its calls
pub fn echo_engine(calls: Arc<AtomicUsize>) -> CustomTtsEngine {
    CustomTtsEngine::new(
        "echo",
        move |speaker: &str, ssml: &str| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(Bytes::from(format!("{}|{}", speaker, ssml)))
        },
        || true,
    )
}

pub struct Fixture {
    pub router: Arc<ComprehensionRouter>,
    pub directory: Arc<InMemoryDirectory>,
    pub registry: Arc<LanguageRegistry>,
    pub sink: Arc<RecordingSink>,
    pub calls: Arc<AtomicUsize>,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_config(config())
    }

    pub fn with_config(config: SpeechConfig) -> Self {
        let calls = Arc::new(AtomicUsize::new(0));
        let engine = Arc::new(echo_engine(Arc::clone(&calls)));
        Self::with_engine(config, engine, calls)
    }

    pub fn with_engine(
        config: SpeechConfig,
        engine: Arc<dyn babel_tts::TtsEngine>,
        calls: Arc<AtomicUsize>,
    ) -> Self {
        let directory = Arc::new(InMemoryDirectory::new());
        Self::with_directory(config, engine, calls, Arc::clone(&directory) as Arc<dyn ListenerDirectory>, directory)
    }

    pub fn with_directory(
        config: SpeechConfig,
        engine: Arc<dyn babel_tts::TtsEngine>,
        calls: Arc<AtomicUsize>,
        lookup: Arc<dyn ListenerDirectory>,
        directory: Arc<InMemoryDirectory>,
    ) -> Self {
        Self::build(config, engine, calls, lookup, directory, |router| router)
    }

    /// Echo-engine fixture with extra router setup applied
    pub fn with_router(setup: impl FnOnce(ComprehensionRouter) -> ComprehensionRouter) -> Self {
        let calls = Arc::new(AtomicUsize::new(0));
        let engine = Arc::new(echo_engine(Arc::clone(&calls)));
        let directory = Arc::new(InMemoryDirectory::new());
        let lookup = Arc::clone(&directory) as Arc<dyn ListenerDirectory>;
        Self::build(config(), engine, calls, lookup, directory, setup)
    }

    fn build(
        config: SpeechConfig,
        engine: Arc<dyn babel_tts::TtsEngine>,
        calls: Arc<AtomicUsize>,
        lookup: Arc<dyn ListenerDirectory>,
        directory: Arc<InMemoryDirectory>,
        setup: impl FnOnce(ComprehensionRouter) -> ComprehensionRouter,
    ) -> Self {
        let synthesizer = Arc::new(SpeechSynthesizer::with_engine(config, engine).unwrap());
        let registry = Arc::new(LanguageRegistry::new());
        let sink = Arc::new(RecordingSink::default());
        let router = ComprehensionRouter::new(
            synthesizer,
            Arc::new(catalog()),
            Arc::clone(&registry),
            lookup,
            Arc::clone(&sink) as Arc<dyn AudioSink>,
        )
        .with_seed(7);

        Self {
            router: Arc::new(setup(router)),
            directory,
            registry,
            sink,
            calls,
        }
    }

    /// Connect a session attached to `actor` at `position` knowing `languages`
    pub fn join(&self, actor: u64, position: (f32, f32), languages: &[&str]) -> SessionId {
        let session = SessionId::new();
        let actor = ActorId(actor);
        self.directory.connect(session);
        self.directory.set_position(actor, Position::new(position.0, position.1));
        self.directory.attach(session, Some(actor));
        self.registry
            .set_languages(actor, languages.iter().map(|l| babel_core::LanguageId::from(*l)));
        session
    }

    pub fn engine_calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}
