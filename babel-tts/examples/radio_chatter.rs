// Radio chatter demo: two crews, one shared frequency, one language each.
//
// Runs a TtsService with an engine that just echoes the SSML back, so the
// printed "audio" shows which listener heard which rendering.

use babel_core::{ActorId, ContentCatalog, LanguageId, Position, SessionId};
use babel_tts::engines::custom::CustomTtsEngine;
use babel_tts::{
    Channel, ChannelSink, ComprehensionRouter, InMemoryDirectory, LanguageRegistry, SpeechConfig,
    SpeechSynthesizer, TtsCommand, TtsService, Utterance,
};
use bytes::Bytes;
use std::sync::Arc;
use tracing::info;

const CONTENT: &str = r#"
- type: language
  id: Galactic
  name: Galactic Common
  lexicon: [ba, ko, ri, zu]
- type: language
  id: Moffic
  name: Moffic
  lexicon: [bzz, zzt, flrp]
- type: ttsVoice
  id: Captain
  speaker: captain
"#;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_target(false)
        .init();

    let config = SpeechConfig {
        enabled: true,
        announce_delay_ms: 500,
        ..SpeechConfig::from_env()
    };

    let engine = CustomTtsEngine::new(
        "echo",
        |speaker: &str, ssml: &str| Ok(Bytes::from(format!("[{}] {}", speaker, ssml))),
        || true,
    );
    let synthesizer = Arc::new(SpeechSynthesizer::with_engine(config, Arc::new(engine))?);
    let catalog = Arc::new(ContentCatalog::from_yaml_str(CONTENT)?);

    let directory = Arc::new(InMemoryDirectory::new());
    let registry = Arc::new(LanguageRegistry::new());
    let mut names = Vec::new();
    for (id, name, language, x) in [
        (1, "captain", "Galactic", 0.0),
        (2, "engineer", "Galactic", 40.0),
        (3, "moth", "Moffic", 80.0),
    ] {
        let session = SessionId::new();
        let actor = ActorId(id);
        directory.connect(session);
        directory.set_position(actor, Position::new(x, 0.0));
        directory.attach(session, Some(actor));
        registry.set_languages(actor, [LanguageId::from(language)]);
        names.push((session, name));
    }

    let (sink, mut deliveries) = ChannelSink::new();
    let router = Arc::new(ComprehensionRouter::new(
        synthesizer,
        catalog,
        registry,
        directory,
        Arc::new(sink),
    ));

    let printer = tokio::spawn(async move {
        while let Some((session, event)) = deliveries.recv().await {
            let who = names
                .iter()
                .find(|(s, _)| *s == session)
                .map(|(_, n)| *n)
                .unwrap_or("?");
            println!("{:>9} <- {}", who, String::from_utf8_lossy(&event.audio));
        }
    });

    let service = TtsService::new(Arc::clone(&router));
    service.start()?;

    let receivers = vec![ActorId(2), ActorId(3)];
    service
        .submit(TtsCommand::Utterance(Utterance::new(
            Some(ActorId(1)),
            "Captain",
            "All hands, report to the bridge",
            "Galactic",
            Channel::Radio { receivers },
        )))
        .await?;
    service
        .submit(TtsCommand::Utterance(Utterance::announce(
            "Captain",
            "The shuttle departs in five minutes",
            "Galactic",
        )))
        .await?;

    let stats = service.stop().await;
    info!(?stats, "Demo finished");

    // Dropping the router closes the delivery channel
    drop(service);
    drop(router);
    printer.await?;
    Ok(())
}
