//! Tests for TtsService and voice previews

mod common;

use babel_core::{ActorId, SessionId, VoiceId};
use babel_tts::{PreviewOutcome, ServiceStats, SpeechError, TtsCommand, TtsService, Utterance};
use common::{Fixture, VOICE};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_service_lifecycle() {
    let fx = Fixture::new();
    let service = TtsService::new(Arc::clone(&fx.router));

    assert!(!service.is_running());
    assert!(service.submit(TtsCommand::RoundRestart).await.is_err());
    assert!(service.stop().await.is_none());

    service.start().unwrap();
    assert!(service.is_running());
    assert!(matches!(service.start(), Err(SpeechError::Synthesizer(_))));

    let stats = service.stop().await.unwrap();
    assert_eq!(stats, ServiceStats::default());
    assert!(!service.is_running());
}

#[tokio::test]
async fn test_service_dispatches_queued_utterances() {
    let fx = Fixture::new();
    let listener = fx.join(1, (0.0, 0.0), &["Galactic"]);
    let service = TtsService::new(Arc::clone(&fx.router));
    service.start().unwrap();

    for i in 0..5 {
        let utterance = Utterance::say(ActorId(1), VOICE, format!("status report {}", i), "Galactic");
        service.submit(TtsCommand::Utterance(utterance)).await.unwrap();
    }
    // No position for actor 9, so this whisper is dropped
    service
        .submit(TtsCommand::Utterance(Utterance::whisper(ActorId(9), VOICE, "psst", "Galactic")))
        .await
        .unwrap();

    let stats = service.stop().await.unwrap();
    assert_eq!(stats.utterances_dispatched, 5);
    assert_eq!(stats.utterances_dropped, 1);
    assert_eq!(fx.sink.for_session(listener).len(), 5);
}

#[tokio::test]
async fn test_producers_can_hold_a_sender() {
    let fx = Fixture::new();
    fx.join(1, (0.0, 0.0), &["Galactic"]);
    let service = TtsService::new(Arc::clone(&fx.router));
    service.start().unwrap();

    let sender = service.sender().unwrap();
    let producer = tokio::spawn(async move {
        for _ in 0..3 {
            let utterance = Utterance::announce(VOICE, "Shuttle docked", "Galactic");
            sender.send(TtsCommand::Utterance(utterance)).await.unwrap();
        }
    });
    producer.await.unwrap();

    let stats = service.stop().await.unwrap();
    assert_eq!(stats.utterances_dispatched, 3);
    assert_eq!(fx.sink.len(), 3);
}

#[tokio::test]
async fn test_round_restart_clears_cache() {
    let fx = Fixture::new();
    fx.join(1, (0.0, 0.0), &["Galactic"]);
    fx.router
        .handle_utterance(Utterance::say(ActorId(1), VOICE, "Hello world", "Galactic"))
        .await
        .unwrap();
    assert!(!fx.router.synthesizer().cache().is_empty());

    let service = TtsService::new(Arc::clone(&fx.router));
    service.start().unwrap();
    service.submit(TtsCommand::RoundRestart).await.unwrap();
    let stats = service.stop().await.unwrap();

    assert_eq!(stats.cache_resets, 1);
    assert!(fx.router.synthesizer().cache().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_service_rate_limits_previews() {
    let fx = Fixture::new();
    let requester = SessionId::new();
    let bystander = fx.join(2, (0.0, 0.0), &["Galactic"]);
    fx.directory.connect(requester);

    let service = TtsService::new(Arc::clone(&fx.router));
    service.start().unwrap();
    for _ in 0..5 {
        service
            .submit(TtsCommand::Preview {
                session: requester,
                voice: VoiceId::from(VOICE),
            })
            .await
            .unwrap();
    }
    service
        .submit(TtsCommand::Preview {
            session: requester,
            voice: VoiceId::from("Nobody"),
        })
        .await
        .unwrap();
    let stats = service.stop().await.unwrap();

    assert_eq!(stats.previews_delivered, 3);
    assert_eq!(stats.previews_rate_limited, 2);
    assert_eq!(stats.previews_failed, 1);

    let received = fx.sink.for_session(requester);
    assert_eq!(received.len(), 3);
    for event in &received {
        assert_eq!(event.origin, None);
        assert_eq!(event.language, None);
    }
    assert!(fx.sink.for_session(bystander).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_preview_window_slides() {
    let fx = Fixture::new();
    let session = SessionId::new();
    let voice = VoiceId::from(VOICE);

    for _ in 0..3 {
        assert_eq!(fx.router.handle_preview(session, &voice).await.unwrap(), PreviewOutcome::Delivered);
    }
    assert_eq!(fx.router.handle_preview(session, &voice).await.unwrap(), PreviewOutcome::RateLimited);

    // Limits are per session
    let other = SessionId::new();
    assert_eq!(fx.router.handle_preview(other, &voice).await.unwrap(), PreviewOutcome::Delivered);

    tokio::time::advance(Duration::from_millis(2_001)).await;
    assert_eq!(fx.router.handle_preview(session, &voice).await.unwrap(), PreviewOutcome::Delivered);
}

#[tokio::test(start_paused = true)]
async fn test_forgotten_session_starts_fresh() {
    let fx = Fixture::new();
    let session = SessionId::new();
    let voice = VoiceId::from(VOICE);

    for _ in 0..3 {
        fx.router.handle_preview(session, &voice).await.unwrap();
    }
    assert_eq!(fx.router.handle_preview(session, &voice).await.unwrap(), PreviewOutcome::RateLimited);

    fx.router.forget_session(session);
    assert_eq!(fx.router.handle_preview(session, &voice).await.unwrap(), PreviewOutcome::Delivered);
}

#[tokio::test]
async fn test_preview_uses_sample_sentences() {
    let mut config = common::config();
    config.preview.samples = vec!["Only line".to_string(), "   ".to_string()];
    let fx = Fixture::with_config(config);
    let session = SessionId::new();

    fx.router.handle_preview(session, &VoiceId::from(VOICE)).await.unwrap();

    let received = fx.sink.for_session(session);
    assert_eq!(
        common::text_of(&received[0]),
        format!("{}|{}", common::SPEAKER, r#"<speak><prosody rate="fast">Only line.</prosody></speak>"#)
    );
}

#[tokio::test]
async fn test_preview_rejected_when_disabled_or_unknown() {
    let fx = Fixture::new();
    let session = SessionId::new();

    let result = fx.router.handle_preview(session, &VoiceId::from("Nobody")).await;
    assert!(matches!(result, Err(SpeechError::UnknownVoice(_))));

    fx.router.set_enabled(false);
    let result = fx.router.handle_preview(session, &VoiceId::from(VOICE)).await;
    assert!(matches!(result, Err(SpeechError::Disabled)));
    assert_eq!(fx.engine_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_pending_announcements_do_not_hold_up_speech() {
    let mut config = common::config();
    config.queue_size = 2;
    config.announce_delay_ms = 6_000;
    let fx = Fixture::with_config(config);
    let listener = fx.join(1, (0.0, 0.0), &["Galactic"]);

    let service = TtsService::new(Arc::clone(&fx.router));
    service.start().unwrap();
    for line in ["Shuttle inbound", "Shuttle docked"] {
        service
            .submit(TtsCommand::Utterance(Utterance::announce(VOICE, line, "Galactic")))
            .await
            .unwrap();
    }
    // Too long for an announcement: rejected without waiting out the delay
    service
        .submit(TtsCommand::Utterance(Utterance::announce(VOICE, "a".repeat(257), "Galactic")))
        .await
        .unwrap();
    service
        .submit(TtsCommand::Utterance(Utterance::say(ActorId(1), VOICE, "Hello world", "Galactic")))
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_secs(1)).await;
    let early = fx.sink.for_session(listener);
    assert_eq!(early.len(), 1);
    assert_eq!(early[0].origin, Some(ActorId(1)));

    tokio::time::sleep(Duration::from_secs(6)).await;
    assert_eq!(fx.sink.for_session(listener).len(), 3);

    let stats = service.stop().await.unwrap();
    assert_eq!(stats.utterances_dispatched, 3);
    assert_eq!(stats.utterances_dropped, 1);
}

#[tokio::test(start_paused = true)]
async fn test_stop_plays_pending_announcements() {
    let mut config = common::config();
    config.announce_delay_ms = 6_000;
    let fx = Fixture::with_config(config);
    fx.join(1, (0.0, 0.0), &["Galactic"]);

    let service = TtsService::new(Arc::clone(&fx.router));
    service.start().unwrap();
    service
        .submit(TtsCommand::Utterance(Utterance::announce(VOICE, "Evacuate", "Galactic")))
        .await
        .unwrap();

    let start = tokio::time::Instant::now();
    let stats = service.stop().await.unwrap();

    assert!(start.elapsed() >= Duration::from_secs(6));
    assert_eq!(stats.utterances_dispatched, 1);
    assert_eq!(fx.sink.len(), 1);
}
