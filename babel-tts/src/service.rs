//! Queue-driven front end for the router
//!
//! Chat, radio and announcement systems push [`TtsCommand`]s into a bounded
//! channel. A single processing task drains it and runs each utterance as a
//! tracked task, with at most `queue_size` utterances in flight.
//! Announcements serve their delay outside that budget and join the line
//! once it has passed.

use crate::error::SpeechError;
use crate::router::{Channel, ComprehensionRouter, DispatchReport, PreviewOutcome, Utterance};
use babel_core::{SessionId, VoiceId};
use parking_lot::RwLock;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, warn};

/// Messages accepted by the service
#[derive(Debug, Clone)]
pub enum TtsCommand {
    Utterance(Utterance),
    Preview { session: SessionId, voice: VoiceId },
    /// Round/world restart
    RoundRestart,
    /// Session closed; drop its per-session state
    Disconnected(SessionId),
}

/// Counters collected by the processing task
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServiceStats {
    pub utterances_dispatched: usize,
    pub utterances_dropped: usize,
    pub previews_delivered: usize,
    pub previews_rate_limited: usize,
    pub previews_failed: usize,
    pub cache_resets: usize,
    pub panicked: usize,
}

enum TaskOutcome {
    Dispatched(DispatchReport),
    Preview(PreviewOutcome),
    UtteranceFailed(SpeechError),
    PreviewFailed(SpeechError),
}

pub struct TtsService {
    router: Arc<ComprehensionRouter>,
    capacity: usize,
    sender: Arc<RwLock<Option<mpsc::Sender<TtsCommand>>>>,
    is_running: Arc<RwLock<bool>>,
    processing_handle: Arc<RwLock<Option<JoinHandle<ServiceStats>>>>,
}

impl TtsService {
    pub fn new(router: Arc<ComprehensionRouter>) -> Self {
        let capacity = router.synthesizer().config().queue_size;
        Self {
            router,
            capacity,
            sender: Arc::new(RwLock::new(None)),
            is_running: Arc::new(RwLock::new(false)),
            processing_handle: Arc::new(RwLock::new(None)),
        }
    }

    pub fn start(&self) -> Result<(), SpeechError> {
        {
            let mut is_running = self.is_running.write();
            if *is_running {
                return Err(SpeechError::Synthesizer("TTS service already running".to_string()));
            }
            *is_running = true;
        }

        let (sender, receiver) = mpsc::channel(self.capacity * 4);
        *self.sender.write() = Some(sender);

        let router = Arc::clone(&self.router);
        let handle = tokio::spawn(process(router, receiver, self.capacity));
        *self.processing_handle.write() = Some(handle);

        info!(capacity = self.capacity, "TTS service started");
        Ok(())
    }

    /// Stop accepting commands, let in-flight work finish and return the counters
    pub async fn stop(&self) -> Option<ServiceStats> {
        {
            let mut is_running = self.is_running.write();
            if !*is_running {
                return None;
            }
            *is_running = false;
        }

        // Closing the channel ends the processing loop once it drains
        self.sender.write().take();

        let handle = self.processing_handle.write().take()?;
        let abort = handle.abort_handle();
        match tokio::time::timeout(Duration::from_secs(30), handle).await {
            Ok(Ok(stats)) => {
                info!(?stats, "TTS service stopped");
                Some(stats)
            }
            Ok(Err(e)) => {
                error!("TTS processing task failed: {}", e);
                None
            }
            Err(_) => {
                warn!("TTS service did not drain in time, aborting");
                abort.abort();
                None
            }
        }
    }

    pub fn is_running(&self) -> bool {
        *self.is_running.read()
    }

    /// A handle producers can clone and keep
    pub fn sender(&self) -> Option<mpsc::Sender<TtsCommand>> {
        self.sender.read().clone()
    }

    /// Queue a command, waiting for room if the queue is full
    pub async fn submit(&self, command: TtsCommand) -> Result<(), SpeechError> {
        let sender = self
            .sender()
            .ok_or_else(|| SpeechError::Synthesizer("TTS service not running".to_string()))?;
        sender
            .send(command)
            .await
            .map_err(|_| SpeechError::Synthesizer("TTS service queue closed".to_string()))
    }
}

async fn process(
    router: Arc<ComprehensionRouter>,
    mut receiver: mpsc::Receiver<TtsCommand>,
    max_in_flight: usize,
) -> ServiceStats {
    let mut tasks: JoinSet<TaskOutcome> = JoinSet::new();
    // Announcements waiting out their delay, then ready to run
    let mut delayed: JoinSet<Utterance> = JoinSet::new();
    let mut due: VecDeque<Utterance> = VecDeque::new();
    let announce_delay = router.announce_delay();
    let mut stats = ServiceStats::default();

    loop {
        while tasks.len() < max_in_flight {
            let Some(utterance) = due.pop_front() else { break };
            spawn_utterance(&mut tasks, &router, utterance, true);
        }

        tokio::select! {
            command = receiver.recv(), if tasks.len() < max_in_flight => {
                let Some(command) = command else { break };
                match command {
                    TtsCommand::Utterance(utterance) if utterance.channel == Channel::Announce => {
                        // Invalid announcements fail now rather than after the delay
                        if router.validate_utterance(&utterance).is_ok() {
                            delayed.spawn(async move {
                                tokio::time::sleep(announce_delay).await;
                                utterance
                            });
                        } else {
                            stats.utterances_dropped += 1;
                        }
                    }
                    TtsCommand::Utterance(utterance) => {
                        spawn_utterance(&mut tasks, &router, utterance, false);
                    }
                    TtsCommand::Preview { session, voice } => {
                        let router = Arc::clone(&router);
                        tasks.spawn(async move {
                            match router.handle_preview(session, &voice).await {
                                Ok(outcome) => TaskOutcome::Preview(outcome),
                                Err(e) => TaskOutcome::PreviewFailed(e),
                            }
                        });
                    }
                    TtsCommand::RoundRestart => {
                        router.reset_cache();
                        stats.cache_resets += 1;
                    }
                    TtsCommand::Disconnected(session) => router.forget_session(session),
                }
            }
            Some(joined) = delayed.join_next(), if !delayed.is_empty() => {
                match joined {
                    Ok(utterance) => due.push_back(utterance),
                    Err(e) => {
                        error!("Announcement delay task panicked: {}", e);
                        stats.panicked += 1;
                    }
                }
            }
            Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                record(&mut stats, joined);
            }
        }
    }

    // Queue closed: let pending announcements play before finishing
    while let Some(joined) = delayed.join_next().await {
        match joined {
            Ok(utterance) => due.push_back(utterance),
            Err(e) => {
                error!("Announcement delay task panicked: {}", e);
                stats.panicked += 1;
            }
        }
    }
    loop {
        while tasks.len() < max_in_flight {
            let Some(utterance) = due.pop_front() else { break };
            spawn_utterance(&mut tasks, &router, utterance, true);
        }
        let Some(joined) = tasks.join_next().await else { break };
        record(&mut stats, joined);
    }
    stats
}

fn spawn_utterance(
    tasks: &mut JoinSet<TaskOutcome>,
    router: &Arc<ComprehensionRouter>,
    utterance: Utterance,
    delay_served: bool,
) {
    let router = Arc::clone(router);
    tasks.spawn(async move {
        let result = if delay_served {
            router.handle_utterance_now(utterance).await
        } else {
            router.handle_utterance(utterance).await
        };
        match result {
            Ok(report) => TaskOutcome::Dispatched(report),
            Err(e) => TaskOutcome::UtteranceFailed(e),
        }
    });
}

fn record(stats: &mut ServiceStats, joined: Result<TaskOutcome, tokio::task::JoinError>) {
    match joined {
        Ok(TaskOutcome::Dispatched(report)) => {
            debug!(delivered = report.delivered(), "Utterance task finished");
            stats.utterances_dispatched += 1;
        }
        Ok(TaskOutcome::UtteranceFailed(e)) => {
            debug!("Utterance task failed: {}", e);
            stats.utterances_dropped += 1;
        }
        Ok(TaskOutcome::Preview(PreviewOutcome::Delivered)) => stats.previews_delivered += 1,
        Ok(TaskOutcome::Preview(PreviewOutcome::RateLimited)) => stats.previews_rate_limited += 1,
        Ok(TaskOutcome::PreviewFailed(e)) => {
            debug!("Preview dropped: {}", e);
            stats.previews_failed += 1;
        }
        Err(e) => {
            error!("Speech task panicked: {}", e);
            stats.panicked += 1;
        }
    }
}
