//! Outbound audio deliveries

use crate::error::SpeechError;
use babel_core::{ActorId, LanguageId, SessionId};
use bytes::Bytes;
use tokio::sync::mpsc;

/// Audio sent to a single session
#[derive(Debug, Clone, PartialEq)]
pub struct PlayTts {
    pub audio: Bytes,
    /// Actor the sound plays from; `None` for global audio
    pub origin: Option<ActorId>,
    pub language: Option<LanguageId>,
}

/// Which variant a listener gets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchDecision {
    SendTrue,
    SendObfuscated,
    Suppress,
}

/// Network side of the dispatcher. Sends are fire-and-forget.
pub trait AudioSink: Send + Sync {
    fn deliver(&self, session: SessionId, event: PlayTts) -> Result<(), SpeechError>;
}

/// Sink forwarding deliveries into a channel, drained by the network layer
#[derive(Clone)]
pub struct ChannelSink {
    sender: mpsc::UnboundedSender<(SessionId, PlayTts)>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<(SessionId, PlayTts)>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl AudioSink for ChannelSink {
    fn deliver(&self, session: SessionId, event: PlayTts) -> Result<(), SpeechError> {
        self.sender
            .send((session, event))
            .map_err(|_| SpeechError::Delivery("delivery channel closed".to_string()))
    }
}
