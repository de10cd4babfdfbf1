//! Connected listeners, as seen by the dispatcher

use babel_core::{ActorId, Position, SessionId};
use parking_lot::RwLock;
use std::collections::HashMap;

/// A connected session, optionally attached to an in-world actor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Listener {
    pub session: SessionId,
    pub actor: Option<ActorId>,
    pub position: Option<Position>,
}

impl Listener {
    pub fn new(session: SessionId, actor: Option<ActorId>, position: Option<Position>) -> Self {
        Self { session, actor, position }
    }
}

/// Session lookups provided by the session-management layer
pub trait ListenerDirectory: Send + Sync {
    /// Every connected listener
    fn all(&self) -> Vec<Listener>;

    /// Listeners whose actor is within `radius` of `position`
    fn within(&self, position: Position, radius: f32) -> Vec<Listener>;

    /// Sessions attached to `actor`
    fn sessions_of(&self, actor: ActorId) -> Vec<Listener>;

    fn is_connected(&self, session: SessionId) -> bool;

    /// Current world position of `actor`, if it is tracked
    fn position_of(&self, actor: ActorId) -> Option<Position>;
}

/// Directory kept in memory, updated by whoever owns the sessions
#[derive(Default)]
pub struct InMemoryDirectory {
    sessions: RwLock<HashMap<SessionId, Listener>>,
    positions: RwLock<HashMap<ActorId, Position>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connect(&self, session: SessionId) {
        self.sessions
            .write()
            .entry(session)
            .or_insert_with(|| Listener::new(session, None, None));
    }

    pub fn disconnect(&self, session: SessionId) {
        self.sessions.write().remove(&session);
    }

    /// Attach (or detach with `None`) a session to an actor
    pub fn attach(&self, session: SessionId, actor: Option<ActorId>) {
        let position = actor.and_then(|a| self.positions.read().get(&a).copied());
        let mut sessions = self.sessions.write();
        let listener = sessions
            .entry(session)
            .or_insert_with(|| Listener::new(session, None, None));
        listener.actor = actor;
        listener.position = position;
    }

    /// Move an actor; every session attached to it follows
    pub fn set_position(&self, actor: ActorId, position: Position) {
        self.positions.write().insert(actor, position);
        for listener in self.sessions.write().values_mut() {
            if listener.actor == Some(actor) {
                listener.position = Some(position);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}

impl ListenerDirectory for InMemoryDirectory {
    fn all(&self) -> Vec<Listener> {
        self.sessions.read().values().copied().collect()
    }

    fn within(&self, position: Position, radius: f32) -> Vec<Listener> {
        let radius_sq = radius * radius;
        self.sessions
            .read()
            .values()
            .filter(|l| {
                l.position
                    .map(|p| p.distance_squared(&position) <= radius_sq)
                    .unwrap_or(false)
            })
            .copied()
            .collect()
    }

    fn sessions_of(&self, actor: ActorId) -> Vec<Listener> {
        self.sessions
            .read()
            .values()
            .filter(|l| l.actor == Some(actor))
            .copied()
            .collect()
    }

    fn is_connected(&self, session: SessionId) -> bool {
        self.sessions.read().contains_key(&session)
    }

    fn position_of(&self, actor: ActorId) -> Option<Position> {
        self.positions.read().get(&actor).copied()
    }
}
