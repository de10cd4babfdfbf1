// Rate limiting for voice preview requests

use babel_core::SessionId;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tokio::time::Instant;

/// Sliding-window limiter applied to on-demand previews only
pub struct PreviewRateLimiter {
    // Map from session to recent request timestamps, oldest first
    requests: Mutex<HashMap<SessionId, VecDeque<Instant>>>,
    max_requests: usize,
    window: Duration,
}

impl PreviewRateLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            requests: Mutex::new(HashMap::new()),
            max_requests,
            window,
        }
    }

    /// Check if a request is allowed and record it
    pub fn allow(&self, session: SessionId) -> bool {
        let mut requests = self.requests.lock();
        let now = Instant::now();

        // Cleanup old entries periodically to prevent memory growth
        if requests.len() > 10_000 {
            let window = self.window;
            requests.retain(|_, times| {
                times.retain(|&t| now.duration_since(t) < window);
                !times.is_empty()
            });
        }

        let entry = requests.entry(session).or_default();
        while let Some(&oldest) = entry.front() {
            if now.duration_since(oldest) < self.window {
                break;
            }
            entry.pop_front();
        }

        if entry.len() >= self.max_requests {
            return false;
        }

        entry.push_back(now);
        true
    }

    /// Drop state for a disconnected session
    pub fn forget(&self, session: SessionId) {
        self.requests.lock().remove(&session);
    }
}
