// Completion registry for hosted checkout attempts: waiters per attempt id, fed by the callback endpoint

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, warn};

const DEFAULT_CHANNEL_CAPACITY: usize = 4;
const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(3600); // 1 hour

/// How a hosted checkout page ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostedCompletion {
    Completed { session_id: Option<String> },
    Cancelled,
}

/// Update message sent to waiters
#[derive(Debug, Clone)]
pub struct CompletionUpdate {
    pub attempt_id: String,
    pub completion: HostedCompletion,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CompletionError {
    #[error("unknown checkout attempt: {0}")]
    UnknownAttempt(String),
}

struct AttemptSession {
    tx: broadcast::Sender<CompletionUpdate>,
    created_at: Instant,
    last_event_id: Option<String>,
    completed: bool,
}

impl AttemptSession {
    fn new() -> Self {
        let (tx, _rx) = broadcast::channel(DEFAULT_CHANNEL_CAPACITY);
        Self {
            tx,
            created_at: Instant::now(),
            last_event_id: None,
            completed: false,
        }
    }

    fn is_expired(&self, ttl: Duration) -> bool {
        self.created_at.elapsed() > ttl
    }
}

/// Shared registry of in-flight hosted attempts
pub struct CompletionRegistry {
    sessions: Arc<RwLock<HashMap<String, AttemptSession>>>,
    session_ttl: Duration,
}

impl CompletionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            session_ttl: DEFAULT_SESSION_TTL,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    /// Register a waiter for an attempt and return a receiver
    pub async fn register_waiter(&self, attempt_id: &str) -> broadcast::Receiver<CompletionUpdate> {
        let mut sessions = self.sessions.write().await;

        self.cleanup_expired_sessions(&mut sessions);

        let session = sessions.entry(attempt_id.to_string()).or_insert_with(|| {
            debug!(target: "hosted", attempt_id = %attempt_id, "registering checkout attempt");
            AttemptSession::new()
        });
        session.tx.subscribe()
    }

    /// Publish the completion of an attempt.
    ///
    /// Returns the number of waiters notified. Repeated deliveries (same
    /// event id, or anything after the first completion) notify nobody.
    pub async fn publish(
        &self,
        attempt_id: &str,
        completion: HostedCompletion,
        event_id: Option<&str>,
    ) -> Result<usize, CompletionError> {
        let mut sessions = self.sessions.write().await;

        let session = match sessions.get_mut(attempt_id) {
            Some(s) => s,
            None => {
                warn!(target: "hosted", attempt_id = %attempt_id, "no waiter for checkout completion");
                return Err(CompletionError::UnknownAttempt(attempt_id.to_string()));
            }
        };

        if let (Some(event_id), Some(last_event_id)) = (event_id, &session.last_event_id) {
            if event_id == last_event_id {
                debug!(target: "hosted", attempt_id = %attempt_id, event_id = %event_id, "skipping duplicate completion");
                return Ok(0);
            }
        }
        if session.completed {
            debug!(target: "hosted", attempt_id = %attempt_id, "attempt already completed");
            return Ok(0);
        }

        if let Some(event_id) = event_id {
            session.last_event_id = Some(event_id.to_string());
        }
        session.completed = true;

        let update = CompletionUpdate {
            attempt_id: attempt_id.to_string(),
            completion,
        };
        match session.tx.send(update) {
            Ok(count) => {
                debug!(target: "hosted", attempt_id = %attempt_id, receivers = count, "published checkout completion");
                Ok(count)
            }
            Err(_) => {
                warn!(target: "hosted", attempt_id = %attempt_id, "completion published with no receivers");
                Ok(0)
            }
        }
    }

    /// Remove a waiter/session
    pub async fn remove_waiter(&self, attempt_id: &str) {
        let mut sessions = self.sessions.write().await;
        if sessions.remove(attempt_id).is_some() {
            debug!(target: "hosted", attempt_id = %attempt_id, "removed checkout attempt");
        }
    }

    pub async fn has_session(&self, attempt_id: &str) -> bool {
        let sessions = self.sessions.read().await;
        sessions.contains_key(attempt_id)
    }

    pub async fn is_completed(&self, attempt_id: &str) -> bool {
        let sessions = self.sessions.read().await;
        sessions.get(attempt_id).map(|s| s.completed).unwrap_or(false)
    }

    fn cleanup_expired_sessions(&self, sessions: &mut HashMap<String, AttemptSession>) {
        let ttl = self.session_ttl;
        sessions.retain(|id, session| {
            let keep = !session.is_expired(ttl);
            if !keep {
                debug!(target: "hosted", attempt_id = %id, "cleaned up expired checkout attempt");
            }
            keep
        });
    }
}

impl Default for CompletionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
