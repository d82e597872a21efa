//! Session management
//!
//! The session registry is the single authority on the id → session mapping:
//! exactly one `Session` exists per id, created on first use and destroyed by
//! explicit teardown or the idle sweep. All conversation-scoped protocol
//! state (negotiated version, initialized flag, outbound event counter, the
//! streaming channel) lives on the session, never in globals.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use tokio::sync::{mpsc, watch};

use crate::ServerError;

/// Buffered outbound messages per streaming channel.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// One server-initiated message on a session's streaming channel.
#[derive(Debug, Clone)]
pub struct SessionEvent {
    /// Monotonic per-session id, usable as an SSE event id.
    pub id: u64,
    pub payload: Value,
}

#[derive(Default)]
struct TransportState {
    initialized: bool,
    protocol_version: Option<String>,
    next_event_id: u64,
    events_tx: Option<mpsc::Sender<SessionEvent>>,
}

/// One logical conversation, addressable independently of any connection.
pub struct Session {
    pub id: String,
    pub created_at: Instant,
    last_activity: RwLock<Instant>,
    active: RwLock<bool>,
    transport: Mutex<TransportState>,
    /// Serializes dispatch so one session processes requests in arrival order.
    dispatch_lock: tokio::sync::Mutex<()>,
}

impl Session {
    fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            created_at: Instant::now(),
            last_activity: RwLock::new(Instant::now()),
            active: RwLock::new(true),
            transport: Mutex::new(TransportState::default()),
            dispatch_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn touch(&self) {
        *self.last_activity.write() = Instant::now();
    }

    pub fn is_expired(&self, timeout: Duration) -> bool {
        self.last_activity.read().elapsed() > timeout
    }

    pub fn close(&self) {
        *self.active.write() = false;
        self.transport.lock().events_tx = None;
    }

    pub fn is_active(&self) -> bool {
        *self.active.read()
    }

    /// Hold while dispatching so requests within this session stay ordered.
    pub async fn serialize_dispatch(&self) -> tokio::sync::MutexGuard<'_, ()> {
        self.dispatch_lock.lock().await
    }

    pub fn mark_initialized(&self, protocol_version: String) {
        let mut transport = self.transport.lock();
        transport.initialized = true;
        transport.protocol_version = Some(protocol_version);
    }

    pub fn is_initialized(&self) -> bool {
        self.transport.lock().initialized
    }

    pub fn protocol_version(&self) -> Option<String> {
        self.transport.lock().protocol_version.clone()
    }

    /// Next outbound event id; monotonic for the session's lifetime.
    pub fn next_event_id(&self) -> u64 {
        let mut transport = self.transport.lock();
        transport.next_event_id += 1;
        transport.next_event_id
    }

    /// Open (or replace, on reconnect) the streaming channel.
    pub fn subscribe(&self) -> mpsc::Receiver<SessionEvent> {
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        self.transport.lock().events_tx = Some(tx);
        rx
    }

    /// Queue a server-initiated message if a stream is attached.
    pub fn push_event(&self, payload: Value) {
        let event = SessionEvent {
            id: self.next_event_id(),
            payload,
        };
        let tx = self.transport.lock().events_tx.clone();
        if let Some(tx) = tx {
            if tx.try_send(event).is_err() {
                tracing::debug!(session_id = %self.id, "streaming channel full or gone");
            }
        }
    }
}

/// Registry and sole owner of live sessions.
pub struct SessionManager {
    sessions: RwLock<HashMap<String, Arc<Session>>>,
    max_sessions: usize,
    session_timeout: Duration,
    cleanup_interval: Duration,
}

impl SessionManager {
    pub fn new(max_sessions: usize) -> Self {
        Self::with_config(
            max_sessions,
            Duration::from_secs(1800),
            Duration::from_secs(300),
        )
    }

    pub fn with_config(
        max_sessions: usize,
        session_timeout: Duration,
        cleanup_interval: Duration,
    ) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            max_sessions,
            session_timeout,
            cleanup_interval,
        }
    }

    /// Start the periodic idle sweep. Returns a shutdown handle.
    pub fn start_cleanup_task(self: &Arc<Self>) -> watch::Sender<bool> {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let manager = Arc::clone(self);
        let interval = manager.cleanup_interval;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let removed = manager.cleanup_expired();
                        if removed > 0 {
                            tracing::info!(removed, remaining = manager.count(), "swept idle sessions");
                        }
                    }
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            tracing::info!("session sweeper shutting down");
                            break;
                        }
                    }
                }
            }
        });

        shutdown_tx
    }

    /// Resolve an id to its session, creating one when the id is absent or
    /// unknown.
    ///
    /// A known id returns the same session with all conversation state
    /// intact. An unknown id (including one that was torn down) gets a
    /// freshly minted id instead: sessions are never resurrected, and two
    /// conversations can never share state. The boolean reports whether a
    /// session was created.
    pub fn resolve(&self, id: Option<&str>) -> Result<(Arc<Session>, bool), ServerError> {
        if let Some(id) = id {
            if let Some(session) = self.get(id) {
                return Ok((session, false));
            }
            tracing::debug!(session_id = %id, "unknown session id, minting a new session");
        }
        Ok((self.create()?, true))
    }

    /// Create a session under a fresh id.
    pub fn create(&self) -> Result<Arc<Session>, ServerError> {
        let mut sessions = self.sessions.write();

        if sessions.len() >= self.max_sessions {
            Self::sweep(&mut sessions, self.session_timeout);
            if sessions.len() >= self.max_sessions {
                return Err(ServerError::Capacity);
            }
        }

        let id = uuid::Uuid::new_v4().to_string();
        let session = Arc::new(Session::new(&id));
        sessions.insert(id.clone(), session.clone());

        tracing::info!(session_id = %id, "session created");
        Ok(session)
    }

    pub fn get(&self, id: &str) -> Option<Arc<Session>> {
        self.sessions.read().get(id).cloned()
    }

    /// Tear down a session. Returns false when the id was unknown.
    pub fn remove(&self, id: &str) -> bool {
        let removed = self.sessions.write().remove(id);
        match removed {
            Some(session) => {
                session.close();
                tracing::info!(session_id = %id, "session removed");
                true
            }
            None => false,
        }
    }

    pub fn count(&self) -> usize {
        self.sessions.read().len()
    }

    /// Sweep idle sessions; returns how many were removed.
    pub fn cleanup_expired(&self) -> usize {
        let mut sessions = self.sessions.write();
        Self::sweep(&mut sessions, self.session_timeout)
    }

    fn sweep(sessions: &mut HashMap<String, Arc<Session>>, timeout: Duration) -> usize {
        let expired: Vec<String> = sessions
            .iter()
            .filter(|(_, s)| s.is_expired(timeout))
            .map(|(id, _)| id.clone())
            .collect();

        let removed = expired.len();
        for id in expired {
            if let Some(session) = sessions.remove(&id) {
                session.close();
                tracing::info!(session_id = %id, "session expired");
            }
        }
        removed
    }

    pub fn list(&self) -> Vec<String> {
        self.sessions.read().keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolving_a_known_id_preserves_session_state() {
        let manager = SessionManager::new(10);
        let (session, created) = manager.resolve(None).unwrap();
        assert!(created);

        // Advance conversation-scoped state, then resolve again by id.
        session.mark_initialized("2024-11-05".to_string());
        assert_eq!(session.next_event_id(), 1);
        assert_eq!(session.next_event_id(), 2);

        let (resumed, created) = manager.resolve(Some(&session.id)).unwrap();
        assert!(!created);
        assert_eq!(resumed.id, session.id);
        assert!(resumed.is_initialized());
        assert_eq!(resumed.next_event_id(), 3);
    }

    #[test]
    fn unknown_id_gets_a_distinct_fresh_session() {
        let manager = SessionManager::new(10);
        let (first, _) = manager.resolve(None).unwrap();
        first.mark_initialized("2024-11-05".to_string());

        let (second, created) = manager.resolve(Some("no-such-session")).unwrap();
        assert!(created);
        assert_ne!(second.id, first.id);
        assert_ne!(second.id, "no-such-session");
        assert!(!second.is_initialized());
    }

    #[test]
    fn teardown_never_resurrects() {
        let manager = SessionManager::new(10);
        let (session, _) = manager.resolve(None).unwrap();
        let id = session.id.clone();

        assert!(manager.remove(&id));
        assert!(!session.is_active());
        assert!(manager.get(&id).is_none());
        // Second teardown of the same id reports unknown.
        assert!(!manager.remove(&id));

        let (replacement, created) = manager.resolve(Some(&id)).unwrap();
        assert!(created);
        assert_ne!(replacement.id, id);
    }

    #[test]
    fn capacity_is_enforced_after_sweeping() {
        let manager = SessionManager::with_config(
            1,
            Duration::from_secs(3600),
            Duration::from_secs(60),
        );
        manager.create().unwrap();
        assert!(matches!(manager.create(), Err(ServerError::Capacity)));
    }

    #[test]
    fn expired_sessions_are_swept() {
        let manager =
            SessionManager::with_config(10, Duration::from_millis(0), Duration::from_secs(60));
        let (session, _) = manager.resolve(None).unwrap();
        std::thread::sleep(Duration::from_millis(5));

        assert_eq!(manager.cleanup_expired(), 1);
        assert!(manager.get(&session.id).is_none());
    }

    #[tokio::test]
    async fn streaming_channel_receives_pushed_events() {
        let manager = SessionManager::new(10);
        let (session, _) = manager.resolve(None).unwrap();

        let mut rx = session.subscribe();
        session.push_event(serde_json::json!({"method": "notifications/message"}));

        let event = rx.recv().await.unwrap();
        assert_eq!(event.id, 1);
        assert_eq!(event.payload["method"], "notifications/message");
    }
}
