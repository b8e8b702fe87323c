// ABOUTME: Session lifecycle manager tracking the application session across pause/resume/restart
// Serializes start/stop/pause/resume behind one lock, emits lifecycle events and persists the session

use super::error::SessionError;
use super::persistence::{FileSessionStore, SessionStore};
use super::state::{transition, Effect, Operation};
use crate::clock::{Clock, SystemClock};
use crate::config::SessionConfig;
use crate::events::EventSink;
use crate::models::{AnalyticsEvent, Session, SessionContext, SessionState};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

/// How a live session found in the store is brought back at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Recovery {
    /// The process went away without pausing: restore the session paused at
    /// the last moment it was seen alive, so the resume delay still applies.
    #[default]
    PauseAtLastSeen,
    /// Restore the record exactly as stored; an active session stays active.
    /// For callers that rebuild the manager on every operation.
    AsSaved,
}

struct Inner {
    state: SessionState,
    session: Option<Session>,
}

/// Owns the current session and drives it through the lifecycle.
///
/// All operations take a single lock, so concurrent callers (UI callbacks on
/// different threads, say) always observe a settled state. Store and sink
/// failures are logged; the in-memory transition still completes.
pub struct SessionLifecycleManager {
    inner: Mutex<Inner>,
    sink: Arc<dyn EventSink>,
    store: Arc<dyn SessionStore>,
    clock: Arc<dyn Clock>,
    config: SessionConfig,
}

impl SessionLifecycleManager {
    /// Build a manager, restoring any live session from `store`.
    pub fn new(
        sink: Arc<dyn EventSink>,
        store: Arc<dyn SessionStore>,
        clock: Arc<dyn Clock>,
        config: SessionConfig,
    ) -> Self {
        Self::with_recovery(sink, store, clock, config, Recovery::default())
    }

    fn with_recovery(
        sink: Arc<dyn EventSink>,
        store: Arc<dyn SessionStore>,
        clock: Arc<dyn Clock>,
        config: SessionConfig,
        recovery: Recovery,
    ) -> Self {
        let session = Self::recover(store.as_ref(), recovery);
        let state = SessionState::of(session.as_ref());

        info!(
            "Session manager ready in {} state (resume delay {}ms, restart delay {}ms)",
            state, config.resume_delay_ms, config.restart_delay_ms
        );

        Self {
            inner: Mutex::new(Inner { state, session }),
            sink,
            store,
            clock,
            config,
        }
    }

    /// Start assembling a manager; see [`SessionLifecycleManagerBuilder`].
    pub fn builder() -> SessionLifecycleManagerBuilder {
        SessionLifecycleManagerBuilder::default()
    }

    /// Manager backed by the default on-disk store and the system clock.
    pub fn with_file_store(
        config: SessionConfig,
        sink: Arc<dyn EventSink>,
    ) -> Result<Self, SessionError> {
        let store = FileSessionStore::new()?;
        Self::builder()
            .config(config)
            .event_sink(sink)
            .session_store(Arc::new(store))
            .build()
    }

    /// Load the stored session; a terminal one is discarded.
    fn recover(store: &dyn SessionStore, recovery: Recovery) -> Option<Session> {
        let mut session = match store.load() {
            Ok(Some(session)) => session,
            Ok(None) => return None,
            Err(e) => {
                warn!("Failed to load persisted session: {}", e);
                return None;
            }
        };

        if session.is_stopped() {
            info!("Discarding stopped session {} from store", session.session_id);
            if let Err(e) = store.clear() {
                warn!("Failed to clear stopped session: {}", e);
            }
            return None;
        }

        if recovery == Recovery::PauseAtLastSeen && !session.is_paused() {
            // The downtime must count as pause time, not as a fresh pause
            session.pause(session.last_seen());
            if let Err(e) = store.save(&session) {
                warn!("Failed to persist recovered session {}: {}", session.session_id, e);
            }
        }

        info!(
            "Restored {} session {}",
            SessionState::of(Some(&session)),
            session.session_id
        );
        Some(session)
    }

    /// Begin a session; restarts if paused, no-op if already active.
    pub fn start(&self) -> SessionState {
        self.apply(Operation::Start)
    }

    /// End the live session, if any.
    pub fn stop(&self) -> SessionState {
        self.apply(Operation::Stop)
    }

    /// Pause the active session. Call when the app leaves the foreground.
    pub fn pause(&self) -> SessionState {
        self.apply(Operation::Pause)
    }

    /// Resume the paused session if it was paused for at most the resume
    /// delay; otherwise stop it and start a new one.
    pub fn resume(&self) -> SessionState {
        self.apply(Operation::Resume)
    }

    fn apply(&self, operation: Operation) -> SessionState {
        let mut inner = self.lock();
        let now = self.clock.now();
        let previous = inner.state;

        let outcome = transition(
            inner.session.take(),
            operation,
            now,
            self.config.resume_delay_ms,
        );

        inner.state = outcome.state;
        inner.session = outcome.session;

        if outcome.effects.is_empty() {
            debug!("Ignoring {} while session is {}", operation, previous);
            return inner.state;
        }

        for effect in &outcome.effects {
            self.apply_effect(effect);
        }

        info!("Session {} -> {} on {}", previous, inner.state, operation);
        inner.state
    }

    fn apply_effect(&self, effect: &Effect) {
        match effect {
            Effect::Emit(event) => {
                if let Err(e) = self.sink.emit(event) {
                    warn!("Failed to emit {} event: {}", event.event_type, e);
                }
            }
            Effect::Persist(session) => {
                if let Err(e) = self.store.save(session) {
                    warn!("Failed to persist session {}: {}", session.session_id, e);
                }
            }
            Effect::ClearStore => {
                if let Err(e) = self.store.clear() {
                    warn!("Failed to clear session store: {}", e);
                }
            }
        }
    }

    /// New application event stamped with the current time.
    pub fn create_event(&self, event_type: impl Into<String>) -> AnalyticsEvent {
        AnalyticsEvent::new(event_type, self.clock.now())
    }

    /// Emit an application event attributed to the live session, if any.
    pub fn record_event(&self, event: AnalyticsEvent) {
        let inner = self.lock();
        let event = event.with_session(inner.session.as_ref().map(SessionContext::from));
        if let Err(e) = self.sink.emit(&event) {
            warn!("Failed to emit {} event: {}", event.event_type, e);
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.lock().state
    }

    /// Snapshot of the live session.
    pub fn session(&self) -> Option<Session> {
        self.lock().session.clone()
    }

    /// Attribution for application events; cleared when the session stops.
    pub fn current_context(&self) -> Option<SessionContext> {
        self.lock().session.as_ref().map(SessionContext::from)
    }

    /// Longest pause that `resume` still continues.
    pub fn resume_delay_ms(&self) -> u64 {
        self.config.resume_delay_ms
    }

    /// Configured restart delay; no transition depends on it.
    pub fn restart_delay_ms(&self) -> u64 {
        self.config.restart_delay_ms
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // Inner is written before any effect runs, so a poisoned guard is still consistent
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Display for SessionLifecycleManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.lock();
        write!(f, "[SessionLifecycleManager] session: ")?;
        match &inner.session {
            None => write!(f, "<none>"),
            Some(session) if session.is_paused() => write!(f, "{}: paused", session.session_id),
            Some(session) => write!(f, "{}", session.session_id),
        }
    }
}

/// Assembles a [`SessionLifecycleManager`]; the sink and store are required.
#[derive(Default)]
pub struct SessionLifecycleManagerBuilder {
    sink: Option<Arc<dyn EventSink>>,
    store: Option<Arc<dyn SessionStore>>,
    clock: Option<Arc<dyn Clock>>,
    config: Option<SessionConfig>,
    recovery: Recovery,
}

impl SessionLifecycleManagerBuilder {
    /// Required.
    pub fn event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Required.
    pub fn session_store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Defaults to [`SystemClock`].
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Defaults to [`SessionConfig::default`].
    pub fn config(mut self, config: SessionConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Defaults to [`Recovery::PauseAtLastSeen`].
    pub fn recovery(mut self, recovery: Recovery) -> Self {
        self.recovery = recovery;
        self
    }

    /// Fails when the sink or store is missing.
    pub fn build(self) -> Result<SessionLifecycleManager, SessionError> {
        let sink = self.sink.ok_or(SessionError::MissingCollaborator("event sink"))?;
        let store = self
            .store
            .ok_or(SessionError::MissingCollaborator("session store"))?;
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));

        Ok(SessionLifecycleManager::with_recovery(
            sink,
            store,
            clock,
            self.config.unwrap_or_default(),
            self.recovery,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::events::sink::MockEventSink;
    use crate::events::{ChannelEventSink, TracingEventSink};
    use crate::models::event::{SESSION_START_EVENT_TYPE, SESSION_STOP_EVENT_TYPE};
    use crate::session::error::{SinkError, StoreError};
    use crate::session::persistence::{MemorySessionStore, MockSessionStore};
    use chrono::Utc;

    fn io_error() -> StoreError {
        StoreError::Io(std::io::Error::new(std::io::ErrorKind::Other, "disk full"))
    }

    #[test]
    fn test_builder_requires_sink() {
        let result = SessionLifecycleManager::builder()
            .session_store(Arc::new(MemorySessionStore::new()))
            .build();
        assert!(matches!(
            result,
            Err(SessionError::MissingCollaborator("event sink"))
        ));
    }

    #[test]
    fn test_builder_requires_store() {
        let result = SessionLifecycleManager::builder()
            .event_sink(Arc::new(TracingEventSink))
            .build();
        assert!(matches!(
            result,
            Err(SessionError::MissingCollaborator("session store"))
        ));
    }

    #[test]
    fn test_store_failures_do_not_block_transitions() {
        let mut store = MockSessionStore::new();
        store.expect_load().returning(|| Err(io_error()));
        store.expect_save().returning(|_| Err(io_error()));
        store.expect_clear().returning(|| Err(io_error()));

        let manager = SessionLifecycleManager::builder()
            .event_sink(Arc::new(TracingEventSink))
            .session_store(Arc::new(store))
            .build()
            .unwrap();

        assert_eq!(manager.state(), SessionState::Inactive);
        assert_eq!(manager.start(), SessionState::Active);
        assert_eq!(manager.pause(), SessionState::Paused);
        assert_eq!(manager.stop(), SessionState::Inactive);
    }

    #[test]
    fn test_sink_failures_do_not_block_transitions() {
        let mut sink = MockEventSink::new();
        sink.expect_emit()
            .times(3)
            .returning(|_| Err(SinkError::Rejected("offline".to_string())));

        let manager = SessionLifecycleManager::builder()
            .event_sink(Arc::new(sink))
            .session_store(Arc::new(MemorySessionStore::new()))
            .build()
            .unwrap();

        manager.start();
        manager.pause();
        manager.resume();
        assert_eq!(manager.state(), SessionState::Active);
    }

    #[test]
    fn test_noop_emits_nothing() {
        let mut sink = MockEventSink::new();
        sink.expect_emit().never();

        let store = Arc::new(MemorySessionStore::new());
        let manager = SessionLifecycleManager::builder()
            .event_sink(Arc::new(sink))
            .session_store(store.clone())
            .build()
            .unwrap();

        assert_eq!(manager.stop(), SessionState::Inactive);
        assert_eq!(manager.pause(), SessionState::Inactive);
        assert_eq!(manager.resume(), SessionState::Inactive);
        assert_eq!(store.writes(), 0);
    }

    #[test]
    fn test_recovery_pauses_at_last_seen() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let persisted = Session::start(clock.now());
        let store = Arc::new(MemorySessionStore::with_session(persisted.clone()));
        clock.advance_ms(60_000);

        let manager = SessionLifecycleManager::builder()
            .event_sink(Arc::new(TracingEventSink))
            .session_store(store.clone())
            .clock(clock.clone())
            .build()
            .unwrap();

        assert_eq!(manager.state(), SessionState::Paused);
        let restored = manager.session().unwrap();
        assert_eq!(restored.session_id, persisted.session_id);
        assert_eq!(restored.pause_time, Some(persisted.start_time));
        assert_eq!(store.snapshot(), Some(restored));
    }

    #[test]
    fn test_stale_recovered_session_restarts_on_resume() {
        // BEHAVIOR: downtime longer than the resume delay must not reattach the old session
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let mut persisted = Session::start(clock.now());
        clock.advance_ms(2_000);
        persisted.resume(clock.now());
        let store = Arc::new(MemorySessionStore::with_session(persisted.clone()));

        clock.advance_ms(3_600_000);
        let (sink, mut events) = ChannelEventSink::new();
        let manager = SessionLifecycleManager::builder()
            .event_sink(Arc::new(sink))
            .session_store(store)
            .clock(clock.clone())
            .build()
            .unwrap();
        assert_eq!(manager.state(), SessionState::Paused);

        clock.advance_ms(1_000);
        assert_eq!(manager.resume(), SessionState::Active);

        let stop = events.try_recv().unwrap();
        let start = events.try_recv().unwrap();
        assert_eq!(stop.event_type, SESSION_STOP_EVENT_TYPE);
        assert_eq!(start.event_type, SESSION_START_EVENT_TYPE);
        // Only the time seen alive counts, not the downtime
        assert_eq!(stop.metric("_session.duration"), Some(2_000.0));
        assert_ne!(manager.session().unwrap().session_id, persisted.session_id);
    }

    #[test]
    fn test_recovery_as_saved_keeps_active_session() {
        let persisted = Session::start(Utc::now());
        let store = Arc::new(MemorySessionStore::with_session(persisted.clone()));

        let manager = SessionLifecycleManager::builder()
            .event_sink(Arc::new(TracingEventSink))
            .session_store(store.clone())
            .recovery(Recovery::AsSaved)
            .build()
            .unwrap();

        assert_eq!(manager.state(), SessionState::Active);
        assert_eq!(manager.session(), Some(persisted));
        assert_eq!(store.writes(), 0);
    }

    #[test]
    fn test_recovery_discards_stopped_session() {
        let mut stopped = Session::start(Utc::now());
        stopped.stop(Utc::now());
        let store = Arc::new(MemorySessionStore::with_session(stopped));

        let manager = SessionLifecycleManager::builder()
            .event_sink(Arc::new(TracingEventSink))
            .session_store(store.clone())
            .build()
            .unwrap();

        assert_eq!(manager.state(), SessionState::Inactive);
        assert!(store.snapshot().is_none());
    }

    #[test]
    fn test_display_diagnostic() {
        let manager = SessionLifecycleManager::builder()
            .event_sink(Arc::new(TracingEventSink))
            .session_store(Arc::new(MemorySessionStore::new()))
            .build()
            .unwrap();
        assert_eq!(manager.to_string(), "[SessionLifecycleManager] session: <none>");

        manager.start();
        let id = manager.session().unwrap().session_id;
        assert_eq!(manager.to_string(), format!("[SessionLifecycleManager] session: {id}"));

        manager.pause();
        assert_eq!(
            manager.to_string(),
            format!("[SessionLifecycleManager] session: {id}: paused")
        );
    }

    #[test]
    fn test_manager_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SessionLifecycleManager>();
    }
}
