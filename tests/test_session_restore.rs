// ABOUTME: Tests for recovering a session from the file store across process restarts

use session_box::models::event::{SESSION_RESUME_EVENT_TYPE, SESSION_START_EVENT_TYPE};
use session_box::{
    AnalyticsEvent, ChannelEventSink, Clock, FileSessionStore, ManualClock, Session,
    SessionLifecycleManager, SessionState, SessionStore,
};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::mpsc::UnboundedReceiver;

fn manager_for(
    dir: &TempDir,
    clock: &Arc<ManualClock>,
) -> (SessionLifecycleManager, UnboundedReceiver<AnalyticsEvent>) {
    let store = FileSessionStore::in_dir(dir.path()).expect("store dir should be writable");
    let (sink, events) = ChannelEventSink::new();
    let manager = SessionLifecycleManager::builder()
        .event_sink(Arc::new(sink))
        .session_store(Arc::new(store))
        .clock(clock.clone())
        .build()
        .expect("manager should build");
    (manager, events)
}

fn drain(events: &mut UnboundedReceiver<AnalyticsEvent>) -> Vec<AnalyticsEvent> {
    let mut out = Vec::new();
    while let Ok(event) = events.try_recv() {
        out.push(event);
    }
    out
}

#[test]
fn test_fresh_store_starts_inactive() {
    let dir = TempDir::new().unwrap();
    let clock = Arc::new(ManualClock::default());
    let (manager, _events) = manager_for(&dir, &clock);

    assert_eq!(manager.state(), SessionState::Inactive);
    assert!(manager.session().is_none());
}

#[test]
fn test_paused_session_survives_restart() {
    // BEHAVIOR: a session paused before the process exits comes back paused with the same id
    let dir = TempDir::new().unwrap();
    let clock = Arc::new(ManualClock::default());

    let original_id = {
        let (manager, _events) = manager_for(&dir, &clock);
        manager.start();
        manager.pause();
        manager.session().unwrap().session_id
    };

    clock.advance_ms(2_000);
    let (manager, mut events) = manager_for(&dir, &clock);
    assert_eq!(manager.state(), SessionState::Paused);
    assert_eq!(manager.session().unwrap().session_id, original_id);
    assert_eq!(
        manager.current_context().map(|c| c.session_id),
        Some(original_id)
    );

    // Within the resume delay the restored session continues
    manager.resume();
    let emitted = drain(&mut events);
    assert_eq!(emitted.len(), 1);
    assert_eq!(emitted[0].event_type, SESSION_RESUME_EVENT_TYPE);
    assert_eq!(manager.session().unwrap().session_id, original_id);
}

#[test]
fn test_preloaded_store_restores_paused() {
    let dir = TempDir::new().unwrap();
    let clock = Arc::new(ManualClock::default());

    let mut persisted = Session::start(clock.now());
    persisted.pause(clock.now());
    FileSessionStore::in_dir(dir.path())
        .unwrap()
        .save(&persisted)
        .unwrap();

    let (manager, _events) = manager_for(&dir, &clock);
    assert_eq!(manager.state(), SessionState::Paused);
    assert_eq!(manager.session(), Some(persisted));
}

#[test]
fn test_long_gap_after_restart_starts_new_session() {
    let dir = TempDir::new().unwrap();
    let clock = Arc::new(ManualClock::default());

    let original_id = {
        let (manager, _events) = manager_for(&dir, &clock);
        manager.start();
        manager.pause();
        manager.session().unwrap().session_id
    };

    clock.advance_ms(120_000);
    let (manager, mut events) = manager_for(&dir, &clock);
    manager.resume();

    let types: Vec<_> = drain(&mut events)
        .into_iter()
        .map(|e| e.event_type)
        .collect();
    assert_eq!(types, vec!["_session.stop", SESSION_START_EVENT_TYPE]);
    assert_ne!(manager.session().unwrap().session_id, original_id);

    // The new session is what a further restart would see
    let stored = FileSessionStore::in_dir(dir.path()).unwrap().load().unwrap();
    assert_eq!(stored, manager.session());
}

#[test]
fn test_stopped_session_is_not_restored() {
    let dir = TempDir::new().unwrap();
    let clock = Arc::new(ManualClock::default());

    {
        let (manager, _events) = manager_for(&dir, &clock);
        manager.start();
        manager.stop();
    }

    let (manager, _events) = manager_for(&dir, &clock);
    assert_eq!(manager.state(), SessionState::Inactive);
}

#[test]
fn test_corrupt_store_falls_back_to_inactive() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("session.json"), "garbage").unwrap();
    let clock = Arc::new(ManualClock::default());

    let (manager, _events) = manager_for(&dir, &clock);
    assert_eq!(manager.state(), SessionState::Inactive);

    // And the store is overwritten by the next session
    manager.start();
    let stored = FileSessionStore::in_dir(dir.path()).unwrap().load().unwrap();
    assert_eq!(stored, manager.session());
}
