// ABOUTME: Session state machine as a pure transition over Inactive/Active/Paused
// Produces the next session record plus the ordered side effects the manager must apply

use crate::models::{AnalyticsEvent, Session, SessionState};
use chrono::{DateTime, Utc};
use std::fmt;

/// The four lifecycle operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Begin a session, or restart a paused one.
    Start,
    /// End the live session.
    Stop,
    /// Pause the active session.
    Pause,
    /// Continue the paused session, or restart it once the resume delay has passed.
    Resume,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Start => "start",
            Operation::Stop => "stop",
            Operation::Pause => "pause",
            Operation::Resume => "resume",
        };
        f.write_str(name)
    }
}

/// Side effect requested by a transition, applied in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Send the event to the sink.
    Emit(AnalyticsEvent),
    /// Save the record to the store.
    Persist(Session),
    /// Remove the stored record.
    ClearStore,
}

/// Result of applying one operation.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    /// State after the operation.
    pub state: SessionState,
    /// Live session after the operation; `None` once stopped.
    pub session: Option<Session>,
    /// Empty for a no-op.
    pub effects: Vec<Effect>,
}

impl Transition {
    fn unchanged(session: Option<Session>) -> Self {
        Self {
            state: SessionState::of(session.as_ref()),
            session,
            effects: Vec::new(),
        }
    }

    fn settled(session: Option<Session>, effects: Vec<Effect>) -> Self {
        Self {
            state: SessionState::of(session.as_ref()),
            session,
            effects,
        }
    }

    /// True when nothing changed.
    pub fn is_noop(&self) -> bool {
        self.effects.is_empty()
    }

    /// Events this transition emits, in order.
    pub fn events(&self) -> impl Iterator<Item = &AnalyticsEvent> {
        self.effects.iter().filter_map(|effect| match effect {
            Effect::Emit(event) => Some(event),
            _ => None,
        })
    }
}

/// Apply `operation` to the current session at time `now`.
///
/// The state is derived from `current`; a stopped record counts as Inactive.
pub fn transition(
    current: Option<Session>,
    operation: Operation,
    now: DateTime<Utc>,
    resume_delay_ms: u64,
) -> Transition {
    let state = SessionState::of(current.as_ref());

    match (state, operation) {
        (SessionState::Inactive, Operation::Start) => {
            let mut effects = Vec::new();
            let session = begin(now, &mut effects);
            Transition::settled(Some(session), effects)
        }
        (SessionState::Paused, Operation::Start) => match current {
            Some(paused) => restart(paused, now),
            None => Transition::unchanged(None),
        },

        (SessionState::Active | SessionState::Paused, Operation::Stop) => match current {
            Some(live) => {
                let mut effects = Vec::new();
                finalize(live, now, &mut effects);
                Transition::settled(None, effects)
            }
            None => Transition::unchanged(None),
        },

        (SessionState::Active, Operation::Pause) => match current {
            Some(mut session) => {
                session.pause(now);
                let effects = vec![
                    Effect::Emit(AnalyticsEvent::session_pause(&session, now)),
                    Effect::Persist(session.clone()),
                ];
                Transition::settled(Some(session), effects)
            }
            None => Transition::unchanged(None),
        },

        (SessionState::Paused, Operation::Resume) => match current {
            Some(mut session) => {
                let elapsed = session.paused_for(now).unwrap_or(0);
                if elapsed.unsigned_abs() <= resume_delay_ms {
                    session.resume(now);
                    let effects = vec![
                        Effect::Emit(AnalyticsEvent::session_resume(&session, now)),
                        Effect::Persist(session.clone()),
                    ];
                    Transition::settled(Some(session), effects)
                } else {
                    restart(session, now)
                }
            }
            None => Transition::unchanged(None),
        },

        // Active+Start, Inactive+Stop, Paused/Inactive+Pause, Active/Inactive+Resume
        _ => Transition::unchanged(current),
    }
}

/// Finalize the paused session, then begin a fresh one.
fn restart(paused: Session, now: DateTime<Utc>) -> Transition {
    let mut effects = Vec::new();
    finalize(paused, now, &mut effects);
    let session = begin(now, &mut effects);
    Transition::settled(Some(session), effects)
}

fn begin(now: DateTime<Utc>, effects: &mut Vec<Effect>) -> Session {
    let session = Session::start(now);
    effects.push(Effect::Emit(AnalyticsEvent::session_start(&session)));
    effects.push(Effect::Persist(session.clone()));
    session
}

fn finalize(mut session: Session, now: DateTime<Utc>, effects: &mut Vec<Effect>) {
    // Duration must be read before stop_time is set, or the pause point is lost
    let duration_ms = session.duration(now);
    session.stop(now);
    effects.push(Effect::Emit(AnalyticsEvent::session_stop(
        &session,
        now,
        duration_ms,
    )));
    effects.push(Effect::ClearStore);
}
