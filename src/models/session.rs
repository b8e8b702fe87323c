// ABOUTME: Session data model representing one bounded period of application usage
// Tracks start, pause and stop timestamps; status is derived from which are set

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Lifecycle status of the session client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionState {
    /// No live session.
    Inactive,
    /// A session is running in the foreground.
    Active,
    /// The session is paused and may still be resumed.
    Paused,
}

impl SessionState {
    /// Derive the state from the current session record, if any.
    pub fn of(session: Option<&Session>) -> Self {
        match session {
            None => SessionState::Inactive,
            Some(s) if s.is_stopped() => SessionState::Inactive,
            Some(s) if s.is_paused() => SessionState::Paused,
            Some(_) => SessionState::Active,
        }
    }

    /// Single-glyph status marker for terminal output.
    pub fn indicator(&self) -> &'static str {
        match self {
            SessionState::Inactive => "○",
            SessionState::Active => "●",
            SessionState::Paused => "⏸",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Inactive => "inactive",
            SessionState::Active => "active",
            SessionState::Paused => "paused",
        };
        f.write_str(name)
    }
}

/// A single application session.
///
/// Once `stop_time` is set the record is terminal: `pause`, `resume` and
/// `stop` leave it untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Generated when the session starts.
    pub session_id: Uuid,
    /// When the session became active.
    pub start_time: DateTime<Utc>,
    /// Set once the session ends.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_time: Option<DateTime<Utc>>,
    /// Most recent pause, cleared on resume.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pause_time: Option<DateTime<Utc>>,
    /// Last lifecycle change; the latest moment the session is known to have been alive.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Begin a new session with a freshly generated id.
    pub fn start(now: DateTime<Utc>) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            start_time: now,
            stop_time: None,
            pause_time: None,
            updated_at: Some(now),
        }
    }

    /// When the session was last seen alive, falling back to its start.
    pub fn last_seen(&self) -> DateTime<Utc> {
        self.updated_at.unwrap_or(self.start_time)
    }

    /// Paused: pause time set and not stopped.
    pub fn is_paused(&self) -> bool {
        self.pause_time.is_some() && self.stop_time.is_none()
    }

    /// Stopped sessions are terminal.
    pub fn is_stopped(&self) -> bool {
        self.stop_time.is_some()
    }

    /// Mark the session paused at `now`; keeps an earlier pause.
    pub fn pause(&mut self, now: DateTime<Utc>) {
        if !self.is_stopped() && !self.is_paused() {
            self.pause_time = Some(now);
            self.updated_at = Some(now);
        }
    }

    /// Clear the pause so the session is active again.
    pub fn resume(&mut self, now: DateTime<Utc>) {
        if !self.is_stopped() {
            self.pause_time = None;
            self.updated_at = Some(now);
        }
    }

    /// Finalize the session. No-op once stopped.
    pub fn stop(&mut self, now: DateTime<Utc>) {
        if !self.is_stopped() {
            self.stop_time = Some(now);
            self.updated_at = Some(now);
        }
    }

    /// Milliseconds paused so far, or `None` when not paused.
    pub fn paused_for(&self, now: DateTime<Utc>) -> Option<i64> {
        if !self.is_paused() {
            return None;
        }
        self.pause_time
            .map(|paused_at| (now - paused_at).num_milliseconds().max(0))
    }

    /// Session length in milliseconds.
    ///
    /// A paused session counts up to its pause point, a stopped one up to its
    /// stop time, and a running one up to `now`.
    pub fn duration(&self, now: DateTime<Utc>) -> i64 {
        let end = match (self.stop_time, self.pause_time) {
            (Some(stopped), _) => stopped,
            (None, Some(paused)) => paused,
            (None, None) => now,
        };
        (end - self.start_time).num_milliseconds().max(0)
    }
}
