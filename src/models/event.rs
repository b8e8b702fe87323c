// ABOUTME: Analytics event model and the session attribution context attached to events

use super::Session;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Emitted when a session begins.
pub const SESSION_START_EVENT_TYPE: &str = "_session.start";
/// Emitted when a session ends.
pub const SESSION_STOP_EVENT_TYPE: &str = "_session.stop";
/// Emitted when the active session pauses.
pub const SESSION_PAUSE_EVENT_TYPE: &str = "_session.pause";
/// Emitted when a paused session continues.
pub const SESSION_RESUME_EVENT_TYPE: &str = "_session.resume";

/// Attribute holding the session id.
pub const SESSION_ID_ATTRIBUTE_KEY: &str = "_session.id";
/// Attribute holding the start timestamp.
pub const SESSION_START_TIME_ATTRIBUTE_KEY: &str = "_session.startTime";
/// Attribute holding the stop timestamp.
pub const SESSION_STOP_TIME_ATTRIBUTE_KEY: &str = "_session.stopTime";
/// Metric holding the session length in milliseconds.
pub const SESSION_DURATION_METRIC_KEY: &str = "_session.duration";

/// Session an event is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionContext {
    /// Id of the attributed session.
    pub session_id: Uuid,
    /// When that session started.
    pub start_time: DateTime<Utc>,
}

impl From<&Session> for SessionContext {
    fn from(session: &Session) -> Self {
        Self {
            session_id: session.session_id,
            start_time: session.start_time,
        }
    }
}

/// A typed event with string attributes and numeric metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsEvent {
    /// e.g. `_session.start` or an application-defined type.
    pub event_type: String,
    /// When the event happened.
    pub timestamp: DateTime<Utc>,
    /// String attributes.
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    /// Numeric metrics.
    #[serde(default)]
    pub metrics: BTreeMap<String, f64>,
    /// Session the event belongs to, if one was live.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<SessionContext>,
}

impl AnalyticsEvent {
    /// Event with no attributes, metrics or session.
    pub fn new(event_type: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            event_type: event_type.into(),
            timestamp,
            attributes: BTreeMap::new(),
            metrics: BTreeMap::new(),
            session: None,
        }
    }

    /// Add or replace an attribute.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Add or replace a metric.
    pub fn with_metric(mut self, key: impl Into<String>, value: f64) -> Self {
        self.metrics.insert(key.into(), value);
        self
    }

    /// Attribute the event to a session, or clear it with `None`.
    pub fn with_session(mut self, context: Option<SessionContext>) -> Self {
        self.session = context;
        self
    }

    /// Attribute value by key.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// Metric value by key.
    pub fn metric(&self, key: &str) -> Option<f64> {
        self.metrics.get(key).copied()
    }

    /// True for the `_session.*` lifecycle events.
    pub fn is_session_event(&self) -> bool {
        self.event_type.starts_with("_session.")
    }

    /// `_session.start` for a freshly started session.
    pub fn session_start(session: &Session) -> Self {
        Self::new(SESSION_START_EVENT_TYPE, session.start_time)
            .with_attribute(SESSION_ID_ATTRIBUTE_KEY, session.session_id.to_string())
            .with_attribute(
                SESSION_START_TIME_ATTRIBUTE_KEY,
                format_timestamp(session.start_time),
            )
            .with_session(Some(SessionContext::from(session)))
    }

    /// `_session.stop` for a session that was just finalized.
    pub fn session_stop(session: &Session, stopped_at: DateTime<Utc>, duration_ms: i64) -> Self {
        #[allow(clippy::cast_precision_loss)]
        let duration = duration_ms as f64;
        Self::new(SESSION_STOP_EVENT_TYPE, stopped_at)
            .with_attribute(SESSION_ID_ATTRIBUTE_KEY, session.session_id.to_string())
            .with_attribute(SESSION_STOP_TIME_ATTRIBUTE_KEY, format_timestamp(stopped_at))
            .with_metric(SESSION_DURATION_METRIC_KEY, duration)
            .with_session(Some(SessionContext::from(session)))
    }

    /// `_session.pause` for the session that just paused.
    pub fn session_pause(session: &Session, paused_at: DateTime<Utc>) -> Self {
        Self::new(SESSION_PAUSE_EVENT_TYPE, paused_at)
            .with_attribute(SESSION_ID_ATTRIBUTE_KEY, session.session_id.to_string())
            .with_session(Some(SessionContext::from(session)))
    }

    /// `_session.resume` for the session that just resumed.
    pub fn session_resume(session: &Session, resumed_at: DateTime<Utc>) -> Self {
        Self::new(SESSION_RESUME_EVENT_TYPE, resumed_at)
            .with_attribute(SESSION_ID_ATTRIBUTE_KEY, session.session_id.to_string())
            .with_session(Some(SessionContext::from(session)))
    }
}

/// RFC 3339, UTC, millisecond precision.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use pretty_assertions::assert_eq;

    fn t0() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-03-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_start_event_payload() {
        let session = Session::start(t0());
        let event = AnalyticsEvent::session_start(&session);

        assert_eq!(event.event_type, "_session.start");
        assert_eq!(
            event.attribute("_session.id"),
            Some(session.session_id.to_string().as_str())
        );
        assert_eq!(
            event.attribute("_session.startTime"),
            Some("2024-03-01T12:00:00.000Z")
        );
        assert!(event.metrics.is_empty());
        assert_eq!(event.session.map(|c| c.session_id), Some(session.session_id));
    }

    #[test]
    fn test_stop_event_payload() {
        let session = Session::start(t0());
        let stopped_at = t0() + Duration::milliseconds(1500);
        let event = AnalyticsEvent::session_stop(&session, stopped_at, 1500);

        assert_eq!(event.event_type, "_session.stop");
        assert_eq!(
            event.attribute("_session.stopTime"),
            Some("2024-03-01T12:00:01.500Z")
        );
        assert_eq!(event.metric("_session.duration"), Some(1500.0));
        assert_eq!(event.attributes.len(), 2);
    }

    #[test]
    fn test_pause_and_resume_carry_only_id() {
        let session = Session::start(t0());
        let pause = AnalyticsEvent::session_pause(&session, t0());
        let resume = AnalyticsEvent::session_resume(&session, t0());

        assert_eq!(pause.event_type, "_session.pause");
        assert_eq!(resume.event_type, "_session.resume");
        assert_eq!(pause.attributes.len(), 1);
        assert_eq!(resume.attributes.len(), 1);
        assert!(pause.is_session_event());
    }

    #[test]
    fn test_custom_event_builder() {
        let event = AnalyticsEvent::new("level.complete", t0())
            .with_attribute("level", "3")
            .with_metric("score", 42.0);

        assert!(!event.is_session_event());
        assert_eq!(event.attribute("level"), Some("3"));
        assert_eq!(event.metric("score"), Some(42.0));
        assert!(event.session.is_none());
    }
}
