// ABOUTME: Event sinks that receive lifecycle and application events from the session manager
// Emission is fire-and-forget: sinks must not block the caller

use crate::models::AnalyticsEvent;
use crate::session::error::SinkError;
use tokio::sync::mpsc;
use tracing::info;

/// Destination for analytics events.
///
/// Session attribution travels on the event itself (`AnalyticsEvent::session`).
#[cfg_attr(test, mockall::automock)]
pub trait EventSink: Send + Sync {
    /// Deliver or enqueue `event` without blocking.
    fn emit(&self, event: &AnalyticsEvent) -> Result<(), SinkError>;
}

/// Hands events to an unbounded tokio channel for an async consumer to deliver.
#[derive(Debug, Clone)]
pub struct ChannelEventSink {
    sender: mpsc::UnboundedSender<AnalyticsEvent>,
}

impl ChannelEventSink {
    /// Sink plus the receiving end the consumer drains.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<AnalyticsEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl EventSink for ChannelEventSink {
    fn emit(&self, event: &AnalyticsEvent) -> Result<(), SinkError> {
        self.sender
            .send(event.clone())
            .map_err(|_| SinkError::Closed)
    }
}

/// Writes every event to the tracing log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn emit(&self, event: &AnalyticsEvent) -> Result<(), SinkError> {
        let session_id = event
            .session
            .map(|c| c.session_id.to_string())
            .unwrap_or_else(|| "-".to_string());
        info!(
            event_type = %event.event_type,
            session = %session_id,
            "event attributes={:?} metrics={:?}",
            event.attributes,
            event.metrics
        );
        Ok(())
    }
}
