// ABOUTME: Event delivery for session lifecycle and attributed application events

/// Sink trait and implementations.
pub mod sink;

pub use sink::{ChannelEventSink, EventSink, TracingEventSink};
