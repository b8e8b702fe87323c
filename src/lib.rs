// ABOUTME: Library crate for Session-in-a-Box exposing the session lifecycle API for embedding and testing

//! Application session tracking across start, stop, pause and resume.

/// Injectable wall clock.
pub mod clock;
/// Session timing configuration.
pub mod config;
/// Event sinks.
pub mod events;
/// Session and event records.
pub mod models;
/// Lifecycle state machine, manager and stores.
pub mod session;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{AppConfig, SessionConfig};
pub use events::{ChannelEventSink, EventSink, TracingEventSink};
pub use models::{AnalyticsEvent, Session, SessionContext, SessionState};
pub use session::{
    FileSessionStore, MemorySessionStore, Recovery, SessionError, SessionLifecycleManager, SessionStore,
};
