// ABOUTME: Core data models for session tracking: the session record and analytics events

/// Analytics events and session attribution.
pub mod event;
/// The session record and derived state.
pub mod session;

pub use event::{AnalyticsEvent, SessionContext};
pub use session::{Session, SessionState};
