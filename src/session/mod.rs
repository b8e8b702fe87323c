// ABOUTME: Session lifecycle module: state machine, manager and persistence
// Provides start/stop/pause/resume tracking with recovery across process restarts

/// Error types.
pub mod error;
/// The lifecycle manager.
pub mod manager;
/// Session stores.
pub mod persistence;
/// Pure transition function.
pub mod state;

pub use error::{SessionError, SinkError, StoreError};
pub use manager::{Recovery, SessionLifecycleManager, SessionLifecycleManagerBuilder};
pub use persistence::{FileSessionStore, MemorySessionStore, SessionStore};
pub use state::{transition, Effect, Operation, Transition};
