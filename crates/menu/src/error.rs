//! Error types for menu lifecycle and backend calls.

/// Errors returned synchronously from menu lifecycle calls.
///
/// Every variant is terminal for that call: the state that produced it
/// does not change on its own, so retrying the same call yields the
/// same error. Background tasks never surface these asynchronously.
#[derive(Debug, thiserror::Error)]
pub enum MenuError {
    /// `start` was called on a menu that already started.
    #[error("menu already started")]
    AlreadyStarted,

    /// `stop` was called on a menu that never started.
    #[error("menu never started")]
    NeverStarted,

    /// `stop` was called on a menu that already stopped.
    #[error("menu already stopped")]
    AlreadyStopped,

    /// The tray backend failed during startup or shutdown.
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Errors produced by the platform tray backend.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("tray backend startup failed: {0}")]
    Startup(String),

    #[error("tray backend shutdown failed: {0}")]
    Shutdown(String),
}
