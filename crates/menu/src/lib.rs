//! Hierarchical, event-driven tray menu core.
//!
//! A [`Menu`] owns a tree of clickable items, checkboxes, separators,
//! and a quit item. Platform rendering is delegated to a
//! [`TrayBackend`] implementation; this crate owns the concurrency and
//! lifecycle coordination:
//! - one listener task per actionable item fans click notifications
//!   into a single ordered stream,
//! - a single dispatcher task forwards that stream to the caller's
//!   Clicked output and fires the Exited output on shutdown,
//! - one shutdown signal propagates depth-first through the whole tree,
//! - start succeeds at most once and stop succeeds at most once,
//!   without deadlock, double-close, or lost events.
//!
//! All coordination is message passing over `tokio` channels; no tree
//! state is shared mutably across tasks. Clicking the quit item both
//! reports the click and shuts the menu down, in that order.
//!
//! Callers supplying the Clicked or Exited output commit to draining
//! it; the dispatcher sends without timeouts.

mod backend;
mod error;
mod icon;
mod item;
mod menu;

pub use backend::{BackendEvent, TrayBackend, TrayEntry};
pub use error::{BackendError, MenuError};
pub use icon::DEFAULT_ICON;
pub use item::{ItemId, ItemKind, MenuItem};
pub use menu::{Menu, MenuConfig};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
