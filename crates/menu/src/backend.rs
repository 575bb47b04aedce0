//! Tray backend adapter interface.
//!
//! The menu core never talks to the OS directly. A [`TrayBackend`]
//! implementation owns the platform event loop and the native tray
//! entries; the core drives it through these traits and receives
//! lifecycle notifications back over a channel.

use tokio::sync::mpsc;

use crate::error::BackendError;

/// Lifecycle notifications from the backend's event loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendEvent {
    /// The platform loop is up. Sent exactly once, before any UI is
    /// presented; the menu installs title/tooltip/icon and builds the
    /// native entry tree when it observes this.
    Ready,
    /// The platform loop ended (e.g. user-initiated OS-level close).
    /// The menu stops itself if not already stopped.
    Exit,
}

/// Platform tray implementation driven by [`Menu`](crate::Menu).
///
/// `startup` must eventually send [`BackendEvent::Ready`] on the given
/// channel and [`BackendEvent::Exit`] when its loop ends. The core
/// makes no assumption about which task sends them.
pub trait TrayBackend: Send + Sync + 'static {
    /// Handle to one native menu entry.
    type Entry: TrayEntry;

    /// Begins the platform event loop. Invoked once by `Menu::start`.
    fn startup(&self, events: mpsc::Sender<BackendEvent>) -> Result<(), BackendError>;

    /// Requests the platform event loop terminate. Invoked once by
    /// `Menu::stop`.
    fn shutdown(&self) -> Result<(), BackendError>;

    fn set_title(&self, title: &str);

    fn set_tooltip(&self, tooltip: &str);

    fn set_icon(&self, data: &[u8]);

    /// Creates an actionable top-level entry.
    fn add_entry(&self, title: &str, tooltip: &str) -> Self::Entry;

    /// Creates a top-level checkbox entry with an initial checked state.
    fn add_checkbox_entry(&self, title: &str, tooltip: &str, checked: bool) -> Self::Entry;

    /// Creates a non-actionable top-level divider.
    fn add_separator(&self);
}

/// One native menu entry: a click notification source plus the
/// capability to create bound child entries under it.
pub trait TrayEntry: Send + 'static {
    /// Takes this entry's click notification channel.
    ///
    /// The core calls this exactly once per actionable entry, when the
    /// entry's listener task starts.
    fn take_clicked(&mut self) -> mpsc::Receiver<()>;

    /// Creates an actionable child entry in this entry's sub-menu.
    fn add_child(&mut self, title: &str, tooltip: &str) -> Self
    where
        Self: Sized;

    /// Creates a checkbox child entry in this entry's sub-menu.
    fn add_checkbox_child(&mut self, title: &str, tooltip: &str, checked: bool) -> Self
    where
        Self: Sized;

    /// Creates a divider in this entry's sub-menu.
    fn add_separator_child(&mut self);
}
