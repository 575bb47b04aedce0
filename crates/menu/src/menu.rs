//! Menu lifecycle, dispatcher task, and backend event handling.
//!
//! A [`Menu`] owns the item tree and two background tasks spawned at
//! start: the dispatcher, which turns fan-in clicks and the shutdown
//! trigger into the caller's Clicked/Exited outputs, and the
//! controller, which consumes backend lifecycle events (ready/exit)
//! and quit-item requests. Start succeeds at most once, stop succeeds
//! at most once, and the dispatcher terminates exactly once.

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::backend::{BackendEvent, TrayBackend};
use crate::error::MenuError;
use crate::icon::DEFAULT_ICON;
use crate::item::{ItemId, ItemKind, ListenerCtx, MenuItem, Tree};

/// Construction-time configuration.
///
/// Empty `icon` bytes resolve to the embedded default icon when the
/// menu is built.
#[derive(Debug, Clone, Default)]
pub struct MenuConfig {
    pub title: String,
    pub tooltip: String,
    pub icon: Vec<u8>,
}

/// Tree plus lifecycle flags, guarded by one lock. The tree is only
/// mutated before start and once more at backend ready (from the
/// controller task); everything else reads.
struct MenuState<E> {
    tree: Tree<E>,
    started: bool,
    stopped: bool,
}

/// Receiving halves handed to the background tasks at start. Taken as
/// one unit, which doubles as the start-at-most-once guard.
struct TaskChannels {
    fan_in: mpsc::Receiver<MenuItem>,
    trigger: mpsc::Receiver<()>,
    quit_requests: mpsc::Receiver<()>,
}

struct MenuInner<B: TrayBackend> {
    title: String,
    tooltip: String,
    icon: Vec<u8>,
    backend: B,
    state: Mutex<MenuState<B::Entry>>,
    channels: Mutex<Option<TaskChannels>>,
    /// Fan-in click channel all item listeners send into (cap 1).
    fan_in_tx: mpsc::Sender<MenuItem>,
    /// Single-slot shutdown trigger consumed by the dispatcher.
    trigger_tx: mpsc::Sender<()>,
    /// Single-slot quit request fired by the quit item's listener.
    quit_tx: mpsc::Sender<()>,
    /// Caller-supplied outputs. A missing output means those events
    /// are dropped.
    clicked: Option<mpsc::Sender<MenuItem>>,
    exited: Option<mpsc::Sender<()>>,
    /// Flips to true when the dispatcher terminates; `wait` subscribes.
    done_tx: watch::Sender<bool>,
}

/// A hierarchical tray menu.
///
/// Cheaply cloneable handle; clones share one menu. Items are added
/// before [`start`](Menu::start); after start the tree is frozen
/// (further additions are a contract violation with undefined effect).
///
/// Callers that supply a Clicked or Exited output commit to draining
/// it: the dispatcher sends without a timeout, so an undrained output
/// stalls click delivery.
pub struct Menu<B: TrayBackend> {
    inner: Arc<MenuInner<B>>,
}

impl<B: TrayBackend> Clone for Menu<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<B: TrayBackend> Menu<B> {
    /// Builds a menu over `backend` with a title item and a separator
    /// pre-inserted, resolving an empty icon to the embedded default.
    pub fn new(
        backend: B,
        config: MenuConfig,
        clicked: Option<mpsc::Sender<MenuItem>>,
        exited: Option<mpsc::Sender<()>>,
    ) -> Self {
        let icon = if config.icon.is_empty() {
            DEFAULT_ICON.to_vec()
        } else {
            config.icon
        };

        let (fan_in_tx, fan_in_rx) = mpsc::channel(1);
        let (trigger_tx, trigger_rx) = mpsc::channel(1);
        let (quit_tx, quit_rx) = mpsc::channel(1);
        let (done_tx, _) = watch::channel(false);

        let mut tree = Tree::new();
        tree.insert(
            None,
            ItemKind::Clickable,
            &config.title,
            &config.tooltip,
            false,
        );
        tree.insert(None, ItemKind::Separator, "", "", false);

        Self {
            inner: Arc::new(MenuInner {
                title: config.title,
                tooltip: config.tooltip,
                icon,
                backend,
                state: Mutex::new(MenuState {
                    tree,
                    started: false,
                    stopped: false,
                }),
                channels: Mutex::new(Some(TaskChannels {
                    fan_in: fan_in_rx,
                    trigger: trigger_rx,
                    quit_requests: quit_rx,
                })),
                fan_in_tx,
                trigger_tx,
                quit_tx,
                clicked,
                exited,
                done_tx,
            }),
        }
    }

    pub fn title(&self) -> &str {
        &self.inner.title
    }

    pub fn tooltip(&self) -> &str {
        &self.inner.tooltip
    }

    /// Icon bytes as resolved at construction.
    pub fn icon(&self) -> &[u8] {
        &self.inner.icon
    }

    /// Snapshot of one item.
    pub fn item(&self, id: ItemId) -> Option<MenuItem> {
        self.state().tree.item(id).cloned()
    }

    /// Id of the designated quit item, if one was added (or
    /// auto-created at ready).
    pub fn quit_item_id(&self) -> Option<ItemId> {
        self.state().tree.quit_id()
    }

    /// Adds a top-level clickable item.
    pub fn add_item(&self, title: &str, tooltip: &str) -> ItemId {
        self.state()
            .tree
            .insert(None, ItemKind::Clickable, title, tooltip, false)
    }

    /// Adds a top-level checkbox item with an initial checked state.
    pub fn add_checkbox_item(&self, title: &str, tooltip: &str, checked: bool) -> ItemId {
        self.state()
            .tree
            .insert(None, ItemKind::Checkbox, title, tooltip, checked)
    }

    /// Adds a top-level separator.
    pub fn add_separator(&self) {
        self.state()
            .tree
            .insert(None, ItemKind::Separator, "", "", false);
    }

    /// Adds the top-level quit item and records its id.
    pub fn add_quit_item(&self, title: &str, tooltip: &str) -> ItemId {
        self.state()
            .tree
            .insert(None, ItemKind::Quit, title, tooltip, false)
    }

    /// Adds a clickable item to `parent`'s sub-menu.
    pub fn add_item_under(&self, parent: ItemId, title: &str, tooltip: &str) -> ItemId {
        self.state()
            .tree
            .insert(Some(parent), ItemKind::Clickable, title, tooltip, false)
    }

    /// Adds a checkbox item to `parent`'s sub-menu.
    pub fn add_checkbox_item_under(
        &self,
        parent: ItemId,
        title: &str,
        tooltip: &str,
        checked: bool,
    ) -> ItemId {
        self.state()
            .tree
            .insert(Some(parent), ItemKind::Checkbox, title, tooltip, checked)
    }

    /// Adds a separator to `parent`'s sub-menu.
    pub fn add_separator_under(&self, parent: ItemId) {
        self.state()
            .tree
            .insert(Some(parent), ItemKind::Separator, "", "", false);
    }

    /// Adds the quit item to `parent`'s sub-menu and records its id.
    pub fn add_quit_item_under(&self, parent: ItemId, title: &str, tooltip: &str) -> ItemId {
        self.state()
            .tree
            .insert(Some(parent), ItemKind::Quit, title, tooltip, false)
    }

    /// Spawns the dispatcher and controller tasks and begins backend
    /// startup. Fails with [`MenuError::AlreadyStarted`] on any call
    /// after the first. Returns once the tasks are launched; does not
    /// wait for the tray to become visible.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&self) -> Result<(), MenuError> {
        let Some(channels) = self
            .inner
            .channels
            .lock()
            .expect("menu channels lock poisoned")
            .take()
        else {
            return Err(MenuError::AlreadyStarted);
        };
        debug!(title = %self.inner.title, "menu starting");

        tokio::spawn(dispatch(
            channels.fan_in,
            channels.trigger,
            self.inner.clicked.clone(),
            self.inner.exited.clone(),
            self.inner.done_tx.clone(),
        ));

        let (events_tx, events_rx) = mpsc::channel(4);
        tokio::spawn(control(self.clone(), events_rx, channels.quit_requests));

        // Started before the backend hook runs, so backend events that
        // arrive during startup already see a startable-to-stoppable
        // menu.
        self.state().started = true;

        if let Err(e) = self.inner.backend.startup(events_tx) {
            warn!(error = %e, "backend startup failed");
            // Tear the dispatcher back down so the failed start leaks
            // no task, and close the lifecycle for good.
            self.state().stopped = true;
            let _ = self.inner.trigger_tx.try_send(());
            return Err(e.into());
        }

        info!(title = %self.inner.title, "menu started");
        Ok(())
    }

    /// Stops the menu: signals every item's shutdown slot depth-first
    /// pre-order, requests backend shutdown, and fires the dispatcher's
    /// shutdown trigger. Fails with [`MenuError::NeverStarted`] or
    /// [`MenuError::AlreadyStopped`]. A backend shutdown error is
    /// returned after local teardown has completed.
    pub fn stop(&self) -> Result<(), MenuError> {
        {
            let mut state = self.state();
            if !state.started {
                return Err(MenuError::NeverStarted);
            }
            if state.stopped {
                return Err(MenuError::AlreadyStopped);
            }
            debug!(title = %self.inner.title, "menu stopping");
            state.stopped = true;
            state.tree.stop_all();
        }

        let res = self.inner.backend.shutdown();
        let _ = self.inner.trigger_tx.try_send(());
        info!(title = %self.inner.title, "menu stopped");
        res.map_err(MenuError::from)
    }

    /// Blocks until the dispatcher task has terminated. Callable from
    /// any number of tasks; does not itself trigger shutdown.
    pub async fn wait(&self) {
        let mut done = self.inner.done_tx.subscribe();
        let _ = done.wait_for(|done| *done).await;
    }

    /// [`start`](Menu::start) followed by [`wait`](Menu::wait),
    /// propagating the start error.
    pub async fn run(&self) -> Result<(), MenuError> {
        self.start()?;
        self.wait().await;
        Ok(())
    }

    fn state(&self) -> MutexGuard<'_, MenuState<B::Entry>> {
        self.inner.state.lock().expect("menu state lock poisoned")
    }

    /// Stop on behalf of a background task; lifecycle errors from
    /// overlapping shutdown paths are expected and ignored.
    fn stop_if_running(&self) {
        match self.stop() {
            Ok(()) => {}
            Err(MenuError::AlreadyStopped | MenuError::NeverStarted) => {}
            Err(e) => warn!(error = %e, "backend-driven stop failed"),
        }
    }

    /// Installs title/tooltip/icon, ensures a quit item exists, and
    /// walks the tree creating one backend entry per node and one
    /// listener task per actionable node.
    fn on_ready(&self) {
        let inner = &self.inner;
        let mut state = self.state();
        if state.stopped {
            debug!("backend ready after stop, ignoring");
            return;
        }
        debug!(title = %inner.title, "backend ready");

        inner.backend.set_title(&inner.title);
        inner.backend.set_tooltip(&inner.tooltip);
        inner.backend.set_icon(&inner.icon);

        if state.tree.quit_id().is_none() {
            let tooltip = format!("Shutdown {}", inner.title);
            state.tree.insert(None, ItemKind::Quit, "Quit", &tooltip, false);
        }

        let ctx = ListenerCtx {
            fan_in: inner.fan_in_tx.clone(),
            quit_requests: inner.quit_tx.clone(),
            quit_id: state.tree.quit_id(),
        };
        for id in state.tree.roots().to_vec() {
            let Some(item) = state.tree.item(id).cloned() else {
                continue;
            };
            match item.kind {
                ItemKind::Clickable | ItemKind::Quit => {
                    let entry = inner.backend.add_entry(&item.title, &item.tooltip);
                    state.tree.start_subtree(id, entry, &ctx);
                }
                ItemKind::Checkbox => {
                    let entry =
                        inner
                            .backend
                            .add_checkbox_entry(&item.title, &item.tooltip, item.checked);
                    state.tree.start_subtree(id, entry, &ctx);
                }
                ItemKind::Separator => inner.backend.add_separator(),
            }
        }
        info!(title = %inner.title, "tray menu ready");
    }
}

/// The dispatcher: the single task that turns internal click and
/// shutdown signals into the two public outputs. Services one event
/// per iteration and terminates permanently on the shutdown trigger.
async fn dispatch(
    mut clicks: mpsc::Receiver<MenuItem>,
    mut trigger: mpsc::Receiver<()>,
    clicked: Option<mpsc::Sender<MenuItem>>,
    exited: Option<mpsc::Sender<()>>,
    done: watch::Sender<bool>,
) {
    debug!("dispatcher started");
    loop {
        // Biased toward clicks: a click already accepted into the
        // fan-in is forwarded before a pending shutdown trigger is
        // honored, so a quit click is never lost to the shutdown it
        // causes.
        tokio::select! {
            biased;
            Some(item) = clicks.recv() => {
                debug!(id = %item.id, title = %item.title, "dispatching click");
                match &clicked {
                    Some(out) => {
                        if out.send(item).await.is_err() {
                            debug!("clicked output closed, dropping click");
                        }
                    }
                    None => debug!("no clicked output, dropping click"),
                }
            }
            _ = trigger.recv() => {
                if let Some(out) = &exited {
                    if out.send(()).await.is_err() {
                        debug!("exited output closed");
                    }
                }
                let _ = done.send(true);
                debug!("dispatcher exiting");
                return;
            }
        }
    }
}

/// The controller: consumes backend lifecycle events and quit-item
/// requests, translating them into on-ready tree construction and
/// stop calls.
async fn control<B: TrayBackend>(
    menu: Menu<B>,
    mut events: mpsc::Receiver<BackendEvent>,
    mut quit_requests: mpsc::Receiver<()>,
) {
    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(BackendEvent::Ready) => menu.on_ready(),
                Some(BackendEvent::Exit) => {
                    debug!("backend exited");
                    menu.stop_if_running();
                    return;
                }
                None => {
                    debug!("backend event channel closed");
                    return;
                }
            },
            Some(()) = quit_requests.recv() => {
                debug!("quit item requested shutdown");
                menu.stop_if_running();
            }
        }
    }
}
