//! Menu items, the item arena, and per-item listener tasks.
//!
//! Items live in a flat arena owned by the menu and are addressed by
//! [`ItemId`] (the arena index). Parent/child structure is kept as id
//! lists, never as embedded references, so items created dynamically
//! need no lifetime plumbing. Each actionable item gets a listener
//! task at start that bridges backend click notifications into the
//! menu's shared fan-in channel and owns the receiving half of the
//! item's single-slot shutdown channel.

use std::fmt;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::backend::TrayEntry;

/// Process-unique item identity, assigned sequentially by the owning
/// menu. Doubles as the index into the menu's item arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ItemId(pub(crate) usize);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// What kind of entry an item renders as and how it reacts to clicks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    /// Plain actionable entry.
    Clickable,
    /// Actionable entry with a checked state.
    Checkbox,
    /// Non-actionable divider. Never gets a listener task.
    Separator,
    /// Actionable entry whose click also shuts the whole menu down.
    Quit,
}

/// Snapshot of one menu item, delivered on the Clicked output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuItem {
    pub id: ItemId,
    pub kind: ItemKind,
    pub title: String,
    pub tooltip: String,
    /// Initial checked state; meaningful only for [`ItemKind::Checkbox`].
    pub checked: bool,
}

/// One arena slot: the item snapshot plus its tree links, shutdown
/// slot, and (after start) the bound backend entry.
pub(crate) struct ItemNode<E> {
    pub(crate) item: MenuItem,
    pub(crate) children: Vec<ItemId>,
    /// Sending half of this item's single-slot shutdown channel.
    shutdown_tx: mpsc::Sender<()>,
    /// Receiving half, taken by the listener task at start. Stays here
    /// for items that never start (separators, never-started menus);
    /// an unread signal in the slot is then benign.
    shutdown_rx: Option<mpsc::Receiver<()>>,
    /// Backend-native entry handle, bound at ready. Absent before start.
    entry: Option<E>,
}

/// Everything a listener task needs from its menu.
pub(crate) struct ListenerCtx {
    /// Shared fan-in channel all listeners send click events into.
    pub(crate) fan_in: mpsc::Sender<MenuItem>,
    /// Single-slot menu-level quit request, fired by the quit item.
    pub(crate) quit_requests: mpsc::Sender<()>,
    /// Id of the designated quit item, if any.
    pub(crate) quit_id: Option<ItemId>,
}

/// The item arena: flat node storage plus top-level ordering and the
/// recorded quit item.
pub(crate) struct Tree<E> {
    nodes: Vec<ItemNode<E>>,
    roots: Vec<ItemId>,
    quit_id: Option<ItemId>,
}

impl<E> Tree<E> {
    pub(crate) fn new() -> Self {
        Self {
            nodes: Vec::new(),
            roots: Vec::new(),
            quit_id: None,
        }
    }

    /// Inserts a new item under `parent` (top level when `None`),
    /// assigning the next sequential id. A quit item records its id on
    /// the tree; at most one quit item per menu is the caller contract.
    pub(crate) fn insert(
        &mut self,
        parent: Option<ItemId>,
        kind: ItemKind,
        title: &str,
        tooltip: &str,
        checked: bool,
    ) -> ItemId {
        let id = ItemId(self.nodes.len());
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        self.nodes.push(ItemNode {
            item: MenuItem {
                id,
                kind,
                title: title.to_string(),
                tooltip: tooltip.to_string(),
                checked,
            },
            children: Vec::new(),
            shutdown_tx,
            shutdown_rx: Some(shutdown_rx),
            entry: None,
        });
        if kind == ItemKind::Quit {
            self.quit_id = Some(id);
        }
        match parent {
            None => self.roots.push(id),
            Some(p) if p.0 < id.0 => self.nodes[p.0].children.push(id),
            Some(p) => {
                // Only reachable with an id from a different menu.
                warn!(parent = %p, id = %id, "unknown parent item, adding at top level");
                self.roots.push(id);
            }
        }
        id
    }

    pub(crate) fn roots(&self) -> &[ItemId] {
        &self.roots
    }

    pub(crate) fn quit_id(&self) -> Option<ItemId> {
        self.quit_id
    }

    pub(crate) fn item(&self, id: ItemId) -> Option<&MenuItem> {
        self.nodes.get(id.0).map(|n| &n.item)
    }

    /// Sends one shutdown signal to every node, depth-first pre-order
    /// from each top-level item. `try_send` into the single-slot
    /// channels: a slot that is already full (repeated stop, or the
    /// quit item's self-shutdown) is left as is.
    pub(crate) fn stop_all(&self) {
        for &id in &self.roots {
            self.stop_subtree(id);
        }
    }

    fn stop_subtree(&self, id: ItemId) {
        let node = &self.nodes[id.0];
        debug!(
            id = %id,
            title = %node.item.title,
            bound = node.entry.is_some(),
            "stopping item"
        );
        let _ = node.shutdown_tx.try_send(());
        for &child in &node.children {
            self.stop_subtree(child);
        }
    }

    #[cfg(test)]
    fn take_shutdown_rx(&mut self, id: ItemId) -> Option<mpsc::Receiver<()>> {
        self.nodes[id.0].shutdown_rx.take()
    }
}

impl<E: TrayEntry> Tree<E> {
    /// Binds `entry` to the item, spawns its listener task, and
    /// recursively starts its children as backend sub-entries of
    /// `entry`. Separator children are registered with the backend but
    /// spawn no listener.
    pub(crate) fn start_subtree(&mut self, id: ItemId, mut entry: E, ctx: &ListenerCtx) {
        let node = &mut self.nodes[id.0];
        debug!(id = %id, title = %node.item.title, "starting item");
        let Some(shutdown_rx) = node.shutdown_rx.take() else {
            warn!(id = %id, "item already started, skipping");
            return;
        };
        tokio::spawn(listen(
            node.item.clone(),
            ctx.quit_id == Some(id),
            entry.take_clicked(),
            shutdown_rx,
            node.shutdown_tx.clone(),
            ctx.fan_in.clone(),
            ctx.quit_requests.clone(),
        ));

        let children = self.nodes[id.0].children.clone();
        for child_id in children {
            let child = &self.nodes[child_id.0].item;
            match child.kind {
                ItemKind::Clickable | ItemKind::Quit => {
                    let child_entry = entry.add_child(&child.title, &child.tooltip);
                    self.start_subtree(child_id, child_entry, ctx);
                }
                ItemKind::Checkbox => {
                    let child_entry =
                        entry.add_checkbox_child(&child.title, &child.tooltip, child.checked);
                    self.start_subtree(child_id, child_entry, ctx);
                }
                ItemKind::Separator => entry.add_separator_child(),
            }
        }
        self.nodes[id.0].entry = Some(entry);
    }
}

/// Per-item listener: bridges backend click notifications into the
/// fan-in channel until the item's shutdown slot fires.
///
/// The quit item additionally shuts itself down after a click, and
/// asks the menu to stop. The fan-in send completes before either of
/// those signals is sent, so a quit click is never lost to the
/// shutdown it triggers.
async fn listen(
    item: MenuItem,
    is_quit: bool,
    mut clicked: mpsc::Receiver<()>,
    mut shutdown: mpsc::Receiver<()>,
    self_shutdown: mpsc::Sender<()>,
    fan_in: mpsc::Sender<MenuItem>,
    quit_requests: mpsc::Sender<()>,
) {
    debug!(id = %item.id, title = %item.title, "listener started");
    loop {
        // Shutdown is checked first so a pending self-shutdown wins
        // over any click that arrives after the quit click.
        tokio::select! {
            biased;
            _ = shutdown.recv() => {
                debug!(id = %item.id, title = %item.title, "listener exiting");
                return;
            }
            Some(()) = clicked.recv() => {
                debug!(id = %item.id, title = %item.title, "item clicked");
                if fan_in.send(item.clone()).await.is_err() {
                    debug!(id = %item.id, "fan-in closed, listener exiting");
                    return;
                }
                if is_quit {
                    let _ = self_shutdown.try_send(());
                    let _ = quit_requests.try_send(());
                }
            }
        }
    }
}
