
fn main() {
    println!("Run `cargo test -p menu-lifecycle` to execute menu lifecycle tests.");
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    use tokio::sync::mpsc;
    use tokio::time::timeout;

    use tooltray_menu::{
        DEFAULT_ICON, ItemKind, Menu, MenuConfig, MenuError, MenuItem,
    };

    use crate::mock::{EntryKind, MockBackend, Shared};

    const BUDGET: Duration = Duration::from_secs(1);
    /// Probe window for asserting that nothing further is delivered.
    const SILENCE: Duration = Duration::from_millis(200);

    fn config(title: &str) -> MenuConfig {
        MenuConfig {
            title: title.into(),
            tooltip: format!("{title} tooltip"),
            icon: Vec::new(),
        }
    }

    /// Menu wired to a fresh mock backend with both outputs supplied.
    #[allow(clippy::type_complexity)]
    fn wired(
        title: &str,
    ) -> (
        Menu<MockBackend>,
        Arc<Shared>,
        mpsc::Receiver<MenuItem>,
        mpsc::Receiver<()>,
    ) {
        let (backend, shared) = MockBackend::new();
        let (clicked_tx, clicked_rx) = mpsc::channel(8);
        let (exited_tx, exited_rx) = mpsc::channel(1);
        let menu = Menu::new(backend, config(title), Some(clicked_tx), Some(exited_tx));
        (menu, shared, clicked_rx, exited_rx)
    }

    /// Waits until the backend holds `count` entries, i.e. the ready
    /// walk has finished building the tree.
    async fn ready(shared: &Shared, count: usize) {
        timeout(BUDGET, async {
            while shared.entry_count() < count {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap_or_else(|_| {
            panic!(
                "backend never reached {count} entries (has {})",
                shared.entry_count()
            )
        });
    }

    #[tokio::test]
    async fn backend_tree_matches_insertions_in_order() {
        let (menu, shared, _clicked, _exited) = wired("App");
        let reports = menu.add_item("Reports", "report menu");
        menu.add_item_under(reports, "Daily", "daily report");
        menu.add_separator_under(reports);
        menu.add_checkbox_item_under(reports, "Weekly", "weekly report", false);
        menu.add_checkbox_item("Enabled", "toggle", true);
        menu.add_separator();
        menu.add_quit_item("Quit", "bye");
        menu.start().unwrap();

        // Pre-seeded title item + separator, the six entries above,
        // and the sub-tree of Reports: 9 total, depth-first pre-order.
        ready(&shared, 9).await;
        let entries = shared.entries.lock().unwrap();
        let got: Vec<_> = entries
            .iter()
            .map(|e| (e.title.as_str(), e.kind, e.parent, e.checked))
            .collect();
        assert_eq!(
            got,
            vec![
                ("App", EntryKind::Item, None, false),
                ("", EntryKind::Separator, None, false),
                ("Reports", EntryKind::Item, None, false),
                ("Daily", EntryKind::Item, Some(2), false),
                ("", EntryKind::Separator, Some(2), false),
                ("Weekly", EntryKind::Checkbox, Some(2), false),
                ("Enabled", EntryKind::Checkbox, None, true),
                ("", EntryKind::Separator, None, false),
                ("Quit", EntryKind::Item, None, false),
            ]
        );
        assert_eq!(entries[2].tooltip, "report menu");
        assert_eq!(entries[8].tooltip, "bye");
    }

    #[tokio::test]
    async fn title_tooltip_and_custom_icon_reach_the_backend() {
        let (backend, shared) = MockBackend::new();
        let cfg = MenuConfig {
            icon: vec![9, 9, 9],
            ..config("App")
        };
        let menu = Menu::new(backend, cfg, None, None);
        menu.start().unwrap();
        ready(&shared, 3).await;

        assert_eq!(*shared.title.lock().unwrap(), "App");
        assert_eq!(*shared.tooltip.lock().unwrap(), "App tooltip");
        assert_eq!(*shared.icon.lock().unwrap(), vec![9, 9, 9]);
    }

    #[tokio::test]
    async fn empty_icon_falls_back_to_default_end_to_end() {
        let (menu, shared, _clicked, _exited) = wired("App");
        menu.start().unwrap();
        ready(&shared, 3).await;
        assert_eq!(*shared.icon.lock().unwrap(), DEFAULT_ICON);
    }

    #[tokio::test]
    async fn clicking_an_item_delivers_it_and_menu_keeps_running() {
        let (menu, shared, mut clicked, mut exited) = wired("App");
        menu.add_item("Hello", "hi");
        menu.start().unwrap();
        ready(&shared, 4).await;

        for _ in 0..2 {
            shared.click("Hello");
            let item = timeout(BUDGET, clicked.recv()).await.unwrap().unwrap();
            assert_eq!(item.title, "Hello");
            assert_eq!(item.kind, ItemKind::Clickable);
        }
        // Still running: no exit was signaled.
        assert!(exited.try_recv().is_err());
    }

    #[tokio::test]
    async fn clicking_a_nested_item_delivers_it() {
        let (menu, shared, mut clicked, _exited) = wired("App");
        let parent = menu.add_item("Parent", "");
        menu.add_checkbox_item_under(parent, "Child", "", true);
        menu.start().unwrap();
        ready(&shared, 5).await;

        shared.click("Child");
        let item = timeout(BUDGET, clicked.recv()).await.unwrap().unwrap();
        assert_eq!(item.title, "Child");
        assert_eq!(item.kind, ItemKind::Checkbox);
        assert!(item.checked);
    }

    #[tokio::test]
    async fn clicking_quit_delivers_click_then_exit_then_silence() {
        let (menu, shared, mut clicked, mut exited) = wired("App");
        menu.start().unwrap();
        // Title item, separator, auto-created quit.
        ready(&shared, 3).await;

        shared.click("Quit");
        let item = timeout(BUDGET, clicked.recv()).await.unwrap().unwrap();
        assert_eq!(item.kind, ItemKind::Quit);
        assert_eq!(item.title, "Quit");
        timeout(BUDGET, exited.recv())
            .await
            .expect("exit should follow the quit click")
            .unwrap();
        timeout(BUDGET, menu.wait()).await.unwrap();
        assert_eq!(shared.shutdown_calls.load(Ordering::Relaxed), 1);

        // The dispatcher is gone: nothing is ever delivered again.
        shared.click("Quit");
        assert!(timeout(SILENCE, clicked.recv()).await.is_err());
        assert!(timeout(SILENCE, exited.recv()).await.is_err());
    }

    #[tokio::test]
    async fn stop_fires_exited_exactly_once() {
        let (menu, shared, _clicked, mut exited) = wired("App");
        menu.start().unwrap();
        ready(&shared, 3).await;

        menu.stop().unwrap();
        timeout(BUDGET, exited.recv()).await.unwrap().unwrap();
        assert!(matches!(menu.stop(), Err(MenuError::AlreadyStopped)));
        assert!(timeout(SILENCE, exited.recv()).await.is_err());
        assert_eq!(shared.shutdown_calls.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn stopping_a_two_level_tree_terminates_within_budget() {
        let (menu, shared, _clicked, _exited) = wired("App");
        let parent = menu.add_item("Parent", "");
        menu.add_item_under(parent, "Child", "");
        menu.add_separator_under(parent);
        menu.start().unwrap();
        // Pre-seeded pair, parent with two children, auto-created quit.
        ready(&shared, 6).await;

        timeout(BUDGET, async {
            menu.stop().unwrap();
            menu.wait().await;
        })
        .await
        .expect("stop should not deadlock");
    }

    #[tokio::test]
    async fn platform_loop_exit_stops_the_menu() {
        let (menu, shared, _clicked, mut exited) = wired("App");
        menu.start().unwrap();
        ready(&shared, 3).await;

        shared.exit_event_loop();
        timeout(BUDGET, exited.recv()).await.unwrap().unwrap();
        assert!(matches!(menu.stop(), Err(MenuError::AlreadyStopped)));
    }

    #[tokio::test]
    async fn run_returns_after_quit_click() {
        let (menu, shared, mut clicked, _exited) = wired("App");
        let handle = {
            let menu = menu.clone();
            tokio::spawn(async move { menu.run().await })
        };
        ready(&shared, 3).await;

        shared.click("Quit");
        timeout(BUDGET, clicked.recv()).await.unwrap().unwrap();
        timeout(BUDGET, handle)
            .await
            .expect("run should return after quit")
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn startup_is_invoked_once() {
        let (menu, shared, _clicked, _exited) = wired("App");
        menu.start().unwrap();
        assert!(matches!(menu.start(), Err(MenuError::AlreadyStarted)));
        assert_eq!(shared.startup_calls.load(Ordering::Relaxed), 1);
    }
}
