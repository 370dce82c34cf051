//! Native event bridge
//!
//! Native shells report four things back: the tray is ready, the tray is going
//! away, a menu entry was activated, and the menu is about to open. Each
//! backend forwards those upcalls here, and the bridge hands them to whatever
//! the caller registered.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;
use tracing::{debug, error, info};

/// One-shot lifecycle handler
pub type Handler = Box<dyn FnOnce() + Send + 'static>;

pub struct EventBridge {
    on_ready: Mutex<Option<Handler>>,
    on_exit: Mutex<Option<Handler>>,
    clicked: Mutex<HashMap<u32, mpsc::Sender<()>>>,
    tray_opened_tx: mpsc::Sender<()>,
    tray_opened_rx: Mutex<Option<mpsc::Receiver<()>>>,
}

impl EventBridge {
    pub fn new() -> Self {
        let (tray_opened_tx, tray_opened_rx) = mpsc::channel(1);
        Self {
            on_ready: Mutex::new(None),
            on_exit: Mutex::new(None),
            clicked: Mutex::new(HashMap::new()),
            tray_opened_tx,
            tray_opened_rx: Mutex::new(Some(tray_opened_rx)),
        }
    }

    /// Install lifecycle handlers, replacing any that have not fired yet.
    pub fn set_handlers(&self, on_ready: Option<Handler>, on_exit: Option<Handler>) {
        *lock(&self.on_ready) = on_ready;
        *lock(&self.on_exit) = on_exit;
    }

    /// The native tray finished initialising.
    ///
    /// The ready handler runs on its own thread so it may block without
    /// stalling the native event loop.
    pub fn ready(&self) {
        info!("System tray ready");
        let Some(handler) = lock(&self.on_ready).take() else {
            return;
        };

        if let Err(e) = std::thread::Builder::new()
            .name("traylink-ready".to_string())
            .spawn(handler)
        {
            error!("Failed to spawn ready handler thread: {}", e);
        }
    }

    /// The native tray is tearing down. Runs the exit handler inline.
    pub fn exit(&self) {
        info!("System tray exiting");
        if let Some(handler) = lock(&self.on_exit).take() {
            handler();
        }
    }

    /// Open a click channel for a menu entry.
    ///
    /// Re-registering an id replaces the previous channel.
    pub fn register_item(&self, id: u32) -> mpsc::Receiver<()> {
        let (tx, rx) = mpsc::channel(1);
        lock(&self.clicked).insert(id, tx);
        rx
    }

    pub fn unregister_item(&self, id: u32) {
        lock(&self.clicked).remove(&id);
    }

    pub fn clear_items(&self) {
        lock(&self.clicked).clear();
    }

    /// A menu entry was activated.
    ///
    /// Ids the caller no longer knows about are ignored. Returns whether a
    /// click signal was queued.
    pub fn menu_item_selected(&self, id: u32) -> bool {
        let clicked = lock(&self.clicked);
        let Some(tx) = clicked.get(&id) else {
            debug!("Ignoring selection of unknown menu item {}", id);
            return false;
        };

        match tx.try_send(()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(())) => {
                debug!("Click on menu item {} coalesced with a pending one", id);
                false
            }
            Err(mpsc::error::TrySendError::Closed(())) => {
                debug!("Nobody listens for clicks on menu item {}", id);
                false
            }
        }
    }

    /// The tray menu is about to open.
    ///
    /// Never blocks: if the previous signal has not been consumed yet this
    /// one is dropped.
    pub fn menu_will_open(&self) {
        if self.tray_opened_tx.try_send(()).is_err() {
            debug!("Menu open signal dropped, previous one still pending");
        }
    }

    /// Take the receiving end of the menu-open signal. Only the first call
    /// gets it.
    pub fn take_tray_opened(&self) -> Option<mpsc::Receiver<()>> {
        lock(&self.tray_opened_rx).take()
    }
}

impl Default for EventBridge {
    fn default() -> Self {
        Self::new()
    }
}

/// Lock a mutex, carrying on with the inner value if a holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_menu_will_open_never_blocks() {
        let bridge = EventBridge::new();
        let mut rx = bridge.take_tray_opened().unwrap();

        // Nobody consumes: every call must return immediately.
        for _ in 0..100 {
            bridge.menu_will_open();
        }

        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());

        bridge.menu_will_open();
        assert!(rx.try_recv().is_ok());
    }

    #[test]
    fn test_menu_will_open_without_receiver() {
        let bridge = EventBridge::new();
        drop(bridge.take_tray_opened());
        bridge.menu_will_open();
        bridge.menu_will_open();
    }

    #[test]
    fn test_tray_opened_receiver_taken_once() {
        let bridge = EventBridge::new();
        assert!(bridge.take_tray_opened().is_some());
        assert!(bridge.take_tray_opened().is_none());
    }

    #[test]
    fn test_unknown_menu_item_is_ignored() {
        let bridge = EventBridge::new();
        assert!(!bridge.menu_item_selected(404));

        let rx = bridge.register_item(1);
        bridge.unregister_item(1);
        assert!(!bridge.menu_item_selected(1));
        drop(rx);
    }

    #[test]
    fn test_clicks_coalesce() {
        let bridge = EventBridge::new();
        let mut rx = bridge.register_item(5);

        assert!(bridge.menu_item_selected(5));
        assert!(!bridge.menu_item_selected(5));
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
        assert!(bridge.menu_item_selected(5));
    }

    #[test]
    fn test_exit_handler_runs_once() {
        let bridge = EventBridge::new();
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        bridge.set_handlers(
            None,
            Some(Box::new(move || {
                c.fetch_add(1, Ordering::SeqCst);
            })),
        );

        bridge.exit();
        bridge.exit();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_ready_handler_runs_off_thread() {
        let bridge = EventBridge::new();
        let (tx, rx) = std::sync::mpsc::channel();
        bridge.set_handlers(
            Some(Box::new(move || {
                let _ = tx.send(std::thread::current().name().map(str::to_string));
            })),
            None,
        );

        bridge.ready();
        let name = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(name.as_deref(), Some("traylink-ready"));
    }
}
