//! Platform-independent tray API
//!
//! [`Tray`] owns the menu tree, hands out ids and forwards every change to a
//! [`NativeBackend`]. Menu entries are manipulated through cloneable
//! [`MenuItemHandle`]s.

use crate::error::{Result, TrayError};
use crate::events::{lock, EventBridge, Handler};
use crate::menu::{MenuItem, Separator, MAX_MENU_ITEM_ID, ROOT_PARENT_ID};
use crate::native::NativeBackend;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, Once};
use tokio::sync::mpsc;
use tracing::{debug, info};

/// A menu entry the backend currently knows about
struct LiveItem {
    parent: u32,
    shared: Arc<ItemShared>,
}

struct TrayInner {
    backend: Arc<dyn NativeBackend>,
    bridge: Arc<EventBridge>,
    next_id: AtomicU32,
    quit_once: Once,
    // Held across every menu call to the backend so removal cannot interleave
    // with an update of the same entry.
    items: Mutex<HashMap<u32, LiveItem>>,
}

impl TrayInner {
    fn allocate_id(&self) -> Result<u32> {
        self.next_id
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |id| {
                (id <= MAX_MENU_ITEM_ID).then_some(id + 1)
            })
            .map_err(|_| TrayError::MenuItemIdsExhausted)
    }

    /// Forget `root` and everything nested under it. Returns how many entries
    /// were dropped.
    fn detach(&self, items: &mut HashMap<u32, LiveItem>, root: u32) -> usize {
        let mut pending = vec![root];
        let mut dropped = 0;

        while let Some(id) = pending.pop() {
            if let Some(live) = items.remove(&id) {
                live.shared.removed.store(true, Ordering::Relaxed);
                self.bridge.unregister_item(id);
                dropped += 1;
            }
            pending.extend(
                items
                    .iter()
                    .filter(|(_, live)| live.parent == id)
                    .map(|(&child, _)| child),
            );
        }

        dropped
    }
}

/// Handle to the system tray
#[derive(Clone)]
pub struct Tray {
    inner: Arc<TrayInner>,
}

/// Closure returned by [`Tray::run_with_external_loop`]
pub type LoopControl = Box<dyn FnOnce() + Send + 'static>;

impl Tray {
    pub fn new(backend: Arc<dyn NativeBackend>) -> Self {
        info!("Creating system tray on {} backend", backend.name());
        Self {
            inner: Arc::new(TrayInner {
                backend,
                bridge: Arc::new(EventBridge::new()),
                next_id: AtomicU32::new(1),
                quit_once: Once::new(),
                items: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Create a tray on the platform's native backend
    pub fn with_default_backend(app_id: &str) -> Self {
        Self::new(crate::native::create_backend(app_id))
    }

    /// Install lifecycle handlers and register with the native shell.
    pub fn register<R, E>(&self, on_ready: Option<R>, on_exit: Option<E>)
    where
        R: FnOnce() + Send + 'static,
        E: FnOnce() + Send + 'static,
    {
        let on_ready = on_ready.map(|f| Box::new(f) as Handler);
        let on_exit = on_exit.map(|f| Box::new(f) as Handler);
        self.inner.bridge.set_handlers(on_ready, on_exit);
        self.inner.backend.register(self.inner.bridge.clone());
    }

    /// Run the native event loop on the current thread until [`Tray::quit`].
    ///
    /// On macOS this must be the main thread.
    pub fn run<R, E>(&self, on_ready: R, on_exit: E)
    where
        R: FnOnce() + Send + 'static,
        E: FnOnce() + Send + 'static,
    {
        self.inner.backend.set_internal_loop(true);
        self.register(Some(on_ready), Some(on_exit));

        info!("Starting system tray event loop");
        self.inner.backend.native_loop();
        info!("Tray event loop exited");
    }

    /// Register with a shell whose event loop is driven elsewhere.
    ///
    /// Returns `(start, end)`: call `start` once the outer loop is running and
    /// `end` to tear the tray down.
    pub fn run_with_external_loop<R, E>(
        &self,
        on_ready: R,
        on_exit: E,
    ) -> (LoopControl, LoopControl)
    where
        R: FnOnce() + Send + 'static,
        E: FnOnce() + Send + 'static,
    {
        self.inner.backend.set_internal_loop(false);
        self.register(Some(on_ready), Some(on_exit));

        let start_backend = self.inner.backend.clone();
        let start: LoopControl = Box::new(move || start_backend.native_start());

        let tray = self.clone();
        let end: LoopControl = Box::new(move || {
            tray.inner.backend.native_end();
            tray.quit();
        });

        (start, end)
    }

    /// Stop the tray. Only the first call reaches the native shell.
    pub fn quit(&self) {
        self.inner.quit_once.call_once(|| {
            info!("Quitting system tray");
            self.inner.backend.quit();
        });
    }

    /// Receiver signalled (at most one pending signal) when the menu opens.
    ///
    /// Only the first call gets the receiver.
    pub fn tray_opened(&self) -> Option<mpsc::Receiver<()>> {
        self.inner.bridge.take_tray_opened()
    }

    /// Set the tray icon from encoded image bytes (.ico/.jpg/.png).
    pub fn set_icon(&self, icon: &[u8]) -> Result<()> {
        ensure_icon(icon)?;
        self.inner.backend.set_icon(icon, false);
        Ok(())
    }

    /// Set the tray icon from a file.
    pub fn set_icon_from_file_path(&self, path: impl AsRef<Path>) -> Result<()> {
        let icon = read_icon(path.as_ref())?;
        self.set_icon(&icon)
    }

    /// Use a template icon where the shell supports it, the regular icon
    /// elsewhere.
    pub fn set_template_icon(&self, template: &[u8], regular: &[u8]) -> Result<()> {
        if self.inner.backend.supports_template_icons() {
            ensure_icon(template)?;
            self.inner.backend.set_icon(template, true);
            Ok(())
        } else {
            self.set_icon(regular)
        }
    }

    /// Text shown next to the icon (macOS and Linux).
    pub fn set_title(&self, title: &str) {
        debug!("Tray title set to {:?}", title);
        self.inner.backend.set_title(title);
    }

    /// Text shown on hover.
    pub fn set_tooltip(&self, tooltip: &str) {
        self.inner.backend.set_tooltip(tooltip);
    }

    /// Whether the user may remove the icon from the menu bar (macOS only).
    pub fn set_removal_allowed(&self, allowed: bool) {
        self.inner.backend.set_removal_allowed(allowed);
    }

    pub fn add_menu_item(&self, title: &str, tooltip: &str) -> Result<MenuItemHandle> {
        MenuItemHandle::create(self.inner.clone(), ROOT_PARENT_ID, title, tooltip, None)
    }

    pub fn add_menu_item_checkbox(
        &self,
        title: &str,
        tooltip: &str,
        checked: bool,
    ) -> Result<MenuItemHandle> {
        MenuItemHandle::create(
            self.inner.clone(),
            ROOT_PARENT_ID,
            title,
            tooltip,
            Some(checked),
        )
    }

    /// Append a separator to the top-level menu.
    pub fn add_separator(&self) -> Result<Separator> {
        let separator = Separator {
            id: self.inner.allocate_id()?,
            parent_id: ROOT_PARENT_ID,
        };
        let _live = lock(&self.inner.items);
        self.inner
            .backend
            .add_separator(separator.id, separator.parent_id);
        Ok(separator)
    }

    /// Remove every menu entry. Existing handles become inert.
    pub fn reset_menu(&self) {
        let mut items = lock(&self.inner.items);
        for (_, live) in items.drain() {
            live.shared.removed.store(true, Ordering::Relaxed);
        }
        self.inner.bridge.clear_items();
        self.inner.backend.reset_menu();
    }
}

struct ItemShared {
    item: Mutex<MenuItem>,
    clicked: Mutex<Option<mpsc::Receiver<()>>>,
    removed: AtomicBool,
}

/// A menu entry owned by a [`Tray`]
///
/// Once the entry is removed (by [`MenuItemHandle::remove`] on it or an
/// ancestor, or by [`Tray::reset_menu`]) the handle no longer talks to the
/// native shell.
#[derive(Clone)]
pub struct MenuItemHandle {
    tray: Arc<TrayInner>,
    id: u32,
    shared: Arc<ItemShared>,
}

impl MenuItemHandle {
    fn create(
        tray: Arc<TrayInner>,
        parent: u32,
        title: &str,
        tooltip: &str,
        checked: Option<bool>,
    ) -> Result<Self> {
        let id = tray.allocate_id()?;
        let mut item = MenuItem::new(id, title)?
            .with_parent(parent)
            .with_tooltip(tooltip);
        if let Some(checked) = checked {
            item = item.checkable(checked);
        }
        let native = item.to_native();

        let mut items = lock(&tray.items);
        if parent != ROOT_PARENT_ID && !items.contains_key(&parent) {
            return Err(TrayError::MenuItemRemoved(parent));
        }

        let shared = Arc::new(ItemShared {
            item: Mutex::new(item),
            clicked: Mutex::new(Some(tray.bridge.register_item(id))),
            removed: AtomicBool::new(false),
        });
        items.insert(
            id,
            LiveItem {
                parent,
                shared: shared.clone(),
            },
        );
        tray.backend.add_or_update_menu_item(&native);
        drop(items);

        Ok(Self { tray, id, shared })
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    /// Copy of the entry's current attributes
    pub fn item(&self) -> MenuItem {
        lock(&self.shared.item).clone()
    }

    pub fn title(&self) -> String {
        lock(&self.shared.item).title.clone()
    }

    pub fn tooltip(&self) -> String {
        lock(&self.shared.item).tooltip.clone()
    }

    pub fn is_checked(&self) -> bool {
        lock(&self.shared.item).checked
    }

    pub fn is_disabled(&self) -> bool {
        lock(&self.shared.item).disabled
    }

    pub fn is_removed(&self) -> bool {
        self.shared.removed.load(Ordering::Relaxed)
    }

    /// Receiver signalled when the entry is clicked. Only the first call
    /// gets it; clicks arriving while one is pending are dropped.
    pub fn clicked(&self) -> Option<mpsc::Receiver<()>> {
        lock(&self.shared.clicked).take()
    }

    pub fn set_title(&self, title: &str) {
        self.modify(|item| item.title = title.to_string());
    }

    pub fn set_tooltip(&self, tooltip: &str) {
        self.modify(|item| item.tooltip = tooltip.to_string());
    }

    pub fn check(&self) {
        self.modify(|item| item.checked = true);
    }

    pub fn uncheck(&self) {
        self.modify(|item| item.checked = false);
    }

    pub fn enable(&self) {
        self.modify(|item| item.disabled = false);
    }

    pub fn disable(&self) {
        self.modify(|item| item.disabled = true);
    }

    pub fn hide(&self) {
        self.forward("hide", |backend| backend.hide_menu_item(self.id));
    }

    pub fn show(&self) {
        self.forward("show", |backend| backend.show_menu_item(self.id));
    }

    /// Remove the entry (and anything nested under it) from the menu.
    pub fn remove(&self) {
        let mut items = lock(&self.tray.items);
        if self.is_removed() {
            return;
        }
        let dropped = self.tray.detach(&mut items, self.id);
        self.tray.backend.remove_menu_item(self.id);
        debug!("Removed menu item {} ({} entries)", self.id, dropped);
    }

    pub fn add_sub_menu_item(&self, title: &str, tooltip: &str) -> Result<MenuItemHandle> {
        MenuItemHandle::create(self.tray.clone(), self.id, title, tooltip, None)
    }

    pub fn add_sub_menu_item_checkbox(
        &self,
        title: &str,
        tooltip: &str,
        checked: bool,
    ) -> Result<MenuItemHandle> {
        MenuItemHandle::create(self.tray.clone(), self.id, title, tooltip, Some(checked))
    }

    /// Append a separator inside this entry's submenu.
    pub fn add_separator(&self) -> Result<Separator> {
        let separator = Separator {
            id: self.tray.allocate_id()?,
            parent_id: self.id,
        };
        let added = self.forward("add separator", |backend| {
            backend.add_separator(separator.id, separator.parent_id)
        });
        if !added {
            return Err(TrayError::MenuItemRemoved(self.id));
        }
        Ok(separator)
    }

    /// Set the entry's icon (macOS and Linux).
    pub fn set_icon(&self, icon: &[u8]) -> Result<()> {
        ensure_icon(icon)?;
        self.forward("set icon", |backend| {
            backend.set_menu_item_icon(icon, self.id, false)
        });
        Ok(())
    }

    pub fn set_icon_from_file_path(&self, path: impl AsRef<Path>) -> Result<()> {
        let icon = read_icon(path.as_ref())?;
        self.set_icon(&icon)
    }

    /// Template icon on macOS, the regular icon elsewhere.
    pub fn set_template_icon(&self, template: &[u8], regular: &[u8]) -> Result<()> {
        if self.tray.backend.supports_template_icons() {
            ensure_icon(template)?;
            self.forward("set template icon", |backend| {
                backend.set_menu_item_icon(template, self.id, true)
            });
            Ok(())
        } else {
            self.set_icon(regular)
        }
    }

    fn modify<F: FnOnce(&mut MenuItem)>(&self, f: F) {
        f(&mut lock(&self.shared.item));
        self.forward("update", |backend| {
            let native = lock(&self.shared.item).to_native();
            backend.add_or_update_menu_item(&native);
        });
    }

    /// Run a backend call for this entry unless it has been removed.
    fn forward<F: FnOnce(&dyn NativeBackend)>(&self, action: &str, f: F) -> bool {
        let _live = lock(&self.tray.items);
        if self.is_removed() {
            debug!("Ignoring {} on removed menu item {}", action, self.id);
            return false;
        }
        f(self.tray.backend.as_ref());
        true
    }
}

fn ensure_icon(icon: &[u8]) -> Result<()> {
    if icon.is_empty() {
        return Err(TrayError::EmptyIcon);
    }
    Ok(())
}

fn read_icon(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|source| TrayError::IconRead {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::native::MemoryBackend;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    fn tray() -> (Tray, Arc<MemoryBackend>) {
        tray_on(MemoryBackend::new())
    }

    fn tray_on(backend: MemoryBackend) -> (Tray, Arc<MemoryBackend>) {
        let backend = Arc::new(backend);
        let tray = Tray::new(backend.clone());
        tray.register(None::<fn()>, None::<fn()>);
        (tray, backend)
    }

    fn scratch_file(name: &str, contents: &[u8]) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!(
            "traylink-tray-{}-{}",
            std::process::id(),
            name
        ));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_icon_from_missing_file_fails() {
        let (tray, backend) = tray();
        let missing = std::env::temp_dir().join("traylink-definitely-missing-icon.png");

        let err = tray.set_icon_from_file_path(&missing).unwrap_err();
        assert!(matches!(err, TrayError::IconRead { ref path, .. } if *path == missing));
        assert!(backend.snapshot().icon.is_none());

        let item = tray.add_menu_item("Open", "").unwrap();
        assert!(item.set_icon_from_file_path(&missing).is_err());
    }

    #[test]
    fn test_icon_from_readable_file_succeeds() {
        let (tray, backend) = tray();
        let path = scratch_file("icon.png", &[0x89, b'P', b'N', b'G']);

        tray.set_icon_from_file_path(&path).unwrap();
        assert_eq!(
            backend.snapshot().icon.as_deref(),
            Some(&[0x89, b'P', b'N', b'G'][..])
        );

        let item = tray.add_menu_item("Open", "").unwrap();
        item.set_icon_from_file_path(&path).unwrap();
        let state = backend.snapshot();
        assert!(state.menu.get(item.id()).unwrap().icon.is_some());

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_empty_icon_is_rejected() {
        let (tray, backend) = tray();
        assert!(matches!(tray.set_icon(&[]), Err(TrayError::EmptyIcon)));
        assert!(matches!(
            tray.set_template_icon(&[], &[1]),
            Err(TrayError::EmptyIcon)
        ));
        assert!(backend.snapshot().icon.is_none());
    }

    #[test]
    fn test_template_icon_goes_to_capable_backend() {
        let (tray, backend) = tray();
        tray.set_template_icon(&[1, 1], &[2, 2]).unwrap();
        let state = backend.snapshot();
        assert_eq!(state.icon.as_deref(), Some(&[1u8, 1][..]));
        assert!(state.icon_is_template);

        let item = tray.add_menu_item("Open", "").unwrap();
        item.set_template_icon(&[1, 1], &[2, 2]).unwrap();
        let state = backend.snapshot();
        assert_eq!(state.item_icon_is_template.get(&item.id()), Some(&true));
    }

    #[test]
    fn test_template_icon_falls_back_to_regular() {
        let (tray, backend) = tray_on(MemoryBackend::without_template_icons());

        tray.set_template_icon(&[1, 1], &[2, 2]).unwrap();
        let state = backend.snapshot();
        assert_eq!(state.icon.as_deref(), Some(&[2u8, 2][..]));
        assert!(!state.icon_is_template);

        let item = tray.add_menu_item("Open", "").unwrap();
        item.set_template_icon(&[1, 1], &[3, 3]).unwrap();
        let state = backend.snapshot();
        assert_eq!(
            state.menu.get(item.id()).unwrap().icon.as_deref(),
            Some(&[3u8, 3][..])
        );
        assert_eq!(state.item_icon_is_template.get(&item.id()), Some(&false));

        // Only the regular buffer matters without template support
        assert!(matches!(
            tray.set_template_icon(&[1], &[]),
            Err(TrayError::EmptyIcon)
        ));
        assert!(matches!(
            item.set_template_icon(&[1], &[]),
            Err(TrayError::EmptyIcon)
        ));
        assert_eq!(backend.snapshot().icon.as_deref(), Some(&[2u8, 2][..]));
    }

    #[test]
    fn test_item_updates_keep_single_entry() {
        let (tray, backend) = tray();
        let item = tray.add_menu_item("Connect", "Connect to server").unwrap();
        item.set_title("Disconnect");
        item.disable();
        item.set_tooltip("Drop the connection");

        let state = backend.snapshot();
        assert_eq!(state.menu.len(), 1);
        let native = state.menu.get(item.id()).unwrap().item().unwrap().clone();
        assert_eq!(native.title, "Disconnect");
        assert_eq!(native.tooltip, "Drop the connection");
        assert_eq!(native.disabled, 1);
        assert_eq!(native.checkable, 0);
    }

    #[test]
    fn test_checkbox_state_is_forwarded() {
        let (tray, backend) = tray();
        let item = tray.add_menu_item_checkbox("Autostart", "", true).unwrap();
        assert!(item.is_checked());

        item.uncheck();
        let native = backend
            .snapshot()
            .menu
            .get(item.id())
            .unwrap()
            .item()
            .unwrap()
            .clone();
        assert_eq!((native.checked, native.checkable), (0, 1));
    }

    #[test]
    fn test_ids_are_unique_and_nonzero() {
        let (tray, _backend) = tray();
        let a = tray.add_menu_item("A", "").unwrap();
        tray.add_separator().unwrap();
        let b = tray.add_menu_item("B", "").unwrap();
        let c = b.add_sub_menu_item("C", "").unwrap();
        assert!(a.id() != 0);
        assert!(a.id() < b.id() && b.id() < c.id());
    }

    #[test]
    fn test_ids_stop_at_native_maximum() {
        let (tray, backend) = tray();
        tray.inner
            .next_id
            .store(MAX_MENU_ITEM_ID, Ordering::Relaxed);

        let last = tray.add_menu_item("Last", "").unwrap();
        assert_eq!(last.id(), MAX_MENU_ITEM_ID);
        assert!(matches!(
            tray.add_menu_item("One too many", ""),
            Err(TrayError::MenuItemIdsExhausted)
        ));
        assert!(matches!(
            tray.add_separator(),
            Err(TrayError::MenuItemIdsExhausted)
        ));

        let state = backend.snapshot();
        assert_eq!(state.menu.len(), 1);
        assert_eq!(
            state.menu.get(last.id()).unwrap().item().unwrap().id,
            i32::MAX
        );
    }

    #[test]
    fn test_submenu_and_remove() {
        let (tray, backend) = tray();
        let more = tray.add_menu_item("More", "").unwrap();
        let child = more.add_sub_menu_item("Child", "").unwrap();
        let separator = more.add_separator().unwrap();
        assert_eq!(separator.parent_id, more.id());
        let _quit = tray.add_menu_item("Quit", "").unwrap();

        let state = backend.snapshot();
        assert_eq!(state.menu.get(child.id()).unwrap().parent_id, more.id());
        assert_eq!(state.menu.tree()[0].children.len(), 2);

        more.remove();
        assert_eq!(backend.snapshot().menu.len(), 1);
        assert!(backend.snapshot().menu.get(child.id()).is_none());
        assert!(!backend.click(more.id()));
        assert!(!backend.click(child.id()));
    }

    #[test]
    fn test_removed_item_stays_removed() {
        let (tray, backend) = tray();
        let item = tray.add_menu_item("Ephemeral", "").unwrap();
        item.remove();
        assert!(item.is_removed());

        item.set_title("Back?");
        item.check();
        item.show();
        item.set_icon(&[1]).unwrap();

        let state = backend.snapshot();
        assert!(state.menu.is_empty());
        assert!(!backend.click(item.id()));
        assert!(matches!(
            item.add_sub_menu_item("Orphan", ""),
            Err(TrayError::MenuItemRemoved(id)) if id == item.id()
        ));
        assert!(matches!(
            item.add_separator(),
            Err(TrayError::MenuItemRemoved(_))
        ));
        assert!(backend.snapshot().menu.is_empty());
    }

    #[test]
    fn test_children_of_removed_item_stay_removed() {
        let (tray, backend) = tray();
        let more = tray.add_menu_item("More", "").unwrap();
        let child = more.add_sub_menu_item_checkbox("Child", "", false).unwrap();
        let grandchild = child.add_sub_menu_item("Grandchild", "").unwrap();
        let mut child_clicks = child.clicked().unwrap();

        more.remove();
        assert!(child.is_removed() && grandchild.is_removed());

        child.check();
        grandchild.set_title("Still here?");

        let state = backend.snapshot();
        assert!(state.menu.get(child.id()).is_none());
        assert!(state.menu.get(grandchild.id()).is_none());
        assert!(!backend.click(child.id()));
        // Click sender was dropped with the entry
        assert!(matches!(
            child_clicks.try_recv(),
            Err(mpsc::error::TryRecvError::Disconnected)
        ));
    }

    #[test]
    fn test_removing_a_child_keeps_its_parent() {
        let (tray, backend) = tray();
        let more = tray.add_menu_item("More", "").unwrap();
        let child = more.add_sub_menu_item("Child", "").unwrap();

        child.remove();
        child.remove();
        more.set_title("Less");

        let state = backend.snapshot();
        assert_eq!(state.menu.len(), 1);
        assert_eq!(
            state.menu.get(more.id()).unwrap().item().unwrap().title,
            "Less"
        );
        assert!(more.add_sub_menu_item("Another", "").is_ok());
    }

    #[test]
    fn test_hide_and_show() {
        let (tray, backend) = tray();
        let item = tray.add_menu_item("Secret", "").unwrap();
        item.hide();
        assert!(!backend.snapshot().menu.get(item.id()).unwrap().visible);
        item.show();
        assert!(backend.snapshot().menu.get(item.id()).unwrap().visible);
    }

    #[test]
    fn test_click_reaches_item_channel() {
        let (tray, backend) = tray();
        let item = tray.add_menu_item("Ping", "").unwrap();
        let mut clicks = item.clicked().unwrap();
        assert!(item.clicked().is_none());

        assert!(backend.click(item.id()));
        assert!(clicks.try_recv().is_ok());
        assert!(!backend.click(9999));
    }

    #[test]
    fn test_reset_menu_clears_entries_and_clicks() {
        let (tray, backend) = tray();
        let item = tray.add_menu_item("One", "").unwrap();
        tray.add_separator().unwrap();
        tray.reset_menu();

        assert!(backend.snapshot().menu.is_empty());
        assert!(!backend.click(item.id()));

        item.enable();
        item.hide();
        assert!(item.is_removed());
        assert!(backend.snapshot().menu.is_empty());

        let fresh = tray.add_menu_item("Two", "").unwrap();
        assert!(!fresh.is_removed());
        assert_eq!(backend.snapshot().menu.len(), 1);
    }

    #[test]
    fn test_tray_opened_signal() {
        let (tray, backend) = tray();
        let mut opened = tray.tray_opened().unwrap();
        backend.open_menu();
        backend.open_menu();
        assert!(opened.try_recv().is_ok());
        assert!(opened.try_recv().is_err());
    }

    #[test]
    fn test_quit_reaches_backend_once() {
        let (tray, backend) = tray();
        tray.quit();
        tray.quit();
        tray.clone().quit();
        assert_eq!(backend.snapshot().quit_calls, 1);
    }

    #[test]
    fn test_run_fires_ready_and_exit() {
        let backend = Arc::new(MemoryBackend::new());
        let tray = Tray::new(backend.clone());
        let exits = Arc::new(AtomicUsize::new(0));
        let (ready_tx, ready_rx) = std::sync::mpsc::channel();

        let quitter = tray.clone();
        let exit_count = exits.clone();
        tray.run(
            move || {
                let _ = ready_tx.send(());
                quitter.quit();
            },
            move || {
                exit_count.fetch_add(1, Ordering::SeqCst);
            },
        );

        assert!(ready_rx.recv_timeout(Duration::from_secs(5)).is_ok());
        assert_eq!(exits.load(Ordering::SeqCst), 1);
        let state = backend.snapshot();
        assert!(state.internal_loop);
        assert!(state.registered);
    }

    #[test]
    fn test_external_loop_start_and_end() {
        let backend = Arc::new(MemoryBackend::new());
        let tray = Tray::new(backend.clone());
        let (ready_tx, ready_rx) = std::sync::mpsc::channel();
        let exited = Arc::new(AtomicUsize::new(0));
        let exit_count = exited.clone();

        let (start, end) = tray.run_with_external_loop(
            move || {
                let _ = ready_tx.send(());
            },
            move || {
                exit_count.fetch_add(1, Ordering::SeqCst);
            },
        );
        assert!(!backend.snapshot().internal_loop);

        start();
        assert!(ready_rx.recv_timeout(Duration::from_secs(5)).is_ok());

        end();
        assert_eq!(exited.load(Ordering::SeqCst), 1);
        assert_eq!(backend.snapshot().quit_calls, 1);
    }
}
