//! StatusNotifierItem backend (Linux)
//!
//! ksni pulls the whole tray description from us whenever it refreshes, so the
//! backend keeps its own copy of the menu in a [`MenuModel`] and rebuilds the
//! ksni menu tree from it on demand.

use crate::error::{Result, TrayError};
use crate::events::{lock, EventBridge};
use crate::menu::{EntryKind, MenuModel, MenuNode, NativeMenuItem};
use crate::native::NativeBackend;
use ksni::blocking::TrayMethods;
use ksni::menu::{CheckmarkItem, MenuItem, StandardItem, SubMenu};
use std::sync::{Arc, Condvar, Mutex};
use tracing::{debug, error, info, warn};

/// Themed icon shown until the caller sets one
const FALLBACK_ICON_NAME: &str = "application-x-executable";

/// Internal state of the tray icon.
pub struct SniState {
    pub tray_id: String,
    pub title: String,
    pub tooltip: String,
    pub icon_name: String,
    pub icon_pixmap: Vec<ksni::Icon>,
    pub menu: MenuModel,
    pub bridge: Option<Arc<EventBridge>>,
}

impl SniState {
    fn new(tray_id: String) -> Self {
        Self {
            tray_id,
            title: String::new(),
            tooltip: String::new(),
            icon_name: FALLBACK_ICON_NAME.to_string(),
            icon_pixmap: Vec::new(),
            menu: MenuModel::new(),
            bridge: None,
        }
    }

    /// Builds the ksni menu structure from the stored menu.
    fn build_menu_items(&self) -> Vec<MenuItem<SniTray>> {
        self.menu
            .tree()
            .iter()
            .filter_map(|node| self.build_menu_item(node))
            .collect()
    }

    fn build_menu_item(&self, node: &MenuNode) -> Option<MenuItem<SniTray>> {
        let entry = &node.entry;
        let item = match &entry.kind {
            EntryKind::Separator => {
                return entry.visible.then_some(MenuItem::Separator);
            }
            EntryKind::Item(item) => item,
        };
        let icon_data = entry.icon.clone().unwrap_or_default();

        if !node.children.is_empty() {
            return Some(
                SubMenu {
                    label: item.title.clone(),
                    enabled: !item.is_disabled(),
                    visible: entry.visible,
                    icon_data,
                    submenu: node
                        .children
                        .iter()
                        .filter_map(|child| self.build_menu_item(child))
                        .collect(),
                    ..Default::default()
                }
                .into(),
            );
        }

        let id = entry.id;
        let bridge = self.bridge.clone();
        let activate = Box::new(move |_this: &mut SniTray| {
            if let Some(ref bridge) = bridge {
                bridge.menu_item_selected(id);
            }
        });

        if item.is_checkable() {
            Some(
                CheckmarkItem {
                    label: item.title.clone(),
                    enabled: !item.is_disabled(),
                    visible: entry.visible,
                    checked: item.is_checked(),
                    icon_data,
                    activate,
                    ..Default::default()
                }
                .into(),
            )
        } else {
            Some(
                StandardItem {
                    label: item.title.clone(),
                    enabled: !item.is_disabled(),
                    visible: entry.visible,
                    icon_data,
                    activate,
                    ..Default::default()
                }
                .into(),
            )
        }
    }
}

/// Implementation of the ksni::Tray trait over the shared state.
pub struct SniTray {
    state: Arc<Mutex<SniState>>,
}

impl ksni::Tray for SniTray {
    fn id(&self) -> String {
        lock(&self.state).tray_id.clone()
    }

    fn title(&self) -> String {
        lock(&self.state).title.clone()
    }

    fn icon_name(&self) -> String {
        let state = lock(&self.state);
        if state.icon_pixmap.is_empty() {
            state.icon_name.clone()
        } else {
            String::new()
        }
    }

    fn icon_pixmap(&self) -> Vec<ksni::Icon> {
        lock(&self.state).icon_pixmap.clone()
    }

    fn tool_tip(&self) -> ksni::ToolTip {
        let state = lock(&self.state);
        ksni::ToolTip {
            icon_name: String::new(),
            icon_pixmap: Vec::new(),
            title: state.tooltip.clone(),
            description: String::new(),
        }
    }

    fn menu(&self) -> Vec<MenuItem<Self>> {
        lock(&self.state).build_menu_items()
    }
}

pub struct KsniBackend {
    state: Arc<Mutex<SniState>>,
    handle: Mutex<Option<ksni::blocking::Handle<SniTray>>>,
    quit_requested: Mutex<bool>,
    quit_signal: Condvar,
}

impl KsniBackend {
    pub fn new(tray_id: &str) -> Self {
        Self {
            state: Arc::new(Mutex::new(SniState::new(tray_id.to_string()))),
            handle: Mutex::new(None),
            quit_requested: Mutex::new(false),
            quit_signal: Condvar::new(),
        }
    }

    /// Mutate the state, then ask ksni to re-read it.
    fn with_state<F: FnOnce(&mut SniState)>(&self, f: F) {
        f(&mut lock(&self.state));

        if let Some(handle) = lock(&self.handle).as_ref() {
            handle.update(|_tray: &mut SniTray| {});
        }
    }

    fn bridge(&self) -> Option<Arc<EventBridge>> {
        lock(&self.state).bridge.clone()
    }

    fn spawn(&self) -> Result<()> {
        let mut handle = lock(&self.handle);
        if handle.is_some() {
            return Ok(());
        }

        let tray = SniTray {
            state: self.state.clone(),
        };
        let h = tray
            .spawn()
            .map_err(|e| TrayError::Backend(format!("failed to spawn tray: {}", e)))?;
        info!("StatusNotifierItem registered");
        *handle = Some(h);
        Ok(())
    }

    fn shutdown(&self) {
        let handle = lock(&self.handle).take();
        if let Some(handle) = handle {
            handle.shutdown().wait();
            debug!("StatusNotifierItem shut down");
        }
    }
}

impl NativeBackend for KsniBackend {
    fn name(&self) -> &'static str {
        "ksni"
    }

    fn register(&self, bridge: Arc<EventBridge>) {
        lock(&self.state).bridge = Some(bridge);
    }

    fn native_loop(&self) {
        if let Err(e) = self.spawn() {
            error!("{}", e);
            if let Some(bridge) = self.bridge() {
                bridge.exit();
            }
            return;
        }
        if let Some(bridge) = self.bridge() {
            bridge.ready();
        }

        let mut quit = lock(&self.quit_requested);
        while !*quit {
            quit = self
                .quit_signal
                .wait(quit)
                .unwrap_or_else(std::sync::PoisonError::into_inner);
        }
        drop(quit);

        self.native_end();
    }

    fn native_start(&self) {
        if let Err(e) = self.spawn() {
            error!("{}", e);
            return;
        }
        if let Some(bridge) = self.bridge() {
            bridge.ready();
        }
    }

    fn native_end(&self) {
        self.shutdown();
        if let Some(bridge) = self.bridge() {
            bridge.exit();
        }
    }

    fn quit(&self) {
        *lock(&self.quit_requested) = true;
        self.quit_signal.notify_all();
    }

    fn set_icon(&self, icon: &[u8], _template: bool) {
        match decode_pixmap(icon) {
            Some(pixmap) => self.with_state(|state| state.icon_pixmap = vec![pixmap]),
            None => {
                warn!("Tray icon could not be decoded, keeping themed icon");
                self.with_state(|state| state.icon_pixmap.clear());
            }
        }
    }

    fn set_title(&self, title: &str) {
        self.with_state(|state| state.title = title.to_string());
    }

    fn set_tooltip(&self, tooltip: &str) {
        self.with_state(|state| state.tooltip = tooltip.to_string());
    }

    fn set_menu_item_icon(&self, icon: &[u8], id: u32, _template: bool) {
        self.with_state(|state| {
            if !state.menu.set_icon(id, icon) {
                debug!("Icon for unknown menu item {} ignored", id);
            }
        });
    }

    fn add_or_update_menu_item(&self, item: &NativeMenuItem) {
        self.with_state(|state| state.menu.add_or_update(item));
    }

    fn add_separator(&self, id: u32, parent_id: u32) {
        self.with_state(|state| state.menu.add_separator(id, parent_id));
    }

    fn hide_menu_item(&self, id: u32) {
        self.with_state(|state| {
            state.menu.set_visible(id, false);
        });
    }

    fn show_menu_item(&self, id: u32) {
        self.with_state(|state| {
            state.menu.set_visible(id, true);
        });
    }

    fn remove_menu_item(&self, id: u32) {
        self.with_state(|state| {
            state.menu.remove(id);
        });
    }

    fn reset_menu(&self) {
        self.with_state(|state| state.menu.reset());
    }
}

/// Decode an encoded image into the ARGB32 pixmap SNI hosts expect.
fn decode_pixmap(bytes: &[u8]) -> Option<ksni::Icon> {
    let image = match image::load_from_memory(bytes) {
        Ok(image) => image.to_rgba8(),
        Err(e) => {
            debug!("Icon decode failed: {}", e);
            return None;
        }
    };

    let (width, height) = image.dimensions();
    let mut data = image.into_raw();
    // Convert RGBA to ARGB for ksni
    for pixel in data.chunks_exact_mut(4) {
        pixel.rotate_right(1);
    }

    Some(ksni::Icon {
        width: width as i32,
        height: height as i32,
        data,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::menu::MenuItem as TrayMenuItem;
    use image::{ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    fn png(width: u32, height: u32, color: [u8; 4]) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba(color));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn test_decode_pixmap_converts_to_argb() {
        let icon = decode_pixmap(&png(2, 3, [10, 20, 30, 255])).unwrap();
        assert_eq!((icon.width, icon.height), (2, 3));
        assert_eq!(&icon.data[..4], &[255, 10, 20, 30]);
        assert_eq!(icon.data.len(), 2 * 3 * 4);
    }

    #[test]
    fn test_decode_pixmap_rejects_garbage() {
        assert!(decode_pixmap(b"not an image").is_none());
    }

    #[test]
    fn test_menu_tree_shapes() {
        let backend = KsniBackend::new("traylink-test");
        let parent = TrayMenuItem::new(1, "More").unwrap();
        let child = TrayMenuItem::new(2, "Nested").unwrap().with_parent(1);
        let toggle = TrayMenuItem::new(3, "Toggle").unwrap().checkable(true);

        backend.add_or_update_menu_item(&parent.to_native());
        backend.add_or_update_menu_item(&child.to_native());
        backend.add_separator(4, 0);
        backend.add_or_update_menu_item(&toggle.to_native());
        backend.hide_menu_item(4);

        let items = lock(&backend.state).build_menu_items();
        assert_eq!(items.len(), 2);
        assert!(matches!(items[0], MenuItem::SubMenu(_)));
        assert!(matches!(items[1], MenuItem::Checkmark(_)));
    }

    #[test]
    fn test_activation_reaches_bridge() {
        let backend = KsniBackend::new("traylink-test");
        let bridge = Arc::new(EventBridge::new());
        backend.register(bridge.clone());
        let mut clicks = bridge.register_item(9);

        backend.add_or_update_menu_item(&TrayMenuItem::new(9, "Ping").unwrap().to_native());
        let items = lock(&backend.state).build_menu_items();

        let mut tray = SniTray {
            state: backend.state.clone(),
        };
        match &items[0] {
            MenuItem::Standard(item) => (item.activate)(&mut tray),
            _ => panic!("expected a standard item"),
        }
        assert!(clicks.try_recv().is_ok());
    }
}
