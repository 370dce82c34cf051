//! Headless backend that records what a native shell would have been told
//!
//! Used where no native tray exists and as the fake shell in tests.

use crate::events::{lock, EventBridge};
use crate::menu::{MenuModel, NativeMenuItem};
use crate::native::NativeBackend;
use std::collections::HashMap;
use std::sync::{Arc, Condvar, Mutex};
use tracing::debug;

/// Everything the headless shell has been told so far
#[derive(Debug, Clone, Default)]
pub struct MemoryState {
    pub icon: Option<Vec<u8>>,
    pub icon_is_template: bool,
    /// Template flag of the last icon set on each menu entry
    pub item_icon_is_template: HashMap<u32, bool>,
    pub title: String,
    pub tooltip: String,
    pub removal_allowed: bool,
    pub internal_loop: bool,
    pub registered: bool,
    pub quit_calls: usize,
    pub menu: MenuModel,
}

pub struct MemoryBackend {
    state: Mutex<MemoryState>,
    bridge: Mutex<Option<Arc<EventBridge>>>,
    quit_requested: Mutex<bool>,
    quit_signal: Condvar,
    template_icons: bool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MemoryState::default()),
            bridge: Mutex::new(None),
            quit_requested: Mutex::new(false),
            quit_signal: Condvar::new(),
            template_icons: true,
        }
    }

    /// Behave like a shell that cannot render template icons (Linux).
    pub fn without_template_icons() -> Self {
        Self {
            template_icons: false,
            ..Self::new()
        }
    }

    /// Copy of the recorded shell state
    pub fn snapshot(&self) -> MemoryState {
        lock(&self.state).clone()
    }

    /// Act as if the user picked a menu entry.
    pub fn click(&self, id: u32) -> bool {
        match self.bridge() {
            Some(bridge) => bridge.menu_item_selected(id),
            None => false,
        }
    }

    /// Act as if the user opened the tray menu.
    pub fn open_menu(&self) {
        if let Some(bridge) = self.bridge() {
            bridge.menu_will_open();
        }
    }

    fn bridge(&self) -> Option<Arc<EventBridge>> {
        lock(&self.bridge).clone()
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl NativeBackend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn register(&self, bridge: Arc<EventBridge>) {
        *lock(&self.bridge) = Some(bridge);
        lock(&self.state).registered = true;
    }

    fn set_internal_loop(&self, internal: bool) {
        lock(&self.state).internal_loop = internal;
    }

    fn native_loop(&self) {
        self.native_start();

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
        if let Some(bridge) = self.bridge() {
            bridge.ready();
        }
    }

    fn native_end(&self) {
        if let Some(bridge) = self.bridge() {
            bridge.exit();
        }
    }

    fn quit(&self) {
        lock(&self.state).quit_calls += 1;
        *lock(&self.quit_requested) = true;
        self.quit_signal.notify_all();
    }

    fn supports_template_icons(&self) -> bool {
        self.template_icons
    }

    fn set_icon(&self, icon: &[u8], template: bool) {
        let mut state = lock(&self.state);
        state.icon = Some(icon.to_vec());
        state.icon_is_template = template;
    }

    fn set_title(&self, title: &str) {
        lock(&self.state).title = title.to_string();
    }

    fn set_tooltip(&self, tooltip: &str) {
        lock(&self.state).tooltip = tooltip.to_string();
    }

    fn set_removal_allowed(&self, allowed: bool) {
        lock(&self.state).removal_allowed = allowed;
    }

    fn set_menu_item_icon(&self, icon: &[u8], id: u32, template: bool) {
        let mut state = lock(&self.state);
        if state.menu.set_icon(id, icon) {
            state.item_icon_is_template.insert(id, template);
        } else {
            debug!("Icon for unknown menu item {} ignored", id);
        }
    }

    fn add_or_update_menu_item(&self, item: &NativeMenuItem) {
        lock(&self.state).menu.add_or_update(item);
    }

    fn add_separator(&self, id: u32, parent_id: u32) {
        lock(&self.state).menu.add_separator(id, parent_id);
    }

    fn hide_menu_item(&self, id: u32) {
        if !lock(&self.state).menu.set_visible(id, false) {
            debug!("Hide of unknown menu item {} ignored", id);
        }
    }

    fn show_menu_item(&self, id: u32) {
        if !lock(&self.state).menu.set_visible(id, true) {
            debug!("Show of unknown menu item {} ignored", id);
        }
    }

    fn remove_menu_item(&self, id: u32) {
        lock(&self.state).menu.remove(id);
    }

    fn reset_menu(&self) {
        let mut state = lock(&self.state);
        state.menu.reset();
        state.item_icon_is_template.clear();
    }
}
