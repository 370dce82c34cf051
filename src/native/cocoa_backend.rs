//! Cocoa status bar backend (macOS)
//!
//! Forwards every call to the Objective-C shim. The shim calls back into the
//! `systray_*` functions below, which route to the registered event bridge.

use crate::events::{lock, EventBridge};
use crate::menu::NativeMenuItem;
use crate::native::NativeBackend;
use crate::ui::tray_ffi;
use std::ffi::CString;
use std::os::raw::{c_char, c_int};
use std::sync::{Arc, Mutex};
use tracing::{debug, error};

// Global bridge for upcalls (C callbacks can't capture Rust state)
static BRIDGE: Mutex<Option<Arc<EventBridge>>> = Mutex::new(None);

pub struct CocoaBackend;

impl CocoaBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CocoaBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn to_cstring(what: &str, value: &str) -> Option<CString> {
    match CString::new(value) {
        Ok(s) => Some(s),
        Err(e) => {
            error!("Invalid {} string: {}", what, e);
            None
        }
    }
}

impl NativeBackend for CocoaBackend {
    fn name(&self) -> &'static str {
        "cocoa"
    }

    fn register(&self, bridge: Arc<EventBridge>) {
        *lock(&BRIDGE) = Some(bridge);
        unsafe { tray_ffi::registerSystray() };
    }

    fn set_internal_loop(&self, internal: bool) {
        unsafe { tray_ffi::setInternalLoop(internal) };
    }

    fn native_loop(&self) {
        let code = unsafe { tray_ffi::nativeLoop() };
        debug!("Cocoa run loop returned {}", code);
    }

    fn native_start(&self) {
        unsafe { tray_ffi::nativeStart() };
    }

    fn native_end(&self) {
        unsafe { tray_ffi::nativeEnd() };
    }

    fn quit(&self) {
        unsafe { tray_ffi::quit() };
    }

    fn supports_template_icons(&self) -> bool {
        true
    }

    fn set_icon(&self, icon: &[u8], template: bool) {
        unsafe {
            tray_ffi::setIcon(
                icon.as_ptr() as *const c_char,
                icon.len() as c_int,
                template,
            );
        }
    }

    fn set_title(&self, title: &str) {
        let Some(title) = to_cstring("title", title) else {
            return;
        };
        unsafe { tray_ffi::setTitle(title.as_ptr()) };
    }

    fn set_tooltip(&self, tooltip: &str) {
        let Some(tooltip) = to_cstring("tooltip", tooltip) else {
            return;
        };
        unsafe { tray_ffi::setTooltip(tooltip.as_ptr()) };
    }

    fn set_removal_allowed(&self, allowed: bool) {
        unsafe { tray_ffi::setRemovalAllowed(allowed) };
    }

    fn set_menu_item_icon(&self, icon: &[u8], id: u32, template: bool) {
        unsafe {
            tray_ffi::setMenuItemIcon(
                icon.as_ptr() as *const c_char,
                icon.len() as c_int,
                id as c_int,
                template,
            );
        }
    }

    fn add_or_update_menu_item(&self, item: &NativeMenuItem) {
        let Some(title) = to_cstring("menu title", &item.title) else {
            return;
        };
        let Some(tooltip) = to_cstring("menu tooltip", &item.tooltip) else {
            return;
        };

        unsafe {
            tray_ffi::add_or_update_menu_item(
                item.id,
                item.parent_id,
                title.as_ptr(),
                tooltip.as_ptr(),
                item.disabled,
                item.checked,
                item.checkable,
            );
        }
    }

    fn add_separator(&self, id: u32, parent_id: u32) {
        unsafe { tray_ffi::add_separator(id as c_int, parent_id as c_int) };
    }

    fn hide_menu_item(&self, id: u32) {
        unsafe { tray_ffi::hide_menu_item(id as c_int) };
    }

    fn show_menu_item(&self, id: u32) {
        unsafe { tray_ffi::show_menu_item(id as c_int) };
    }

    fn remove_menu_item(&self, id: u32) {
        unsafe { tray_ffi::remove_menu_item(id as c_int) };
    }

    fn reset_menu(&self) {
        unsafe { tray_ffi::reset_menu() };
    }
}

fn bridge() -> Option<Arc<EventBridge>> {
    lock(&BRIDGE).clone()
}

// Upcalls from the Objective-C shim

#[no_mangle]
pub extern "C" fn systray_ready() {
    if let Some(bridge) = bridge() {
        bridge.ready();
    }
}

#[no_mangle]
pub extern "C" fn systray_on_exit() {
    if let Some(bridge) = bridge() {
        bridge.exit();
    }
}

#[no_mangle]
pub extern "C" fn systray_menu_item_selected(id: c_int) {
    if let Some(bridge) = bridge() {
        bridge.menu_item_selected(id as u32);
    }
}

#[no_mangle]
pub extern "C" fn systray_menu_will_open() {
    if let Some(bridge) = bridge() {
        bridge.menu_will_open();
    }
}
