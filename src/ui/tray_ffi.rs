//! Raw FFI bindings to the Cocoa status bar shim (`systray_darwin.m`)
//!
//! These are low-level bindings. Use `CocoaBackend` instead.
//!
//! Strings are borrowed for the duration of the call only; the shim copies
//! them into `NSString`s before returning.

use std::os::raw::{c_char, c_int, c_short};

#[allow(non_snake_case)]
#[link(name = "systray", kind = "static")]
extern "C" {
    /// Install the app delegate (internal loop mode only)
    pub fn registerSystray();

    /// Run `NSApp` until `quit`; returns immediately in external loop mode
    pub fn nativeLoop() -> c_int;

    /// Create the status item without running `NSApp`
    pub fn nativeStart();

    /// Report exit for an externally driven tray
    pub fn nativeEnd();

    pub fn quit();

    pub fn setInternalLoop(internal: bool);

    pub fn setIcon(iconBytes: *const c_char, length: c_int, template: bool);

    pub fn setMenuItemIcon(iconBytes: *const c_char, length: c_int, menuId: c_int, template: bool);

    pub fn setRemovalAllowed(allowed: bool);

    pub fn setTitle(title: *const c_char);

    pub fn setTooltip(tooltip: *const c_char);

    pub fn add_or_update_menu_item(
        menuId: c_int,
        parentMenuId: c_int,
        title: *const c_char,
        tooltip: *const c_char,
        disabled: c_short,
        checked: c_short,
        isCheckable: c_short,
    );

    pub fn add_separator(menuId: c_int, parentId: c_int);

    pub fn hide_menu_item(menuId: c_int);

    pub fn show_menu_item(menuId: c_int);

    pub fn remove_menu_item(menuId: c_int);

    pub fn reset_menu();
}
