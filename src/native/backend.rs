//! Native tray backend trait

use crate::events::EventBridge;
use crate::menu::NativeMenuItem;
use std::sync::Arc;

/// Trait for native tray shells
///
/// Every call is fire-and-forget: failures stay inside the backend and are
/// only logged. Features a shell does not have default to no-ops.
pub trait NativeBackend: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Hand the backend the bridge its upcalls should go to.
    fn register(&self, bridge: Arc<EventBridge>);

    /// Choose between running the shell's own event loop and being driven by
    /// an external one.
    fn set_internal_loop(&self, _internal: bool) {}

    /// Run the native event loop until `quit` is called.
    fn native_loop(&self);

    /// Bring the tray up without entering a loop (external loop mode).
    fn native_start(&self);

    /// Tear the tray down (external loop mode).
    fn native_end(&self);

    /// Ask the native loop to stop.
    fn quit(&self);

    /// Whether `set_icon(.., true)` renders a template icon
    fn supports_template_icons(&self) -> bool {
        false
    }

    /// Replace the tray icon with encoded image bytes (never empty).
    fn set_icon(&self, icon: &[u8], template: bool);

    fn set_title(&self, title: &str);

    fn set_tooltip(&self, _tooltip: &str) {}

    /// Whether the user may drag the icon out of the menu bar.
    fn set_removal_allowed(&self, _allowed: bool) {}

    fn set_menu_item_icon(&self, _icon: &[u8], _id: u32, _template: bool) {}

    /// Create the entry, or update it in place if the id is already known.
    fn add_or_update_menu_item(&self, item: &NativeMenuItem);

    fn add_separator(&self, id: u32, parent_id: u32);

    fn hide_menu_item(&self, id: u32);

    fn show_menu_item(&self, id: u32);

    fn remove_menu_item(&self, id: u32);

    /// Drop every menu entry.
    fn reset_menu(&self);
}

/// Create the appropriate tray backend for the current platform
pub fn create_backend(app_id: &str) -> Arc<dyn NativeBackend> {
    #[cfg(target_os = "macos")]
    {
        let _ = app_id;
        tracing::info!("Using Cocoa status bar backend");
        return Arc::new(super::cocoa_backend::CocoaBackend::new());
    }

    #[cfg(target_os = "linux")]
    {
        tracing::info!("Using StatusNotifierItem backend");
        return Arc::new(super::ksni_backend::KsniBackend::new(app_id));
    }

    #[cfg(not(any(target_os = "macos", target_os = "linux")))]
    {
        let _ = app_id;
        tracing::warn!("No native tray on this platform, running headless");
        Arc::new(super::memory_backend::MemoryBackend::new())
    }
}
