//! traylink
//!
//! A system tray icon, its menu and desktop notifications behind one API.
//! Each platform gets a thin backend: the Cocoa status bar on macOS, a
//! StatusNotifierItem on Linux, and a headless recorder everywhere else.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;
pub mod menu;
pub mod native;
pub mod ui;

pub use error::{Result, TrayError};
pub use events::EventBridge;
pub use menu::{MenuItem, NativeMenuItem, Separator};
pub use native::{create_backend, MemoryBackend, NativeBackend};
pub use ui::{show_message, MenuItemHandle, Notification, Notifier, Tray};
