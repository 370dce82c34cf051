//! System tray UI and notifications

pub mod notifications;
mod tray;

#[cfg(target_os = "macos")]
pub mod tray_ffi;

pub use notifications::{
    default_notifier, notifier_from_config, show_message, DbusNotifier, NoopNotifier,
    Notification, Notifier, OsascriptNotifier, DEFAULT_EXPIRE_TIMEOUT_MS,
};
pub use tray::*;
