//! Desktop notifications
//!
//! Two fire-and-forget strategies: AppleScript through `osascript` on macOS and
//! the freedesktop `Notify` method on the session bus on Linux. Neither reports
//! failure to the caller; problems are logged and swallowed.

use crate::config::{NotificationBackend, NotificationsConfig};
use std::collections::HashMap;
use std::process::Command;
use tracing::{debug, error, info, warn};
use zbus::zvariant::Value;

const NOTIFICATIONS_DESTINATION: &str = "org.freedesktop.Notifications";
const NOTIFICATIONS_PATH: &str = "/org/freedesktop/Notifications";
const NOTIFICATIONS_INTERFACE: &str = "org.freedesktop.Notifications";

/// Let the notification server pick the expiry
pub const DEFAULT_EXPIRE_TIMEOUT_MS: i32 = -1;

/// A transient desktop message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub app_name: String,
    pub title: String,
    pub body: String,
}

impl Notification {
    pub fn new(
        app_name: impl Into<String>,
        title: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            app_name: app_name.into(),
            title: title.into(),
            body: body.into(),
        }
    }
}

/// Trait for notification transports
pub trait Notifier: Send + Sync {
    /// Display the notification. Never fails from the caller's point of view.
    fn show(&self, notification: &Notification);
}

/// Runs `osascript -e 'display notification ...'`
pub struct OsascriptNotifier {
    program: String,
}

impl OsascriptNotifier {
    pub fn new() -> Self {
        Self::with_program("osascript")
    }

    /// Use a different executable name or path (looked up on `PATH`).
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for OsascriptNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier for OsascriptNotifier {
    fn show(&self, notification: &Notification) {
        let osa = match which::which(&self.program) {
            Ok(path) => path,
            Err(e) => {
                warn!("Unable to locate {} executable: {}", self.program, e);
                return;
            }
        };

        let script = display_notification_script(notification);
        match Command::new(&osa).arg("-e").arg(&script).output() {
            Ok(output) if output.status.success() => {
                debug!("Desktop notification sent via {:?}", osa);
            }
            Ok(output) => {
                error!(
                    "Unable to send desktop notification: {} exited with {}: {}",
                    self.program,
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                );
            }
            Err(e) => {
                error!("Unable to send desktop notification: {}", e);
            }
        }
    }
}

/// Build the AppleScript for a notification.
///
/// The body is the message text, the app name is the title and the
/// notification title becomes the subtitle.
pub fn display_notification_script(notification: &Notification) -> String {
    format!(
        "display notification {} with title {} subtitle {}",
        quote_applescript(&notification.body),
        quote_applescript(&notification.app_name),
        quote_applescript(&notification.title),
    )
}

/// Quote a string as an AppleScript string literal.
fn quote_applescript(s: &str) -> String {
    let mut quoted = String::with_capacity(s.len() + 2);
    quoted.push('"');
    for c in s.chars() {
        match c {
            '\\' => quoted.push_str("\\\\"),
            '"' => quoted.push_str("\\\""),
            '\n' => quoted.push_str("\\n"),
            '\r' => quoted.push_str("\\r"),
            '\t' => quoted.push_str("\\t"),
            c => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}

/// Calls `org.freedesktop.Notifications.Notify` on the session bus
pub struct DbusNotifier {
    address: Option<String>,
    expire_timeout_ms: i32,
}

impl DbusNotifier {
    pub fn new() -> Self {
        Self {
            address: None,
            expire_timeout_ms: DEFAULT_EXPIRE_TIMEOUT_MS,
        }
    }

    /// Connect to an explicit bus address instead of the session bus.
    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    pub fn with_expire_timeout(mut self, expire_timeout_ms: i32) -> Self {
        self.expire_timeout_ms = expire_timeout_ms;
        self
    }

    fn connect(&self) -> zbus::Result<zbus::blocking::Connection> {
        match &self.address {
            Some(address) => {
                zbus::blocking::connection::Builder::address(address.as_str())?.build()
            }
            None => zbus::blocking::Connection::session(),
        }
    }
}

impl Default for DbusNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier for DbusNotifier {
    fn show(&self, notification: &Notification) {
        let conn = match self.connect() {
            Ok(conn) => conn,
            Err(e) => {
                warn!("Unable to obtain dbus session: {}", e);
                return;
            }
        };

        let actions: Vec<&str> = Vec::new();
        let hints: HashMap<&str, Value<'_>> = HashMap::new();
        let body = (
            notification.app_name.as_str(),
            0u32, // replaces_id
            "",   // app_icon
            notification.title.as_str(),
            notification.body.as_str(),
            actions,
            hints,
            self.expire_timeout_ms,
        );

        let reply = conn.call_method(
            Some(NOTIFICATIONS_DESTINATION),
            NOTIFICATIONS_PATH,
            Some(NOTIFICATIONS_INTERFACE),
            "Notify",
            &body,
        );

        match reply {
            Ok(msg) => match msg.body().deserialize::<u32>() {
                Ok(id) => debug!("Desktop notification sent (id {})", id),
                Err(e) => debug!("Desktop notification sent, unexpected reply: {}", e),
            },
            Err(e) => error!("Unable to send desktop notification: {}", e),
        }
    }
}

/// Swallows notifications (disabled, or no transport on this platform)
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn show(&self, notification: &Notification) {
        debug!(
            "Notification dropped, no transport: {}",
            notification.title
        );
    }
}

/// Create the notifier for the current platform
pub fn default_notifier() -> Box<dyn Notifier> {
    #[cfg(target_os = "macos")]
    {
        return Box::new(OsascriptNotifier::new());
    }

    #[cfg(target_os = "linux")]
    {
        return Box::new(DbusNotifier::new());
    }

    #[cfg(not(any(target_os = "macos", target_os = "linux")))]
    {
        info!("Notifications not supported on this platform");
        Box::new(NoopNotifier)
    }
}

/// Create the notifier selected by configuration
pub fn notifier_from_config(config: &NotificationsConfig) -> Box<dyn Notifier> {
    if !config.enabled {
        info!("Desktop notifications disabled by configuration");
        return Box::new(NoopNotifier);
    }

    match config.backend {
        #[cfg(target_os = "linux")]
        NotificationBackend::Auto => Box::new(dbus_from_config(config)),
        #[cfg(not(target_os = "linux"))]
        NotificationBackend::Auto => default_notifier(),
        NotificationBackend::Osascript => Box::new(OsascriptNotifier::new()),
        NotificationBackend::Dbus => Box::new(dbus_from_config(config)),
        NotificationBackend::None => Box::new(NoopNotifier),
    }
}

fn dbus_from_config(config: &NotificationsConfig) -> DbusNotifier {
    let notifier = DbusNotifier::new().with_expire_timeout(config.expire_timeout_ms);
    match &config.bus_address {
        Some(address) => notifier.with_address(address.clone()),
        None => notifier,
    }
}

/// Show a notification on the user's desktop with the platform transport
pub fn show_message(app_name: &str, title: &str, body: &str) {
    default_notifier().show(&Notification::new(app_name, title, body));
}
