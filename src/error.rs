//! Library error type

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced to callers of the tray API.
///
/// Most tray operations cannot observe native failures and only log them;
/// these are the few cases the caller gets to handle.
#[derive(Debug, Error)]
pub enum TrayError {
    /// An icon file could not be read from disk
    #[error("failed to read icon file {path:?}: {source}")]
    IconRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An icon buffer with no bytes was handed to a setter
    #[error("icon buffer is empty")]
    EmptyIcon,

    /// Menu item ids are caller-assigned and must be non-zero
    #[error("menu item id must be non-zero")]
    ZeroMenuItemId,

    /// Native shells take ids as C `int`
    #[error("menu item id {0} exceeds the native id range")]
    MenuItemIdOutOfRange(u32),

    /// Every id up to the native maximum has been handed out
    #[error("no menu item ids left")]
    MenuItemIdsExhausted,

    /// The entry was removed from the menu (directly, with its parent, or by a reset)
    #[error("menu item {0} has been removed")]
    MenuItemRemoved(u32),

    /// The native backend could not be started
    #[error("native backend error: {0}")]
    Backend(String),
}

pub type Result<T> = std::result::Result<T, TrayError>;
