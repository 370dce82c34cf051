//! Menu item data and the flat menu store used by non-Cocoa backends

pub mod item;
pub mod model;

pub use item::{MenuItem, NativeMenuItem, Separator, MAX_MENU_ITEM_ID, ROOT_PARENT_ID};
pub use model::{EntryKind, MenuEntry, MenuModel, MenuNode};
