//! Menu item values and their native wire form

use crate::error::{Result, TrayError};

/// Parent id used by native shells for top-level entries.
pub const ROOT_PARENT_ID: u32 = 0;

/// Largest id a native shell can represent.
pub const MAX_MENU_ITEM_ID: u32 = i32::MAX as u32;

/// A menu entry as the generic layer sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuItem {
    id: u32,
    /// Id of the enclosing submenu entry, `None` for top level
    pub parent: Option<u32>,
    pub title: String,
    pub tooltip: String,
    pub disabled: bool,
    pub checked: bool,
    pub checkable: bool,
}

impl MenuItem {
    /// Create a top-level, enabled, non-checkable item.
    pub fn new(id: u32, title: impl Into<String>) -> Result<Self> {
        if id == 0 {
            return Err(TrayError::ZeroMenuItemId);
        }
        if id > MAX_MENU_ITEM_ID {
            return Err(TrayError::MenuItemIdOutOfRange(id));
        }

        Ok(Self {
            id,
            parent: None,
            title: title.into(),
            tooltip: String::new(),
            disabled: false,
            checked: false,
            checkable: false,
        })
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn with_parent(mut self, parent: u32) -> Self {
        self.parent = (parent != ROOT_PARENT_ID).then_some(parent);
        self
    }

    pub fn with_tooltip(mut self, tooltip: impl Into<String>) -> Self {
        self.tooltip = tooltip.into();
        self
    }

    pub fn checkable(mut self, checked: bool) -> Self {
        self.checkable = true;
        self.checked = checked;
        self
    }

    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    /// Parent id as native shells expect it (0 for top level)
    pub fn parent_id(&self) -> u32 {
        self.parent.unwrap_or(ROOT_PARENT_ID)
    }

    /// Translate into the positional form handed to native backends.
    pub fn to_native(&self) -> NativeMenuItem {
        NativeMenuItem {
            id: self.id as i32,
            parent_id: self.parent_id() as i32,
            title: self.title.clone(),
            tooltip: self.tooltip.clone(),
            disabled: tri_state(self.disabled),
            checked: tri_state(self.checked),
            checkable: tri_state(self.checkable),
        }
    }
}

/// A separator line; it has no attributes beyond its placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Separator {
    pub id: u32,
    pub parent_id: u32,
}

/// Menu item in the shape of the native `add_or_update_menu_item` call.
///
/// Flags use the C `short` convention: 0 is false, 1 is true.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeMenuItem {
    pub id: i32,
    pub parent_id: i32,
    pub title: String,
    pub tooltip: String,
    pub disabled: i16,
    pub checked: i16,
    pub checkable: i16,
}

impl NativeMenuItem {
    pub fn is_disabled(&self) -> bool {
        self.disabled != 0
    }

    pub fn is_checked(&self) -> bool {
        self.checked != 0
    }

    pub fn is_checkable(&self) -> bool {
        self.checkable != 0
    }
}

fn tri_state(flag: bool) -> i16 {
    if flag {
        1
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_id_is_rejected() {
        assert!(matches!(
            MenuItem::new(0, "nope"),
            Err(TrayError::ZeroMenuItemId)
        ));
    }

    #[test]
    fn test_ids_beyond_c_int_are_rejected() {
        assert!(MenuItem::new(MAX_MENU_ITEM_ID, "last").is_ok());
        assert!(matches!(
            MenuItem::new(MAX_MENU_ITEM_ID + 1, "too far"),
            Err(TrayError::MenuItemIdOutOfRange(id)) if id == MAX_MENU_ITEM_ID + 1
        ));
        assert_eq!(
            MenuItem::new(MAX_MENU_ITEM_ID, "last").unwrap().to_native().id,
            i32::MAX
        );
    }

    #[test]
    fn test_flags_map_independently() {
        let item = MenuItem::new(7, "Sync")
            .unwrap()
            .checkable(true)
            .disabled(true);
        let native = item.to_native();
        assert_eq!(
            (native.disabled, native.checked, native.checkable),
            (1, 1, 1)
        );

        let item = MenuItem::new(7, "Sync").unwrap().checkable(false);
        let native = item.to_native();
        assert_eq!(
            (native.disabled, native.checked, native.checkable),
            (0, 0, 1)
        );

        let mut item = MenuItem::new(7, "Sync").unwrap().disabled(true);
        item.checked = true;
        let native = item.to_native();
        assert_eq!(
            (native.disabled, native.checked, native.checkable),
            (1, 1, 0)
        );

        let native = MenuItem::new(7, "Sync").unwrap().to_native();
        assert_eq!(
            (native.disabled, native.checked, native.checkable),
            (0, 0, 0)
        );
    }

    #[test]
    fn test_parent_zero_means_top_level() {
        let item = MenuItem::new(3, "Child").unwrap().with_parent(0);
        assert_eq!(item.parent, None);
        assert_eq!(item.to_native().parent_id, 0);

        let item = MenuItem::new(3, "Child").unwrap().with_parent(9);
        assert_eq!(item.parent, Some(9));
        assert_eq!(item.to_native().parent_id, 9);
    }
}
