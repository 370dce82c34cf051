//! Flat, insertion-ordered menu store
//!
//! Native shells that take the whole menu at once (StatusNotifierItem) or no
//! menu at all (the headless backend) keep their copy of the menu here. Entries
//! are kept in the order they were first added; updates never move an entry.

use super::item::{NativeMenuItem, ROOT_PARENT_ID};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryKind {
    Item(NativeMenuItem),
    Separator,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuEntry {
    pub id: u32,
    pub parent_id: u32,
    pub kind: EntryKind,
    pub visible: bool,
    /// Encoded image bytes for the entry's icon
    pub icon: Option<Vec<u8>>,
}

impl MenuEntry {
    pub fn item(&self) -> Option<&NativeMenuItem> {
        match &self.kind {
            EntryKind::Item(item) => Some(item),
            EntryKind::Separator => None,
        }
    }

    pub fn is_separator(&self) -> bool {
        matches!(self.kind, EntryKind::Separator)
    }
}

/// A menu entry together with the entries nested under it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuNode {
    pub entry: MenuEntry,
    pub children: Vec<MenuNode>,
}

#[derive(Debug, Default, Clone)]
pub struct MenuModel {
    entries: Vec<MenuEntry>,
}

impl MenuModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new entry or update the existing entry with the same id.
    ///
    /// Visibility and icon survive an update.
    pub fn add_or_update(&mut self, item: &NativeMenuItem) {
        let id = item.id as u32;
        let parent_id = item.parent_id as u32;

        if let Some(entry) = self.entry_mut(id) {
            entry.parent_id = parent_id;
            entry.kind = EntryKind::Item(item.clone());
            return;
        }

        self.entries.push(MenuEntry {
            id,
            parent_id,
            kind: EntryKind::Item(item.clone()),
            visible: true,
            icon: None,
        });
    }

    pub fn add_separator(&mut self, id: u32, parent_id: u32) {
        if let Some(entry) = self.entry_mut(id) {
            entry.parent_id = parent_id;
            entry.kind = EntryKind::Separator;
            return;
        }

        self.entries.push(MenuEntry {
            id,
            parent_id,
            kind: EntryKind::Separator,
            visible: true,
            icon: None,
        });
    }

    /// Returns false when the id is not registered.
    pub fn set_icon(&mut self, id: u32, icon: &[u8]) -> bool {
        match self.entry_mut(id) {
            Some(entry) => {
                entry.icon = Some(icon.to_vec());
                true
            }
            None => false,
        }
    }

    pub fn set_visible(&mut self, id: u32, visible: bool) -> bool {
        match self.entry_mut(id) {
            Some(entry) => {
                entry.visible = visible;
                true
            }
            None => false,
        }
    }

    /// Remove an entry and everything nested under it.
    ///
    /// Returns the number of entries removed.
    pub fn remove(&mut self, id: u32) -> usize {
        if self.get(id).is_none() {
            return 0;
        }

        let mut doomed = vec![id];
        let mut cursor = 0;
        while cursor < doomed.len() {
            let parent = doomed[cursor];
            let children: Vec<u32> = self
                .entries
                .iter()
                .filter(|e| e.parent_id == parent && !doomed.contains(&e.id))
                .map(|e| e.id)
                .collect();
            doomed.extend(children);
            cursor += 1;
        }

        let before = self.entries.len();
        self.entries.retain(|e| !doomed.contains(&e.id));
        before - self.entries.len()
    }

    pub fn reset(&mut self) {
        self.entries.clear();
    }

    pub fn get(&self, id: u32) -> Option<&MenuEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[MenuEntry] {
        &self.entries
    }

    /// Render the menu as a tree rooted at the top level.
    ///
    /// Entries whose parent is not registered are unreachable and left out.
    pub fn tree(&self) -> Vec<MenuNode> {
        self.children_of(ROOT_PARENT_ID)
    }

    fn children_of(&self, parent_id: u32) -> Vec<MenuNode> {
        self.entries
            .iter()
            .filter(|e| e.parent_id == parent_id && e.id != parent_id)
            .map(|e| MenuNode {
                entry: e.clone(),
                children: self.children_of(e.id),
            })
            .collect()
    }

    fn entry_mut(&mut self, id: u32) -> Option<&mut MenuEntry> {
        self.entries.iter_mut().find(|e| e.id == id)
    }
}
