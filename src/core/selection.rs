//! Selection and row action menu

use crate::resource::{Record, RecordId};

/// Screen position the menu opens at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MenuAnchor {
    pub row: u16,
    pub col: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    View,
    Edit,
    Delete,
}

impl MenuAction {
    pub const ALL: [MenuAction; 3] = [Self::View, Self::Edit, Self::Delete];

    pub fn label(&self) -> &'static str {
        match self {
            Self::View => "View",
            Self::Edit => "Edit",
            Self::Delete => "Delete",
        }
    }

    pub fn shortcut(&self) -> char {
        match self {
            Self::View => 'v',
            Self::Edit => 'e',
            Self::Delete => 'd',
        }
    }
}

/// The single active record and whether its menu is open.
///
/// An open menu always has an active record. Closing the menu keeps the
/// record active so the chosen action can use it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    active: Option<RecordId>,
    menu: Option<MenuAnchor>,
}

impl Selection {
    pub fn active(&self) -> Option<&RecordId> {
        self.active.as_ref()
    }

    pub fn is_menu_open(&self) -> bool {
        self.menu.is_some()
    }

    pub fn menu_anchor(&self) -> Option<MenuAnchor> {
        self.menu
    }

    /// Open the menu for a record, replacing any other open menu
    pub fn open_menu_for(&mut self, id: RecordId, anchor: MenuAnchor) {
        self.active = Some(id);
        self.menu = Some(anchor);
    }

    pub fn close_menu(&mut self) -> bool {
        self.menu.take().is_some()
    }

    pub fn clear(&mut self) -> bool {
        let changed = self.active.is_some() || self.menu.is_some();
        self.active = None;
        self.menu = None;
        changed
    }

    /// Clear if the active record is absent from `collection`
    pub fn retain(&mut self, collection: &[Record]) -> bool {
        match &self.active {
            Some(id) if !collection.iter().any(|r| r.id() == id) => self.clear(),
            _ => false,
        }
    }

    pub fn references(&self, id: &RecordId) -> bool {
        self.active.as_ref() == Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opening_replaces_previous_menu() {
        let mut sel = Selection::default();
        sel.open_menu_for(RecordId::from("a"), MenuAnchor { row: 3, col: 10 });
        sel.open_menu_for(RecordId::from("b"), MenuAnchor { row: 5, col: 10 });

        assert_eq!(sel.active(), Some(&RecordId::from("b")));
        assert_eq!(sel.menu_anchor(), Some(MenuAnchor { row: 5, col: 10 }));
    }

    #[test]
    fn test_close_menu_keeps_active_record() {
        let mut sel = Selection::default();
        sel.open_menu_for(RecordId::from("a"), MenuAnchor::default());
        assert!(sel.close_menu());
        assert!(!sel.is_menu_open());
        assert!(sel.references(&RecordId::from("a")));
        assert!(!sel.close_menu());
    }

    #[test]
    fn test_retain_clears_missing_record() {
        let mut sel = Selection::default();
        sel.open_menu_for(RecordId::from("gone"), MenuAnchor::default());
        assert!(sel.retain(&[]));
        assert_eq!(sel, Selection::default());
        assert!(!sel.retain(&[]));
    }
}
