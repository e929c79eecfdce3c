use std::collections::HashSet;
use std::hash::Hash;

use crate::protocol::Entry;

/// Where a pointer or tap landed. Anything outside the recognised
/// interactive regions clears the selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    EntryCard,
    PathWidget,
    Toolbar,
    Sidebar,
    Modal,
    Outside,
}

impl Region {
    pub const fn is_interactive(self) -> bool {
        !matches!(self, Self::Outside)
    }
}

/// At most one selected item; toggling the sole member empties the set.
#[derive(Debug, Clone)]
pub struct Selection<K = String> {
    items: HashSet<K>,
}

impl<K> Default for Selection<K> {
    fn default() -> Self {
        Self {
            items: HashSet::new(),
        }
    }
}

impl<K: Eq + Hash + Clone> Selection<K> {
    pub fn select(&mut self, key: K) {
        self.items.clear();
        self.items.insert(key);
    }

    pub fn toggle(&mut self, key: K) {
        if self.items.len() == 1 && self.items.contains(&key) {
            self.items.clear();
        } else {
            self.select(key);
        }
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn is_selected(&self, key: &K) -> bool {
        self.items.contains(key)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn selected(&self) -> Option<&K> {
        self.items.iter().next()
    }

    /// Clears unless the pointer landed on a recognised region. Returns
    /// whether anything was cleared.
    pub fn pointer(&mut self, region: Region) -> bool {
        if region.is_interactive() || self.items.is_empty() {
            return false;
        }
        self.items.clear();
        true
    }
}

impl Selection<String> {
    /// Directories reveal their actions only while selected; files always
    /// show theirs.
    pub fn actions_visible(&self, entry: &Entry) -> bool {
        !entry.is_dir() || self.is_selected(&entry.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{EntryDetails, EntryKind};

    fn entry(kind: EntryKind, path: &str) -> Entry {
        Entry {
            kind,
            path: path.to_string(),
            details: EntryDetails::default(),
        }
    }

    #[test]
    fn test_select_then_toggle_empties() {
        let mut selection = Selection::default();
        selection.select("a".to_string());
        selection.toggle("a".to_string());
        assert!(selection.is_empty());
    }

    #[test]
    fn test_select_replaces_previous() {
        let mut selection = Selection::default();
        selection.select("a".to_string());
        selection.select("b".to_string());
        assert_eq!(selection.len(), 1);
        assert_eq!(selection.selected(), Some(&"b".to_string()));
        assert!(!selection.is_selected(&"a".to_string()));
    }

    #[test]
    fn test_toggle_other_item_selects_it() {
        let mut selection = Selection::default();
        selection.select(1);
        selection.toggle(2);
        assert_eq!(selection.selected(), Some(&2));
        selection.toggle(2);
        assert!(selection.is_empty());
        selection.toggle(3);
        assert_eq!(selection.selected(), Some(&3));
    }

    #[test]
    fn test_selection_with_index_keys() {
        let mut selection: Selection<usize> = Selection::default();
        selection.select(3);
        let snapshot = selection.clone();
        selection.toggle(3);
        assert!(selection.is_empty());
        assert_eq!(snapshot.selected(), Some(&3));
        assert!(format!("{snapshot:?}").contains('3'));
    }

    #[test]
    fn test_pointer_outside_clears() {
        let mut selection = Selection::default();
        selection.select(1);
        for region in [
            Region::EntryCard,
            Region::PathWidget,
            Region::Toolbar,
            Region::Sidebar,
            Region::Modal,
        ] {
            assert!(!selection.pointer(region));
            assert!(selection.is_selected(&1));
        }
        assert!(selection.pointer(Region::Outside));
        assert!(selection.is_empty());
        assert!(!selection.pointer(Region::Outside));
    }

    #[test]
    fn test_action_visibility() {
        let mut selection = Selection::default();
        let dir = entry(EntryKind::Directory, "/docs");
        let file = entry(EntryKind::File, "/notes.txt");

        assert!(!selection.actions_visible(&dir));
        assert!(selection.actions_visible(&file));

        selection.select(dir.path.clone());
        assert!(selection.actions_visible(&dir));
        assert!(selection.actions_visible(&file));
    }
}
