//! Selection state over an extracted image set
//!
//! The caller owns the [`SelectionMap`]; this module only provides pure
//! functions that take a map and return a new one. A map is always built from
//! the current [`ExtractedImageSet`] and must be rebuilt with
//! [`reset_for_set`] whenever a new extraction replaces it.

use crate::extract::ExtractedImageSet;

/// Per-image selection flags, in extraction order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionMap {
    entries: Vec<(String, bool)>,
}

impl SelectionMap {
    /// Returns the flag for `key`, or None if the key is not in the map
    pub fn get(&self, key: &str) -> Option<bool> {
        self.entries
            .iter()
            .find(|(url, _)| url == key)
            .map(|(_, selected)| *selected)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of selected entries
    pub fn selected_count(&self) -> usize {
        self.entries.iter().filter(|(_, selected)| *selected).count()
    }

    /// True when every entry is selected (and there is at least one)
    pub fn all_selected(&self) -> bool {
        !self.entries.is_empty() && self.entries.iter().all(|(_, selected)| *selected)
    }

    /// Iterates over `(url, selected)` pairs in map order
    pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> {
        self.entries
            .iter()
            .map(|(url, selected)| (url.as_str(), *selected))
    }
}

/// Builds a fresh map with every member of `set` deselected
pub fn reset_for_set(set: &ExtractedImageSet) -> SelectionMap {
    SelectionMap {
        entries: set.iter().map(|url| (url.clone(), false)).collect(),
    }
}

/// Sets every entry to `value`
pub fn toggle_all(map: &SelectionMap, value: bool) -> SelectionMap {
    SelectionMap {
        entries: map
            .entries
            .iter()
            .map(|(url, _)| (url.clone(), value))
            .collect(),
    }
}

/// Flips the flag for `key`
///
/// Keys outside the map are a caller error; the map is returned unchanged.
pub fn toggle_one(map: &SelectionMap, key: &str) -> SelectionMap {
    if map.get(key).is_none() {
        tracing::debug!("Ignoring toggle for unknown image {}", key);
    }

    SelectionMap {
        entries: map
            .entries
            .iter()
            .map(|(url, selected)| {
                if url == key {
                    (url.clone(), !selected)
                } else {
                    (url.clone(), *selected)
                }
            })
            .collect(),
    }
}

/// Returns the selected URLs in map order
pub fn selected_keys(map: &SelectionMap) -> Vec<String> {
    map.entries
        .iter()
        .filter(|(_, selected)| *selected)
        .map(|(url, _)| url.clone())
        .collect()
}

/// The "Select All" / "Deselect All" button state
///
/// Each press flips the stored state and applies it to every entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SelectAllToggle {
    all_selected: bool,
}

impl SelectAllToggle {
    /// Label for the button in its current state
    pub fn label(&self) -> &'static str {
        if self.all_selected {
            "Deselect All"
        } else {
            "Select All"
        }
    }

    /// Flips the state and returns the map with the new state applied
    pub fn press(&mut self, map: &SelectionMap) -> SelectionMap {
        self.all_selected = !self.all_selected;
        toggle_all(map, self.all_selected)
    }
}
