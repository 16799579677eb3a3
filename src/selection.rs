//! Multiselect state for the league and club filters.
//!
//! Tracks which options are marked, independent of the cursor position, so
//! the option list can be rebuilt without losing still-valid selections.

use std::collections::BTreeSet;

/// Marked options of a multiselect list
#[derive(Debug, Default, Clone)]
pub struct Selection {
    marked: BTreeSet<String>,
}

impl Selection {
    /// Create an empty selection
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggle an option. Returns true if it is now marked.
    pub fn toggle(&mut self, option: &str) -> bool {
        if self.marked.remove(option) {
            false
        } else {
            self.marked.insert(option.to_string());
            true
        }
    }

    pub fn is_marked(&self, option: &str) -> bool {
        self.marked.contains(option)
    }

    /// Marked options in sorted order
    pub fn marked(&self) -> Vec<String> {
        self.marked.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.marked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.marked.is_empty()
    }

    /// Clear all marks
    pub fn clear(&mut self) {
        self.marked.clear();
    }

    /// Drop marks that are no longer among `options`.
    /// Returns the number of marks removed.
    pub fn prune_to(&mut self, options: &[String]) -> usize {
        let before = self.marked.len();
        self.marked.retain(|m| options.iter().any(|o| o == m));
        before - self.marked.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle() {
        let mut sel = Selection::new();
        assert!(sel.toggle("Arsenal FC"));
        assert!(sel.is_marked("Arsenal FC"));
        assert!(!sel.toggle("Arsenal FC"));
        assert!(!sel.is_marked("Arsenal FC"));
        assert!(sel.is_empty());
    }

    #[test]
    fn test_marked_is_sorted() {
        let mut sel = Selection::new();
        sel.toggle("Chelsea FC");
        sel.toggle("Arsenal FC");
        assert_eq!(sel.marked(), vec!["Arsenal FC", "Chelsea FC"]);
        assert_eq!(sel.len(), 2);
    }

    #[test]
    fn test_prune_to_options() {
        let mut sel = Selection::new();
        sel.toggle("Arsenal FC");
        sel.toggle("Real Madrid");
        let removed = sel.prune_to(&["Arsenal FC".to_string(), "Chelsea FC".to_string()]);
        assert_eq!(removed, 1);
        assert_eq!(sel.marked(), vec!["Arsenal FC"]);
    }

    #[test]
    fn test_clear() {
        let mut sel = Selection::new();
        sel.toggle("GB1");
        sel.toggle("ES1");
        sel.clear();
        assert!(sel.is_empty());
    }
}
