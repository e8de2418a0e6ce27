//! Tracking of modified attributes.

use std::collections::BTreeSet;

/// The set of attribute names modified since a record was created, loaded
/// or last saved.
///
/// Membership only records that a setter ran; values are never compared,
/// so setting an attribute to its current value still marks it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirtyTracker {
    modified: BTreeSet<&'static str>,
}

impl DirtyTracker {
    /// Creates an empty tracker.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            modified: BTreeSet::new(),
        }
    }

    /// Records that `name` was modified. Idempotent.
    pub fn mark_modified(&mut self, name: &'static str) {
        self.modified.insert(name);
    }

    /// Returns true if any attribute was modified.
    #[must_use]
    pub fn is_modified(&self) -> bool {
        !self.modified.is_empty()
    }

    /// Returns true if `name` was modified.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.modified.contains(name)
    }

    /// The modified attribute names.
    #[must_use]
    pub const fn modified_attributes(&self) -> &BTreeSet<&'static str> {
        &self.modified
    }

    /// Forgets every modification.
    pub fn clear(&mut self) {
        self.modified.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_tracker_is_clean() {
        let tracker = DirtyTracker::new();
        assert!(!tracker.is_modified());
        assert!(tracker.modified_attributes().is_empty());
    }

    #[test]
    fn test_mark_modified_is_idempotent() {
        let mut tracker = DirtyTracker::new();
        tracker.mark_modified("total");
        tracker.mark_modified("total");
        tracker.mark_modified("customer");

        assert!(tracker.is_modified());
        assert_eq!(tracker.modified_attributes().len(), 2);
        assert!(tracker.contains("total"));
        assert!(tracker.contains("customer"));
        assert!(!tracker.contains("note"));
    }

    #[test]
    fn test_clear() {
        let mut tracker = DirtyTracker::new();
        tracker.mark_modified("total");
        tracker.clear();
        assert!(!tracker.is_modified());
    }
}
