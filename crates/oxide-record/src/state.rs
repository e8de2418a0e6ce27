//! Per-instance persistence bookkeeping.

use std::fmt;

use crate::dirty::DirtyTracker;
use crate::schema::RecordId;

/// Where a record stands relative to its row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveState {
    /// Never inserted (`id == 0`).
    Unsaved,
    /// Backed by a row (`id != 0`).
    Saved,
    /// The row was deleted; the instance must not be persisted again.
    Gone,
}

impl fmt::Display for SaveState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Unsaved => "unsaved",
            Self::Saved => "saved",
            Self::Gone => "deleted",
        })
    }
}

/// A persistence operation, as named in state errors and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// `insert`
    Insert,
    /// `update`
    Update,
    /// `delete`
    Delete,
    /// `load`
    Load,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Insert => "insert",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Load => "load",
        })
    }
}

/// Identity, dirty set and deletion marker embedded in every record.
///
/// Records hold one of these in a field (the derive macro finds it by
/// type). Save state is derived from the id, except for the terminal
/// [`SaveState::Gone`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordState {
    id: RecordId,
    dirty: DirtyTracker,
    gone: bool,
}

impl RecordState {
    /// State of a freshly constructed, unsaved record.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            id: 0,
            dirty: DirtyTracker::new(),
            gone: false,
        }
    }

    /// The database id, `0` while unsaved.
    #[must_use]
    pub const fn id(&self) -> RecordId {
        self.id
    }

    /// The current save state.
    #[must_use]
    pub const fn save_state(&self) -> SaveState {
        if self.gone {
            SaveState::Gone
        } else if self.id == 0 {
            SaveState::Unsaved
        } else {
            SaveState::Saved
        }
    }

    /// The dirty tracker.
    #[must_use]
    pub const fn dirty(&self) -> &DirtyTracker {
        &self.dirty
    }

    /// Records a modification of `name`. Called by generated setters.
    pub fn mark_modified(&mut self, name: &'static str) {
        self.dirty.mark_modified(name);
    }

    pub(crate) fn set_id(&mut self, id: RecordId) {
        self.id = id;
    }

    pub(crate) fn clear_dirty(&mut self) {
        self.dirty.clear();
    }

    pub(crate) fn mark_gone(&mut self) {
        self.gone = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_state_transitions() {
        let mut state = RecordState::new();
        assert_eq!(state.save_state(), SaveState::Unsaved);

        state.set_id(3);
        assert_eq!(state.save_state(), SaveState::Saved);

        state.mark_gone();
        assert_eq!(state.save_state(), SaveState::Gone);
    }

    #[test]
    fn test_display() {
        assert_eq!(Operation::Insert.to_string(), "insert");
        assert_eq!(SaveState::Gone.to_string(), "deleted");
    }
}
