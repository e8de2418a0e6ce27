//! Relation attributes and their resolution.
//!
//! A relation attribute holds a [`Related<T>`]: nothing yet, a deferred
//! foreign key (lazy load), or the loaded record itself (eager load or
//! explicit resolution). The engine talks to the slot through the
//! object-safe [`RelationSlot`] trait, which is how it reaches the concrete
//! related type without knowing it.

use crate::connection::Connection;
use crate::error::{RecordError, RelationError, Result};
use crate::persist::{self, Persist};
use crate::schema::{Record, RecordId};
use crate::value::SqlValue;

/// Default limit on nested eager loads.
pub const DEFAULT_MAX_DEPTH: usize = 16;

/// The value of a relation attribute.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Related<T> {
    /// No related record.
    #[default]
    Unset,
    /// Only the foreign key is known; resolve it with
    /// [`Persist::load_related`].
    ForeignKey(RecordId),
    /// The related record.
    Resolved(Box<T>),
}

impl<T> Related<T> {
    /// Wraps a related record.
    pub fn new(record: T) -> Self {
        Self::Resolved(Box::new(record))
    }

    /// The related record, if resolved.
    #[must_use]
    pub fn get(&self) -> Option<&T> {
        match self {
            Self::Resolved(record) => Some(record),
            _ => None,
        }
    }

    /// Mutable access to the related record, if resolved.
    ///
    /// Changes made through this reference are persisted with the related
    /// record's own setters and dirty set, not the owner's.
    pub fn get_mut(&mut self) -> Option<&mut T> {
        match self {
            Self::Resolved(record) => Some(record),
            _ => None,
        }
    }

    /// The deferred foreign key, if this relation was lazily loaded.
    #[must_use]
    pub const fn deferred_key(&self) -> Option<RecordId> {
        match self {
            Self::ForeignKey(id) => Some(*id),
            _ => None,
        }
    }

    /// Returns true if the related record is loaded.
    #[must_use]
    pub const fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }

    /// Returns true if there is no related record.
    #[must_use]
    pub const fn is_unset(&self) -> bool {
        matches!(self, Self::Unset)
    }
}

impl<T> From<T> for Related<T> {
    fn from(record: T) -> Self {
        Self::new(record)
    }
}

/// Type-erased access to a relation attribute.
pub trait RelationSlot {
    /// Table of the related record type.
    fn related_table(&self) -> &'static str;

    /// The related id as known right now: the deferred key, or the id of a
    /// saved resolved record.
    fn foreign_key(&self) -> Option<RecordId>;

    /// The deferred foreign key, set only after a lazy load.
    fn deferred_key(&self) -> Option<RecordId>;

    /// The value bound for this attribute in INSERT/UPDATE statements.
    fn bind_value(&self) -> SqlValue {
        match self.foreign_key() {
            #[allow(clippy::cast_possible_wrap)]
            Some(id) => SqlValue::Int(id as i64),
            None => SqlValue::Null,
        }
    }

    /// Makes sure a resolved related record is stored: inserts it when
    /// unsaved, updates it when saved and modified.
    fn persist(&mut self, conn: &mut dyn Connection) -> Result<()>;

    /// Replaces the slot with a deferred key, or clears it for `None`.
    fn defer(&mut self, id: Option<RecordId>);

    /// Loads the related record `id` and stores it in the slot. The slot
    /// is left untouched on failure.
    fn resolve(
        &mut self,
        conn: &mut dyn Connection,
        id: RecordId,
        ctx: &mut LoadContext,
    ) -> Result<()>;
}

impl<T: Record> RelationSlot for Related<T> {
    fn related_table(&self) -> &'static str {
        T::TABLE
    }

    fn foreign_key(&self) -> Option<RecordId> {
        match self {
            Self::Unset => None,
            Self::ForeignKey(id) => Some(*id),
            Self::Resolved(record) => Some(record.id()).filter(|id| *id != 0),
        }
    }

    fn deferred_key(&self) -> Option<RecordId> {
        Self::deferred_key(self)
    }

    fn persist(&mut self, conn: &mut dyn Connection) -> Result<()> {
        let Self::Resolved(record) = self else {
            return Ok(());
        };
        if !record.is_saved() {
            record.insert(conn)
        } else if record.is_modified() {
            record.update(conn)
        } else {
            Ok(())
        }
    }

    fn defer(&mut self, id: Option<RecordId>) {
        *self = id.map_or(Self::Unset, Self::ForeignKey);
    }

    fn resolve(
        &mut self,
        conn: &mut dyn Connection,
        id: RecordId,
        ctx: &mut LoadContext,
    ) -> Result<()> {
        let mut related = T::default();
        persist::load_in(&mut related, conn, id, ctx)?;
        *self = Self::Resolved(Box::new(related));
        Ok(())
    }
}

/// Options for loading records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOptions {
    eager: bool,
    max_depth: usize,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self::eager()
    }
}

impl LoadOptions {
    /// Load related records recursively.
    #[must_use]
    pub const fn eager() -> Self {
        Self {
            eager: true,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Keep only the foreign keys of related records.
    #[must_use]
    pub const fn lazy() -> Self {
        Self {
            eager: false,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Limits how many relation hops an eager load may follow.
    #[must_use]
    pub const fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Returns true for eager loading.
    #[must_use]
    pub const fn is_eager(&self) -> bool {
        self.eager
    }

    /// The configured depth limit.
    #[must_use]
    pub const fn depth_limit(&self) -> usize {
        self.max_depth
    }
}

/// State carried through one (possibly recursive) load.
///
/// Holds the `(table, id)` rows currently being loaded, outermost first.
/// Following a relation back to one of them is a cycle.
#[derive(Debug, Clone)]
pub struct LoadContext {
    options: LoadOptions,
    path: Vec<(&'static str, RecordId)>,
}

impl LoadContext {
    /// Starts a load with `options`.
    #[must_use]
    pub const fn new(options: LoadOptions) -> Self {
        Self {
            options,
            path: Vec::new(),
        }
    }

    /// The options of this load.
    #[must_use]
    pub const fn options(&self) -> LoadOptions {
        self.options
    }

    /// Number of rows currently being loaded.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.path.len()
    }

    /// Checks that following a relation to `table`/`id` neither revisits a
    /// row on the current path nor exceeds the depth limit.
    pub fn check_descend(
        &self,
        table: &'static str,
        id: RecordId,
    ) -> std::result::Result<(), RelationError> {
        if self.path.contains(&(table, id)) {
            return Err(RelationError::Cycle { table, id });
        }
        if self.path.len() > self.options.max_depth {
            return Err(RelationError::DepthExceeded {
                limit: self.options.max_depth,
            });
        }
        Ok(())
    }

    pub(crate) fn push(&mut self, table: &'static str, id: RecordId) {
        self.path.push((table, id));
    }

    pub(crate) fn pop(&mut self) {
        self.path.pop();
    }
}

/// Wraps a failure of a related record into the owner's relation error.
pub(crate) fn failed(table: &'static str, attribute: &str, err: RecordError) -> RecordError {
    RecordError::Relation {
        table,
        attribute: attribute.to_string(),
        source: RelationError::Failed(Box::new(err)),
    }
}
