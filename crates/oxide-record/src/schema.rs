//! Schema descriptors for persistable records.
//!
//! A [`Schema`] is a static table built once per record type, usually by
//! `#[derive(Record)]`. It lists the persistent attributes in declaration
//! order (the identity is not one of them) together with typed accessor
//! functions, so the engine never needs an instance to know the shape of a
//! type.

use std::fmt;

use crate::error::ValueError;
use crate::relation::RelationSlot;
use crate::state::RecordState;
use crate::value::SqlValue;

/// Database identity of a record. `0` means "not saved".
pub type RecordId = u64;

/// A type that can be persisted to a table.
///
/// `TABLE` is a required associated constant, so a type without a table
/// name does not compile as a record.
///
/// # Example
///
/// ```ignore
/// use oxide_record::{Record, Related, RecordState};
///
/// #[derive(Debug, Default, Record)]
/// #[record(table = "orders")]
/// struct Order {
///     state: RecordState,
///     total: f64,
///     customer: Related<Customer>,
/// }
/// ```
pub trait Record: Default + 'static {
    /// The SQL table name.
    const TABLE: &'static str;

    /// The static schema descriptor for this type.
    fn schema() -> &'static Schema<Self>;

    /// Identity, dirty set and deletion marker.
    fn state(&self) -> &RecordState;

    /// Mutable access to the bookkeeping.
    fn state_mut(&mut self) -> &mut RecordState;
}

/// Reads a scalar attribute as a SQL value.
pub type ReadFn<R> = fn(&R) -> SqlValue;
/// Writes a SQL value read from a row into a scalar attribute.
pub type WriteFn<R> = fn(&mut R, SqlValue) -> Result<(), ValueError>;
/// Borrows the slot of a relation attribute.
pub type SlotFn<R> = fn(&R) -> &dyn RelationSlot;
/// Mutably borrows the slot of a relation attribute.
pub type SlotMutFn<R> = fn(&mut R) -> &mut dyn RelationSlot;

/// How an attribute is read and written.
pub enum Access<R: 'static> {
    /// A plain column value.
    Value {
        /// Reader.
        read: ReadFn<R>,
        /// Writer.
        write: WriteFn<R>,
    },
    /// A reference to another record, stored as its id.
    Relation {
        /// Slot accessor.
        slot: SlotFn<R>,
        /// Mutable slot accessor.
        slot_mut: SlotMutFn<R>,
    },
}

/// A persistent attribute descriptor.
pub struct Attribute<R: 'static> {
    name: &'static str,
    column: &'static str,
    access: Access<R>,
}

impl<R: 'static> Attribute<R> {
    /// Describes a scalar attribute.
    #[must_use]
    pub const fn value(
        name: &'static str,
        column: &'static str,
        read: ReadFn<R>,
        write: WriteFn<R>,
    ) -> Self {
        Self {
            name,
            column,
            access: Access::Value { read, write },
        }
    }

    /// Describes a relation attribute.
    #[must_use]
    pub const fn relation(
        name: &'static str,
        column: &'static str,
        slot: SlotFn<R>,
        slot_mut: SlotMutFn<R>,
    ) -> Self {
        Self {
            name,
            column,
            access: Access::Relation { slot, slot_mut },
        }
    }

    /// Attribute name, as used by setters, the dirty set and placeholders.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Column name.
    #[must_use]
    pub const fn column(&self) -> &'static str {
        self.column
    }

    /// The accessors.
    #[must_use]
    pub const fn access(&self) -> &Access<R> {
        &self.access
    }

    /// Returns true if the attribute references another record.
    #[must_use]
    pub const fn is_relation(&self) -> bool {
        matches!(self.access, Access::Relation { .. })
    }

    /// The value bound for this attribute when writing `record`.
    ///
    /// Relation attributes bind the related record's id, or `NULL`.
    pub fn bind_value(&self, record: &R) -> SqlValue {
        match &self.access {
            Access::Value { read, .. } => read(record),
            Access::Relation { slot, .. } => slot(record).bind_value(),
        }
    }
}

impl<R: 'static> fmt::Debug for Attribute<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attribute")
            .field("name", &self.name)
            .field("column", &self.column)
            .field("relation", &self.is_relation())
            .finish()
    }
}

/// The ordered persistent attributes of a record type plus its table.
pub struct Schema<R: 'static> {
    table: &'static str,
    attributes: &'static [Attribute<R>],
}

impl<R: 'static> Schema<R> {
    /// Creates a schema descriptor.
    #[must_use]
    pub const fn new(table: &'static str, attributes: &'static [Attribute<R>]) -> Self {
        Self { table, attributes }
    }

    /// The table name.
    #[must_use]
    pub const fn table(&self) -> &'static str {
        self.table
    }

    /// All persistent attributes in declaration order.
    #[must_use]
    pub const fn attributes(&self) -> &'static [Attribute<R>] {
        self.attributes
    }

    /// Looks up an attribute by name.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&'static Attribute<R>> {
        self.attributes.iter().find(|attr| attr.name == name)
    }

    /// Column names in declaration order.
    pub fn columns(&self) -> impl Iterator<Item = &'static str> {
        self.attributes.iter().map(|attr| attr.column)
    }

    /// The relation attributes in declaration order.
    pub fn relations(&self) -> impl Iterator<Item = &'static Attribute<R>> {
        self.attributes.iter().filter(|attr| attr.is_relation())
    }
}

impl<R: 'static> fmt::Debug for Schema<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("table", &self.table)
            .field("attributes", &self.attributes)
            .finish()
    }
}
