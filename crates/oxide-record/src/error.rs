//! Error types for record persistence.

use thiserror::Error;

use crate::query::StatementKind;
use crate::schema::RecordId;
use crate::state::{Operation, SaveState};
use crate::value::SqlValue;

/// Errors reported by persistence operations.
///
/// Every failure is terminal for the call that produced it: nothing in this
/// crate retries.
#[derive(Debug, Error)]
pub enum RecordError {
    /// The database refused to prepare a statement.
    #[error("could not prepare {kind} statement on `{table}`: {message}")]
    Prepare {
        /// Kind of the statement.
        kind: StatementKind,
        /// Table the statement targets.
        table: &'static str,
        /// Driver message.
        message: String,
    },

    /// The database rejected the execution of a prepared statement.
    #[error("could not execute {kind} statement on `{table}`: {message}")]
    Exec {
        /// Kind of the statement.
        kind: StatementKind,
        /// Table the statement targets.
        table: &'static str,
        /// Driver message.
        message: String,
    },

    /// A load found no row with the requested id.
    #[error("no row in `{table}` with id {id}")]
    NotFound {
        /// Table that was queried.
        table: &'static str,
        /// Requested id.
        id: RecordId,
    },

    /// The operation is not valid for the record's current save state.
    #[error("cannot {operation} a record that is {state}")]
    State {
        /// The rejected operation.
        operation: Operation,
        /// The state the record was in.
        state: SaveState,
    },

    /// A related record could not be resolved, loaded or persisted.
    #[error("relation `{attribute}` of `{table}`: {source}")]
    Relation {
        /// Table of the record owning the relation.
        table: &'static str,
        /// Name of the relation attribute.
        attribute: String,
        /// What went wrong.
        #[source]
        source: RelationError,
    },

    /// A value read from the database could not be written back.
    #[error("attribute `{attribute}` of `{table}`: {source}")]
    Value {
        /// Table of the record.
        table: &'static str,
        /// Name of the attribute.
        attribute: &'static str,
        /// Conversion failure.
        #[source]
        source: ValueError,
    },
}

impl RecordError {
    /// Follows nested relation failures down to the error that started them.
    #[must_use]
    pub fn innermost(&self) -> &Self {
        match self {
            Self::Relation {
                source: RelationError::Failed(inner),
                ..
            } => inner.innermost(),
            other => other,
        }
    }

    /// Returns true if this is a [`RecordError::NotFound`].
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns true if this is a [`RecordError::State`].
    #[must_use]
    pub const fn is_state(&self) -> bool {
        matches!(self, Self::State { .. })
    }
}

/// Why a relation attribute could not be handled.
#[derive(Debug, Error)]
pub enum RelationError {
    /// The named attribute does not exist or is not a relation.
    #[error("not a relation attribute")]
    UnknownAttribute,

    /// The relation holds no deferred foreign key.
    #[error("not a lazy-loadable relation")]
    NotLazy,

    /// Eager loading came back to a row that is already being loaded.
    #[error("cycle detected at `{table}` id {id}")]
    Cycle {
        /// Table of the revisited row.
        table: &'static str,
        /// Id of the revisited row.
        id: RecordId,
    },

    /// Eager loading went deeper than the configured limit.
    #[error("eager load exceeded the depth limit of {limit}")]
    DepthExceeded {
        /// The configured limit.
        limit: usize,
    },

    /// Loading or persisting the related record failed.
    #[error("{0}")]
    Failed(#[source] Box<RecordError>),
}

/// Conversion failures between [`SqlValue`] and Rust types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    /// The value has the wrong SQL type.
    #[error("expected {expected}, found {found}")]
    Mismatch {
        /// Rust type that was expected.
        expected: &'static str,
        /// SQL type that was found.
        found: &'static str,
    },

    /// The value does not fit the Rust type.
    #[error("value {value} is out of range for {expected}")]
    OutOfRange {
        /// Rust type that was expected.
        expected: &'static str,
        /// The offending value.
        value: String,
    },
}

impl ValueError {
    /// Builds a [`ValueError::Mismatch`] for `value`.
    #[must_use]
    pub const fn mismatch(expected: &'static str, value: &SqlValue) -> Self {
        Self::Mismatch {
            expected,
            found: value.type_name(),
        }
    }
}

/// Result type alias for persistence operations.
pub type Result<T> = std::result::Result<T, RecordError>;
