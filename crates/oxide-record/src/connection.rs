//! The database capability the engine runs against.
//!
//! Backends implement [`Connection`] and [`Statement`]. Everything is
//! synchronous: each call blocks until the database answers, and a
//! statement lives for a single engine operation.

use std::fmt;

use crate::query::Placeholder;
use crate::schema::RecordId;
use crate::value::SqlValue;

/// An error reported by the database driver, carrying its own message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverError {
    message: String,
}

impl DriverError {
    /// Wraps a driver message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The driver message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Consumes the error, returning the driver message.
    #[must_use]
    pub fn into_message(self) -> String {
        self.message
    }
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for DriverError {}

/// A connection able to prepare statements.
pub trait Connection {
    /// Prepares `sql`, which may use `:name` or `?` placeholders.
    fn prepare<'a>(&'a mut self, sql: &str) -> Result<Box<dyn Statement + 'a>, DriverError>;

    /// The id generated by the most recent successful insert, if any.
    fn last_insert_id(&self) -> Option<RecordId>;
}

/// A prepared statement.
pub trait Statement {
    /// Binds `value` to `placeholder`.
    fn bind(&mut self, placeholder: &Placeholder, value: &SqlValue) -> Result<(), DriverError>;

    /// Executes a statement that returns no rows, returning the number of
    /// affected rows.
    fn execute(&mut self) -> Result<usize, DriverError>;

    /// Executes a query and returns its first row, if any.
    fn fetch_first(&mut self) -> Result<Option<Row>, DriverError>;
}

/// A row read back from the database, addressed by column name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: Vec<(String, SqlValue)>,
}

impl Row {
    /// Creates a row from `(column, value)` pairs.
    #[must_use]
    pub const fn new(columns: Vec<(String, SqlValue)>) -> Self {
        Self { columns }
    }

    /// Returns the value of `column`.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    /// Removes and returns the value of `column`.
    pub fn take(&mut self, column: &str) -> Option<SqlValue> {
        let index = self.columns.iter().position(|(name, _)| name == column)?;
        Some(self.columns.swap_remove(index).1)
    }

    /// The column names, in the order the database returned them.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    /// Number of columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Returns true if the row has no columns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_lookup_by_name() {
        let mut row = Row::new(vec![
            (String::from("total"), SqlValue::Float(42.0)),
            (String::from("customer"), SqlValue::Int(7)),
        ]);

        assert_eq!(row.get("customer"), Some(&SqlValue::Int(7)));
        assert_eq!(row.get("missing"), None);
        assert_eq!(row.take("customer"), Some(SqlValue::Int(7)));
        assert_eq!(row.get("customer"), None);
        assert_eq!(row.len(), 1);
    }

    #[test]
    fn test_driver_error_message() {
        let err = DriverError::new("no such table: orders");
        assert_eq!(err.to_string(), "no such table: orders");
        assert_eq!(err.into_message(), "no such table: orders");
    }
}
