//! [`Connection`] implementation over `rusqlite`.

use std::path::Path;

use oxide_record::{Connection, DriverError, Placeholder, RecordId, Row, SqlValue, Statement};
use rusqlite::types::{Value, ValueRef};
use tracing::debug;

use crate::error::Result;

/// A SQLite database connection usable by the persistence engine.
///
/// ```ignore
/// use oxide_record::{LoadOptions, Persist};
/// use oxide_record_sqlite::SqliteConnection;
///
/// let mut conn = SqliteConnection::open_in_memory()?;
/// conn.execute_batch("CREATE TABLE customers (id INTEGER PRIMARY KEY, name TEXT NOT NULL)")?;
///
/// let mut customer = Customer::default();
/// customer.set_name(String::from("Ann"));
/// customer.insert(&mut conn)?;
/// ```
#[derive(Debug)]
pub struct SqliteConnection {
    conn: rusqlite::Connection,
}

impl SqliteConnection {
    /// Opens a database file, creating it if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if SQLite cannot open the file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = rusqlite::Connection::open(path)?;
        debug!(path = %path.display(), "opened sqlite database");
        Ok(Self { conn })
    }

    /// Opens a private in-memory database.
    ///
    /// # Errors
    ///
    /// Returns an error if SQLite cannot allocate the database.
    pub fn open_in_memory() -> Result<Self> {
        let conn = rusqlite::Connection::open_in_memory()?;
        debug!("opened in-memory sqlite database");
        Ok(Self { conn })
    }

    /// Wraps an already opened `rusqlite` connection.
    #[must_use]
    pub const fn from_rusqlite(conn: rusqlite::Connection) -> Self {
        Self { conn }
    }

    /// Runs one or more `;`-separated statements, typically schema setup.
    ///
    /// # Errors
    ///
    /// Returns the first error SQLite reports.
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        self.conn.execute_batch(sql)?;
        Ok(())
    }

    /// Turns enforcement of `FOREIGN KEY` constraints on or off.
    ///
    /// # Errors
    ///
    /// Returns an error if the pragma cannot be set.
    pub fn set_foreign_keys(&self, enabled: bool) -> Result<()> {
        self.conn.pragma_update(None, "foreign_keys", enabled)?;
        debug!(enabled, "set foreign_keys pragma");
        Ok(())
    }

    /// The underlying `rusqlite` connection.
    #[must_use]
    pub const fn inner(&self) -> &rusqlite::Connection {
        &self.conn
    }
}

impl Connection for SqliteConnection {
    fn prepare<'a>(&'a mut self, sql: &str) -> std::result::Result<Box<dyn Statement + 'a>, DriverError> {
        let inner = self.conn.prepare(sql).map_err(driver_error)?;
        Ok(Box::new(SqliteStatement { inner }))
    }

    fn last_insert_id(&self) -> Option<RecordId> {
        RecordId::try_from(self.conn.last_insert_rowid())
            .ok()
            .filter(|id| *id != 0)
    }
}

struct SqliteStatement<'conn> {
    inner: rusqlite::Statement<'conn>,
}

impl Statement for SqliteStatement<'_> {
    fn bind(
        &mut self,
        placeholder: &Placeholder,
        value: &SqlValue,
    ) -> std::result::Result<(), DriverError> {
        let index = match placeholder {
            Placeholder::Named(name) => {
                let key = format!(":{name}");
                self.inner
                    .parameter_index(&key)
                    .map_err(driver_error)?
                    .ok_or_else(|| DriverError::new(format!("unknown parameter {key}")))?
            }
            Placeholder::Positional(index) => *index,
        };
        self.inner
            .raw_bind_parameter(index, to_sqlite(value))
            .map_err(driver_error)
    }

    fn execute(&mut self) -> std::result::Result<usize, DriverError> {
        self.inner.raw_execute().map_err(driver_error)
    }

    fn fetch_first(&mut self) -> std::result::Result<Option<Row>, DriverError> {
        let names: Vec<String> = self
            .inner
            .column_names()
            .into_iter()
            .map(String::from)
            .collect();

        let mut rows = self.inner.raw_query();
        let Some(row) = rows.next().map_err(driver_error)? else {
            return Ok(None);
        };

        let mut columns = Vec::with_capacity(names.len());
        for (index, name) in names.into_iter().enumerate() {
            let value = row.get_ref(index).map_err(driver_error)?;
            columns.push((name, from_sqlite(value)?));
        }
        Ok(Some(Row::new(columns)))
    }
}

fn driver_error(err: rusqlite::Error) -> DriverError {
    DriverError::new(err.to_string())
}

fn to_sqlite(value: &SqlValue) -> Value {
    match value {
        SqlValue::Null => Value::Null,
        SqlValue::Bool(b) => Value::Integer(i64::from(*b)),
        SqlValue::Int(n) => Value::Integer(*n),
        SqlValue::Float(x) => Value::Real(*x),
        SqlValue::Text(s) => Value::Text(s.clone()),
        SqlValue::Blob(b) => Value::Blob(b.clone()),
    }
}

fn from_sqlite(value: ValueRef<'_>) -> std::result::Result<SqlValue, DriverError> {
    Ok(match value {
        ValueRef::Null => SqlValue::Null,
        ValueRef::Integer(n) => SqlValue::Int(n),
        ValueRef::Real(x) => SqlValue::Float(x),
        ValueRef::Text(bytes) => SqlValue::Text(
            std::str::from_utf8(bytes)
                .map_err(|e| DriverError::new(format!("invalid UTF-8 in text column: {e}")))?
                .to_owned(),
        ),
        ValueRef::Blob(bytes) => SqlValue::Blob(bytes.to_vec()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> SqliteConnection {
        let conn = SqliteConnection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE items (id INTEGER PRIMARY KEY, label TEXT, weight REAL, data BLOB, flag INTEGER)",
        )
        .unwrap();
        conn
    }

    #[test]
    fn test_named_and_positional_binding() {
        let mut conn = setup();
        {
            let mut statement = conn
                .prepare("INSERT INTO items (label, weight) VALUES (:label, ?2)")
                .unwrap();
            statement
                .bind(&Placeholder::Named("label"), &SqlValue::Text(String::from("box")))
                .unwrap();
            statement
                .bind(&Placeholder::Positional(2), &SqlValue::Float(1.5))
                .unwrap();
            assert_eq!(statement.execute().unwrap(), 1);
        }
        assert_eq!(conn.last_insert_id(), Some(1));

        let mut statement = conn
            .prepare("SELECT label, weight FROM items WHERE id = :id")
            .unwrap();
        statement
            .bind(&Placeholder::Named("id"), &SqlValue::Int(1))
            .unwrap();
        let row = statement.fetch_first().unwrap().unwrap();
        assert_eq!(row.get("label"), Some(&SqlValue::Text(String::from("box"))));
        assert_eq!(row.get("weight"), Some(&SqlValue::Float(1.5)));
    }

    #[test]
    fn test_unknown_named_parameter() {
        let mut conn = setup();
        let mut statement = conn.prepare("SELECT label FROM items WHERE id = :id").unwrap();
        let err = statement
            .bind(&Placeholder::Named("missing"), &SqlValue::Int(1))
            .unwrap_err();
        assert_eq!(err.message(), "unknown parameter :missing");
    }

    #[test]
    fn test_prepare_error_carries_driver_message() {
        let mut conn = setup();
        let Err(err) = conn.prepare("SELECT * FROM nowhere") else {
            panic!("expected a prepare error");
        };
        assert!(err.message().contains("no such table"), "{err}");
    }

    #[test]
    fn test_fetch_first_without_rows() {
        let mut conn = setup();
        let mut statement = conn.prepare("SELECT label FROM items").unwrap();
        assert!(statement.fetch_first().unwrap().is_none());
    }

    #[test]
    fn test_value_conversions() {
        let mut conn = setup();
        {
            let mut statement = conn
                .prepare("INSERT INTO items (label, data, flag) VALUES (:label, :data, :flag)")
                .unwrap();
            statement
                .bind(&Placeholder::Named("label"), &SqlValue::Null)
                .unwrap();
            statement
                .bind(&Placeholder::Named("data"), &SqlValue::Blob(vec![1, 2, 3]))
                .unwrap();
            statement
                .bind(&Placeholder::Named("flag"), &SqlValue::Bool(true))
                .unwrap();
            statement.execute().unwrap();
        }

        let mut statement = conn.prepare("SELECT label, data, flag FROM items").unwrap();
        let row = statement.fetch_first().unwrap().unwrap();
        assert_eq!(row.get("label"), Some(&SqlValue::Null));
        assert_eq!(row.get("data"), Some(&SqlValue::Blob(vec![1, 2, 3])));
        assert_eq!(row.get("flag"), Some(&SqlValue::Int(1)));
    }

    #[test]
    fn test_last_insert_id_before_any_insert() {
        let conn = setup();
        assert_eq!(conn.last_insert_id(), None);
    }
}
