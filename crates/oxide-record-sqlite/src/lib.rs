//! # oxide-record-sqlite
//!
//! SQLite backend for `oxide-record`, built on `rusqlite`.
//!
//! [`SqliteConnection`] implements `oxide_record::Connection`, so every
//! persistence operation of `oxide_record::Persist` runs against it.
//!
//! # How SQLite is used
//!
//! - **Placeholders**: `:name` parameters are resolved with
//!   [`sqlite3_bind_parameter_index`], `?` parameters are bound by
//!   position.
//! - **Identity**: the generated id of an insert is the [rowid] of the new
//!   row, so tables are expected to declare `id INTEGER PRIMARY KEY`.
//! - **[Type affinity]**: values are bound as `NULL`, `INTEGER`, `REAL`,
//!   `TEXT` or `BLOB`; booleans are stored as `0`/`1`.
//! - **Foreign keys**: the default depends on how SQLite was built;
//!   [`SqliteConfig`] always sets the `foreign_keys` pragma, on unless
//!   configured otherwise.
//!
//! [`sqlite3_bind_parameter_index`]: https://www.sqlite.org/c3ref/bind_parameter_index.html
//! [rowid]: https://www.sqlite.org/lang_createtable.html#rowid
//! [Type affinity]: https://www.sqlite.org/datatype3.html
//!
//! ## Example
//!
//! ```ignore
//! use oxide_record::{LoadOptions, Persist};
//! use oxide_record_sqlite::SqliteConfig;
//!
//! let mut conn = SqliteConfig::from_env().open()?;
//!
//! let mut order = Order::default();
//! order.set_total(42.0);
//! order.insert(&mut conn)?;
//!
//! let loaded = Order::fetch(&mut conn, order.id(), LoadOptions::lazy())?;
//! ```

mod config;
mod connection;
mod error;

pub use config::{Location, SqliteConfig, DATABASE_URL_ENV, DEFAULT_DATABASE_URL};
pub use connection::SqliteConnection;
pub use error::{Result, SqliteError};
