//! # oxide-record
//!
//! Active-record persistence for plain Rust structs.
//!
//! A record type describes its table and persistent attributes once, in a
//! static [`Schema`]. From that description the crate synthesizes
//! `INSERT`, `UPDATE`, `DELETE` and `SELECT` statements, tracks which
//! attributes were modified since the last save, and walks relations to
//! other records, either eagerly or by keeping the foreign key for later.
//!
//! The database is reached through the small [`Connection`] trait. The
//! `oxide-record-sqlite` crate implements it for SQLite.
//!
//! ## Quick Start
//!
//! ```ignore
//! use oxide_record::{LoadOptions, Persist, Record, RecordState, Related};
//! use oxide_record_derive::Record;
//!
//! #[derive(Debug, Default, Record)]
//! #[record(table = "customers")]
//! struct Customer {
//!     state: RecordState,
//!     name: String,
//! }
//!
//! #[derive(Debug, Default, Record)]
//! #[record(table = "orders")]
//! struct Order {
//!     state: RecordState,
//!     total: f64,
//!     #[record(column = "customer_id")]
//!     customer: Related<Customer>,
//! }
//!
//! fn example(conn: &mut dyn oxide_record::Connection) -> oxide_record::Result<()> {
//!     let mut customer = Customer::default();
//!     customer.set_name("Ann");
//!
//!     let mut order = Order::default();
//!     order.set_total(42.0);
//!     order.set_customer(customer);
//!     order.insert(conn)?; // inserts the customer, then the order
//!
//!     order.set_total(40.0);
//!     order.update(conn)?; // UPDATE orders SET total = :total WHERE id = :id
//!
//!     let loaded = Order::fetch(conn, order.id(), LoadOptions::eager())?;
//!     assert_eq!(loaded.customer.get().map(|c| c.name.as_str()), Some("Ann"));
//!     Ok(())
//! }
//! ```
//!
//! ## Save states
//!
//! Every record is [`SaveState::Unsaved`], [`SaveState::Saved`] or
//! [`SaveState::Gone`]. Operations that do not apply to the current state
//! fail with [`RecordError::State`] and touch neither the database nor the
//! record.

mod connection;
mod dirty;
mod error;
mod persist;
pub mod query;
pub mod relation;
mod schema;
mod state;
mod value;

#[cfg(test)]
mod test_fixtures;

pub use connection::{Connection, DriverError, Row, Statement};
pub use dirty::DirtyTracker;
pub use error::{RecordError, RelationError, Result, ValueError};
pub use persist::Persist;
pub use query::{Placeholder, Query, StatementKind};
pub use relation::{LoadContext, LoadOptions, Related, RelationSlot};
pub use schema::{Access, Attribute, ReadFn, Record, RecordId, Schema, SlotFn, SlotMutFn, WriteFn};
pub use state::{Operation, RecordState, SaveState};
pub use value::{FromSqlValue, SqlValue, ToSqlValue};
