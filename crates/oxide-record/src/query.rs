//! Statement synthesis from schema descriptors.
//!
//! The builders are pure: they read a record through its schema and return
//! a [`Query`] holding SQL text plus parameters. Preparing and executing is
//! the engine's job.

use std::fmt;

use crate::schema::{Record, RecordId};
use crate::value::SqlValue;

/// The kind of a synthesized statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    /// `INSERT`
    Insert,
    /// `UPDATE`
    Update,
    /// `DELETE`
    Delete,
    /// `SELECT`
    Select,
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Insert => "INSERT",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
            Self::Select => "SELECT",
        })
    }
}

/// A parameter placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Placeholder {
    /// `:name`, stored without the colon.
    Named(&'static str),
    /// `?`, 1-based.
    Positional(usize),
}

impl fmt::Display for Placeholder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(name) => write!(f, ":{name}"),
            Self::Positional(index) => write!(f, "?{index}"),
        }
    }
}

/// A statement ready to be prepared and bound.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    kind: StatementKind,
    table: &'static str,
    sql: String,
    params: Vec<(Placeholder, SqlValue)>,
}

impl Query {
    /// The statement kind.
    #[must_use]
    pub const fn kind(&self) -> StatementKind {
        self.kind
    }

    /// The target table.
    #[must_use]
    pub const fn table(&self) -> &'static str {
        self.table
    }

    /// The SQL text.
    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// The parameters, in binding order.
    #[must_use]
    pub fn params(&self) -> &[(Placeholder, SqlValue)] {
        &self.params
    }

    /// The value bound to the named placeholder `name`.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&SqlValue> {
        self.params.iter().find_map(|(placeholder, value)| match placeholder {
            Placeholder::Named(n) if *n == name => Some(value),
            _ => None,
        })
    }
}

/// Column used for the identity in every statement.
pub const ID_COLUMN: &str = "id";

/// Builds `INSERT INTO <table> (<cols>) VALUES (:<attrs>)` over every
/// persistent attribute, in schema order.
///
/// A record without persistent attributes is inserted with
/// `DEFAULT VALUES`.
pub fn insert<R: Record>(record: &R) -> Query {
    let schema = R::schema();
    let attributes = schema.attributes();

    let mut sql = format!("INSERT INTO {}", schema.table());
    if attributes.is_empty() {
        sql.push_str(" DEFAULT VALUES");
    } else {
        let columns: Vec<&str> = attributes.iter().map(|a| a.column()).collect();
        let placeholders: Vec<String> = attributes.iter().map(|a| format!(":{}", a.name())).collect();
        sql.push_str(" (");
        sql.push_str(&columns.join(", "));
        sql.push_str(") VALUES (");
        sql.push_str(&placeholders.join(", "));
        sql.push(')');
    }

    let params = attributes
        .iter()
        .map(|a| (Placeholder::Named(a.name()), a.bind_value(record)))
        .collect();

    Query {
        kind: StatementKind::Insert,
        table: schema.table(),
        sql,
        params,
    }
}

/// Builds `UPDATE <table> SET <col> = :<attr>, ... WHERE id = :id` from the
/// record's dirty set, in the order the set yields.
///
/// Dirty names that are not persistent attributes are ignored. Returns
/// `None` when nothing is left to set.
pub fn update<R: Record>(record: &R) -> Option<Query> {
    let schema = R::schema();
    let dirty = record.state().dirty().modified_attributes();

    let attributes: Vec<_> = dirty
        .iter()
        .filter_map(|name| schema.attribute(name))
        .collect();
    if attributes.is_empty() {
        return None;
    }

    let assignments: Vec<String> = attributes
        .iter()
        .map(|a| format!("{} = :{}", a.column(), a.name()))
        .collect();
    let sql = format!(
        "UPDATE {} SET {} WHERE {ID_COLUMN} = :{ID_COLUMN}",
        schema.table(),
        assignments.join(", ")
    );

    let mut params: Vec<_> = attributes
        .iter()
        .map(|a| (Placeholder::Named(a.name()), a.bind_value(record)))
        .collect();
    params.push((Placeholder::Named(ID_COLUMN), id_value(record.state().id())));

    Some(Query {
        kind: StatementKind::Update,
        table: schema.table(),
        sql,
        params,
    })
}

/// Builds `DELETE FROM <table> WHERE id = ?`.
pub fn delete<R: Record>(record: &R) -> Query {
    let table = R::schema().table();
    Query {
        kind: StatementKind::Delete,
        table,
        sql: format!("DELETE FROM {table} WHERE {ID_COLUMN} = ?"),
        params: vec![(Placeholder::Positional(1), id_value(record.state().id()))],
    }
}

/// Builds `SELECT <cols> FROM <table> WHERE id = :id`.
pub fn select_by_id<R: Record>(id: RecordId) -> Query {
    let schema = R::schema();
    let columns: Vec<&str> = schema.columns().collect();
    let projection = if columns.is_empty() {
        String::from(ID_COLUMN)
    } else {
        columns.join(", ")
    };

    Query {
        kind: StatementKind::Select,
        table: schema.table(),
        sql: format!(
            "SELECT {projection} FROM {} WHERE {ID_COLUMN} = :{ID_COLUMN}",
            schema.table()
        ),
        params: vec![(Placeholder::Named(ID_COLUMN), id_value(id))],
    }
}

#[allow(clippy::cast_possible_wrap)]
const fn id_value(id: RecordId) -> SqlValue {
    SqlValue::Int(id as i64)
}
