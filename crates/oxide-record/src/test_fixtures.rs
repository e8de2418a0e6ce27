//! Hand-written records and a scripted connection for unit tests.

use std::collections::VecDeque;

use crate::connection::{Connection, DriverError, Row, Statement};
use crate::error::ValueError;
use crate::query::Placeholder;
use crate::relation::{Related, RelationSlot};
use crate::schema::{Attribute, Record, RecordId, Schema};
use crate::state::RecordState;
use crate::value::{FromSqlValue, SqlValue, ToSqlValue};

// =============================================================================
// Records
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Customer {
    pub state: RecordState,
    pub name: String,
}

impl Customer {
    pub fn named(name: &str) -> Self {
        let mut customer = Self::default();
        customer.set_name(name);
        customer
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
        self.state.mark_modified("name");
    }
}

fn customer_read_name(record: &Customer) -> SqlValue {
    record.name.to_sql_value()
}

fn customer_write_name(record: &mut Customer, value: SqlValue) -> Result<(), ValueError> {
    record.name = String::from_sql_value(value)?;
    Ok(())
}

static CUSTOMER_SCHEMA: Schema<Customer> = Schema::new(
    "customers",
    &[Attribute::value(
        "name",
        "name",
        customer_read_name,
        customer_write_name,
    )],
);

impl Record for Customer {
    const TABLE: &'static str = "customers";

    fn schema() -> &'static Schema<Self> {
        &CUSTOMER_SCHEMA
    }

    fn state(&self) -> &RecordState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut RecordState {
        &mut self.state
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Order {
    pub state: RecordState,
    pub total: f64,
    pub customer: Related<Customer>,
    pub note: Option<String>,
}

impl Order {
    pub fn set_total(&mut self, total: f64) {
        self.total = total;
        self.state.mark_modified("total");
    }

    pub fn set_customer(&mut self, customer: Customer) {
        self.customer = Related::new(customer);
        self.state.mark_modified("customer");
    }

    pub fn set_note(&mut self, note: Option<String>) {
        self.note = note;
        self.state.mark_modified("note");
    }
}

fn order_read_total(record: &Order) -> SqlValue {
    record.total.to_sql_value()
}

fn order_write_total(record: &mut Order, value: SqlValue) -> Result<(), ValueError> {
    record.total = f64::from_sql_value(value)?;
    Ok(())
}

fn order_customer(record: &Order) -> &dyn RelationSlot {
    &record.customer
}

fn order_customer_mut(record: &mut Order) -> &mut dyn RelationSlot {
    &mut record.customer
}

fn order_read_note(record: &Order) -> SqlValue {
    record.note.to_sql_value()
}

fn order_write_note(record: &mut Order, value: SqlValue) -> Result<(), ValueError> {
    record.note = Option::from_sql_value(value)?;
    Ok(())
}

static ORDER_SCHEMA: Schema<Order> = Schema::new(
    "orders",
    &[
        Attribute::value("total", "total", order_read_total, order_write_total),
        Attribute::relation(
            "customer",
            "customer_id",
            order_customer,
            order_customer_mut,
        ),
        Attribute::value("note", "note", order_read_note, order_write_note),
    ],
);

impl Record for Order {
    const TABLE: &'static str = "orders";

    fn schema() -> &'static Schema<Self> {
        &ORDER_SCHEMA
    }

    fn state(&self) -> &RecordState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut RecordState {
        &mut self.state
    }
}

/// A self-referencing record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Employee {
    pub state: RecordState,
    pub name: String,
    pub manager: Related<Employee>,
}

fn employee_read_name(record: &Employee) -> SqlValue {
    record.name.to_sql_value()
}

fn employee_write_name(record: &mut Employee, value: SqlValue) -> Result<(), ValueError> {
    record.name = String::from_sql_value(value)?;
    Ok(())
}

fn employee_manager(record: &Employee) -> &dyn RelationSlot {
    &record.manager
}

fn employee_manager_mut(record: &mut Employee) -> &mut dyn RelationSlot {
    &mut record.manager
}

static EMPLOYEE_SCHEMA: Schema<Employee> = Schema::new(
    "employees",
    &[
        Attribute::value("name", "name", employee_read_name, employee_write_name),
        Attribute::relation(
            "manager",
            "manager_id",
            employee_manager,
            employee_manager_mut,
        ),
    ],
);

impl Record for Employee {
    const TABLE: &'static str = "employees";

    fn schema() -> &'static Schema<Self> {
        &EMPLOYEE_SCHEMA
    }

    fn state(&self) -> &RecordState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut RecordState {
        &mut self.state
    }
}

// =============================================================================
// Scripted connection
// =============================================================================

/// A statement as the scripted connection saw it.
#[derive(Debug, Clone, PartialEq)]
pub struct Executed {
    pub sql: String,
    pub params: Vec<(Placeholder, SqlValue)>,
}

impl Executed {
    pub fn param(&self, name: &str) -> Option<&SqlValue> {
        self.params.iter().find_map(|(placeholder, value)| match placeholder {
            Placeholder::Named(n) if *n == name => Some(value),
            _ => None,
        })
    }
}

/// Records every executed statement and answers queries from a queue.
///
/// Inserts are assigned increasing ids starting at 1.
#[derive(Debug, Default)]
pub struct ScriptedConnection {
    pub executed: Vec<Executed>,
    pub rows: VecDeque<Row>,
    pub fail_prepare: Option<&'static str>,
    pub fail_execute: Option<&'static str>,
    next_id: RecordId,
    last_id: Option<RecordId>,
}

impl ScriptedConnection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a row returned by the next query.
    pub fn push_row(&mut self, columns: &[(&str, SqlValue)]) {
        self.rows.push_back(Row::new(
            columns
                .iter()
                .map(|(name, value)| (String::from(*name), value.clone()))
                .collect(),
        ));
    }

    pub fn statements(&self) -> Vec<&str> {
        self.executed.iter().map(|e| e.sql.as_str()).collect()
    }
}

struct ScriptedStatement<'a> {
    conn: &'a mut ScriptedConnection,
    sql: String,
    params: Vec<(Placeholder, SqlValue)>,
}

impl ScriptedStatement<'_> {
    fn record(&mut self) -> Result<(), DriverError> {
        if let Some(pattern) = self.conn.fail_execute {
            if self.sql.contains(pattern) {
                return Err(DriverError::new("constraint failed"));
            }
        }
        self.conn.executed.push(Executed {
            sql: self.sql.clone(),
            params: self.params.clone(),
        });
        Ok(())
    }
}

impl Statement for ScriptedStatement<'_> {
    fn bind(&mut self, placeholder: &Placeholder, value: &SqlValue) -> Result<(), DriverError> {
        self.params.push((placeholder.clone(), value.clone()));
        Ok(())
    }

    fn execute(&mut self) -> Result<usize, DriverError> {
        self.record()?;
        if self.sql.starts_with("INSERT") {
            self.conn.next_id += 1;
            self.conn.last_id = Some(self.conn.next_id);
        }
        Ok(1)
    }

    fn fetch_first(&mut self) -> Result<Option<Row>, DriverError> {
        self.record()?;
        Ok(self.conn.rows.pop_front())
    }
}

impl Connection for ScriptedConnection {
    fn prepare<'a>(&'a mut self, sql: &str) -> Result<Box<dyn Statement + 'a>, DriverError> {
        if let Some(pattern) = self.fail_prepare {
            if sql.contains(pattern) {
                return Err(DriverError::new("no such table"));
            }
        }
        Ok(Box::new(ScriptedStatement {
            conn: self,
            sql: String::from(sql),
            params: Vec::new(),
        }))
    }

    fn last_insert_id(&self) -> Option<RecordId> {
        self.last_id
    }
}
