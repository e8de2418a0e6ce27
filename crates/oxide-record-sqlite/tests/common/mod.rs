#![allow(dead_code)]

use oxide_record::{Connection, DriverError, RecordId, RecordState, Related, Statement};
use oxide_record_derive::Record;
use oxide_record_sqlite::SqliteConnection;

pub const SCHEMA: &str = "
    CREATE TABLE customers (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL
    );
    CREATE TABLE orders (
        id INTEGER PRIMARY KEY,
        total REAL NOT NULL,
        customer_id INTEGER REFERENCES customers (id),
        note TEXT
    );
    CREATE TABLE employees (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL,
        manager_id INTEGER
    );
";

#[derive(Debug, Clone, Default, PartialEq, Record)]
#[record(table = "customers")]
pub struct Customer {
    pub state: RecordState,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Record)]
#[record(table = "orders")]
pub struct Order {
    pub state: RecordState,
    pub total: f64,
    #[record(column = "customer_id")]
    pub customer: Related<Customer>,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Record)]
#[record(table = "employees")]
pub struct Employee {
    pub state: RecordState,
    pub name: String,
    #[record(column = "manager_id")]
    pub manager: Related<Employee>,
}

pub fn customer(name: &str) -> Customer {
    let mut customer = Customer::default();
    customer.set_name(String::from(name));
    customer
}

pub fn order(total: f64, customer: Customer) -> Order {
    let mut order = Order::default();
    order.set_total(total);
    order.set_customer(customer);
    order
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// An in-memory database with the test schema and foreign key
/// enforcement off, so rows can point at missing records.
pub fn setup() -> SqliteConnection {
    init_tracing();
    let conn = SqliteConnection::open_in_memory().expect("open in-memory database");
    conn.set_foreign_keys(false).expect("disable foreign keys");
    conn.execute_batch(SCHEMA).expect("create schema");
    conn
}

/// Records the SQL of every statement prepared through it.
pub struct RecordingConnection {
    pub inner: SqliteConnection,
    pub statements: Vec<String>,
}

impl RecordingConnection {
    pub fn new() -> Self {
        Self {
            inner: setup(),
            statements: Vec::new(),
        }
    }

    /// Returns and forgets the statements recorded so far.
    pub fn take(&mut self) -> Vec<String> {
        std::mem::take(&mut self.statements)
    }

    /// Runs `sql` directly and returns the first column of the first row.
    pub fn query_i64(&self, sql: &str) -> i64 {
        self.inner
            .inner()
            .query_row(sql, [], |row| row.get(0))
            .unwrap_or_else(|e| panic!("query failed: {sql}\nError: {e}"))
    }
}

impl Connection for RecordingConnection {
    fn prepare<'a>(&'a mut self, sql: &str) -> Result<Box<dyn Statement + 'a>, DriverError> {
        self.statements.push(String::from(sql));
        self.inner.prepare(sql)
    }

    fn last_insert_id(&self) -> Option<RecordId> {
        self.inner.last_insert_id()
    }
}
