//! Orders and customers persisted to SQLite.
//!
//! Run with `cargo run -p oxide-record-sqlite --example orders`. Set
//! `DATABASE_URL` to use a file instead of an in-memory database.

use oxide_record::{LoadOptions, Persist, RecordState, Related};
use oxide_record_derive::Record;
use oxide_record_sqlite::SqliteConfig;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Debug, Default, Record)]
#[record(table = "customers")]
struct Customer {
    state: RecordState,
    name: String,
}

#[derive(Debug, Default, Record)]
#[record(table = "orders")]
struct Order {
    state: RecordState,
    total: f64,
    #[record(column = "customer_id")]
    customer: Related<Customer>,
    note: Option<String>,
}

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS customers (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS orders (
        id INTEGER PRIMARY KEY,
        total REAL NOT NULL,
        customer_id INTEGER REFERENCES customers (id),
        note TEXT
    );
";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::DEBUG)
        .with_target(false)
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut config = SqliteConfig::from_env();
    if std::env::var_os(oxide_record_sqlite::DATABASE_URL_ENV).is_none() {
        config = SqliteConfig::from_url("sqlite::memory:");
    }
    let mut conn = config.open()?;
    conn.execute_batch(SCHEMA)?;

    let mut customer = Customer::default();
    customer.set_name(String::from("Ann"));

    let mut order = Order::default();
    order.set_total(42.0);
    order.set_customer(customer);
    order.insert(&mut conn)?;
    info!(order = order.id(), "order inserted with its customer");

    order.set_note(Some(String::from("leave at the door")));
    order.update(&mut conn)?;

    let mut lazy = Order::fetch(&mut conn, order.id(), LoadOptions::lazy())?;
    info!(
        customer_id = lazy.lazy_foreign_key("customer"),
        "loaded order without its customer"
    );
    lazy.load_related(&mut conn, "customer", LoadOptions::eager())?;
    if let Some(customer) = lazy.customer.get() {
        info!(name = %customer.name, total = lazy.total, "resolved customer");
    }

    lazy.delete(&mut conn)?;
    info!(state = %lazy.save_state(), "order deleted");
    Ok(())
}
