//! The persistence engine.
//!
//! [`Persist`] is implemented for every [`Record`] and carries the save-state
//! machine:
//!
//! ```text
//! Unsaved --insert--> Saved --delete--> Gone
//!    |                 ^  |
//!    +------load-------+  +--update (dirty attributes only)
//! ```
//!
//! Every operation prepares its statement, binds it and executes it within
//! the call. Failures are returned once, logged with the driver message,
//! and never retried.

use std::collections::BTreeSet;

use tracing::{debug, error, warn};

use crate::connection::{Connection, DriverError, Statement};
use crate::error::{RecordError, RelationError, Result, ValueError};
use crate::query::{self, Query, StatementKind};
use crate::relation::{self, LoadContext, LoadOptions};
use crate::schema::{Access, Attribute, Record, RecordId};
use crate::state::{Operation, SaveState};
use crate::value::SqlValue;

/// Persistence operations available on every [`Record`].
///
/// # Example
///
/// ```ignore
/// use oxide_record::{LoadOptions, Persist};
///
/// let mut order = Order::default();
/// order.set_total(42.0);
/// order.set_customer(Customer::named("Ann"));
/// order.insert(&mut conn)?; // inserts the customer first
///
/// order.set_total(40.0);
/// order.update(&mut conn)?; // UPDATE orders SET total = :total WHERE id = :id
///
/// let lazy = Order::fetch(&mut conn, order.id(), LoadOptions::lazy())?;
/// assert_eq!(lazy.lazy_foreign_key("customer"), order.customer.get().map(|c| c.id()));
/// ```
pub trait Persist: Record {
    /// The database id, `0` while unsaved.
    fn id(&self) -> RecordId {
        self.state().id()
    }

    /// The current save state.
    fn save_state(&self) -> SaveState {
        self.state().save_state()
    }

    /// Returns true if the record is backed by a row.
    fn is_saved(&self) -> bool {
        self.save_state() == SaveState::Saved
    }

    /// Returns true if any attribute was modified since the record was
    /// created, loaded or last saved.
    fn is_modified(&self) -> bool {
        self.state().dirty().is_modified()
    }

    /// The attributes modified since the record was created, loaded or last
    /// saved.
    fn modified_attributes(&self) -> &BTreeSet<&'static str> {
        self.state().dirty().modified_attributes()
    }

    /// The deferred foreign key of the relation `attribute`, if it was
    /// lazily loaded and not resolved yet.
    fn lazy_foreign_key(&self, attribute: &str) -> Option<RecordId> {
        match Self::schema().attribute(attribute).map(Attribute::access) {
            Some(Access::Relation { slot, .. }) => slot(self).deferred_key(),
            _ => None,
        }
    }

    /// Inserts the record and assigns it the generated id.
    ///
    /// Resolved related records are stored first: unsaved ones are
    /// inserted, modified ones updated. Only valid while unsaved.
    fn insert(&mut self, conn: &mut dyn Connection) -> Result<()> {
        insert(self, conn)
    }

    /// Writes the modified attributes.
    ///
    /// Succeeds without touching the database when nothing was modified.
    /// Modified relations are stored before the record itself. Only valid
    /// while saved.
    fn update(&mut self, conn: &mut dyn Connection) -> Result<()> {
        update(self, conn)
    }

    /// Inserts an unsaved record, updates a saved one.
    fn save(&mut self, conn: &mut dyn Connection) -> Result<()> {
        match self.save_state() {
            SaveState::Unsaved => insert(self, conn),
            SaveState::Saved | SaveState::Gone => update(self, conn),
        }
    }

    /// Deletes the row. The record is [`SaveState::Gone`] afterwards.
    ///
    /// Related rows are left alone. Deleting an unsaved record matches no
    /// row and still succeeds.
    fn delete(&mut self, conn: &mut dyn Connection) -> Result<()> {
        delete(self, conn)
    }

    /// Loads row `id` into this record.
    ///
    /// The record is replaced only once the row and every eagerly loaded
    /// relation were read; on failure it is left untouched. Fields excluded
    /// from persistence take their default values.
    ///
    /// Relations are loaded recursively with [`LoadOptions::eager`] and kept
    /// as foreign keys with [`LoadOptions::lazy`].
    fn load(&mut self, conn: &mut dyn Connection, id: RecordId, options: LoadOptions) -> Result<()> {
        let mut ctx = LoadContext::new(options);
        load_in(self, conn, id, &mut ctx)
    }

    /// Resolves a relation left as a foreign key by a lazy load.
    fn load_related(
        &mut self,
        conn: &mut dyn Connection,
        attribute: &str,
        options: LoadOptions,
    ) -> Result<()> {
        load_related(self, conn, attribute, options)
    }

    /// Reloads the record from its row, discarding local modifications.
    fn refresh(&mut self, conn: &mut dyn Connection, options: LoadOptions) -> Result<()> {
        let state = self.save_state();
        if state != SaveState::Saved {
            return Err(rejected::<Self>(Operation::Load, state));
        }
        let id = self.id();
        self.load(conn, id, options)
    }

    /// Creates a record and loads row `id` into it.
    fn fetch(conn: &mut dyn Connection, id: RecordId, options: LoadOptions) -> Result<Self> {
        let mut record = Self::default();
        record.load(conn, id, options)?;
        Ok(record)
    }
}

impl<R: Record> Persist for R {}

fn insert<R: Record>(record: &mut R, conn: &mut dyn Connection) -> Result<()> {
    let state = record.state().save_state();
    if state != SaveState::Unsaved {
        return Err(rejected::<R>(Operation::Insert, state));
    }

    persist_relations(record, conn, false)?;

    let query = query::insert(record);
    run(conn, &query)?;

    let id = conn.last_insert_id().ok_or_else(|| {
        error!(table = R::TABLE, "database reported no generated id");
        RecordError::Exec {
            kind: StatementKind::Insert,
            table: R::TABLE,
            message: String::from("the database reported no generated id"),
        }
    })?;

    let state = record.state_mut();
    state.set_id(id);
    state.clear_dirty();
    debug!(table = R::TABLE, id, "record inserted");
    Ok(())
}

fn update<R: Record>(record: &mut R, conn: &mut dyn Connection) -> Result<()> {
    let state = record.state().save_state();
    if state != SaveState::Saved {
        return Err(rejected::<R>(Operation::Update, state));
    }
    if !record.state().dirty().is_modified() {
        debug!(table = R::TABLE, id = record.state().id(), "nothing modified, update skipped");
        return Ok(());
    }

    persist_relations(record, conn, true)?;

    if let Some(query) = query::update(record) {
        let affected = run(conn, &query)?;
        if affected == 0 {
            warn!(table = R::TABLE, id = record.state().id(), "update matched no row");
        }
    }

    record.state_mut().clear_dirty();
    Ok(())
}

fn delete<R: Record>(record: &mut R, conn: &mut dyn Connection) -> Result<()> {
    let state = record.state().save_state();
    if state == SaveState::Gone {
        return Err(rejected::<R>(Operation::Delete, state));
    }

    let query = query::delete(record);
    let affected = run(conn, &query)?;
    debug!(table = R::TABLE, id = record.state().id(), affected, "record deleted");

    record.state_mut().mark_gone();
    Ok(())
}

/// Loads row `id` into `record` as part of the load described by `ctx`.
pub(crate) fn load_in<R: Record>(
    record: &mut R,
    conn: &mut dyn Connection,
    id: RecordId,
    ctx: &mut LoadContext,
) -> Result<()> {
    let state = record.state().save_state();
    if state == SaveState::Gone {
        return Err(rejected::<R>(Operation::Load, state));
    }

    // A failed load leaves `record` as it was.
    let mut loaded = R::default();
    ctx.push(R::TABLE, id);
    let result = load_row(&mut loaded, conn, id, ctx);
    ctx.pop();
    result?;

    let state = loaded.state_mut();
    state.set_id(id);
    state.clear_dirty();
    *record = loaded;
    Ok(())
}

fn load_row<R: Record>(
    record: &mut R,
    conn: &mut dyn Connection,
    id: RecordId,
    ctx: &mut LoadContext,
) -> Result<()> {
    let query = query::select_by_id::<R>(id);
    let row = {
        let mut statement = prepare(conn, &query)?;
        statement
            .fetch_first()
            .map_err(|err| exec_failed(&query, err))?
    };
    let Some(mut row) = row else {
        debug!(table = R::TABLE, id, "row not found");
        return Err(RecordError::NotFound {
            table: R::TABLE,
            id,
        });
    };

    for attribute in R::schema().attributes() {
        let value = row.take(attribute.column()).ok_or_else(|| RecordError::Exec {
            kind: StatementKind::Select,
            table: R::TABLE,
            message: format!("column `{}` missing from result", attribute.column()),
        })?;

        match attribute.access() {
            Access::Value { write, .. } => {
                write(record, value).map_err(|source| value_failed::<R>(attribute, source))?;
            }
            Access::Relation { slot_mut, .. } => {
                let key =
                    foreign_key(value).map_err(|source| value_failed::<R>(attribute, source))?;
                let slot = slot_mut(record);
                match key {
                    Some(key) if ctx.options().is_eager() => {
                        ctx.check_descend(slot.related_table(), key)
                            .map_err(|source| relation_failed::<R>(attribute.name(), source))?;
                        slot.resolve(conn, key, ctx)
                            .map_err(|err| relation::failed(R::TABLE, attribute.name(), err))?;
                    }
                    key => slot.defer(key),
                }
            }
        }
    }

    Ok(())
}

fn load_related<R: Record>(
    record: &mut R,
    conn: &mut dyn Connection,
    attribute: &str,
    options: LoadOptions,
) -> Result<()> {
    let state = record.state().save_state();
    if state == SaveState::Gone {
        return Err(rejected::<R>(Operation::Load, state));
    }

    let (slot, slot_mut) = match R::schema().attribute(attribute).map(Attribute::access) {
        Some(Access::Relation { slot, slot_mut }) => (*slot, *slot_mut),
        _ => {
            return Err(relation_failed::<R>(
                attribute,
                RelationError::UnknownAttribute,
            ))
        }
    };
    let Some(key) = slot(record).deferred_key() else {
        return Err(relation_failed::<R>(attribute, RelationError::NotLazy));
    };

    let mut ctx = LoadContext::new(options);
    let owner = record.state().id();
    if owner != 0 {
        ctx.push(R::TABLE, owner);
    }
    ctx.check_descend(slot(record).related_table(), key)
        .map_err(|source| relation_failed::<R>(attribute, source))?;

    slot_mut(record)
        .resolve(conn, key, &mut ctx)
        .map_err(|err| relation::failed(R::TABLE, attribute, err))
}

/// Stores the resolved related records of `record` ahead of its own
/// statement, optionally only those whose attribute is modified.
fn persist_relations<R: Record>(
    record: &mut R,
    conn: &mut dyn Connection,
    only_modified: bool,
) -> Result<()> {
    for attribute in R::schema().relations() {
        if only_modified && !record.state().dirty().contains(attribute.name()) {
            continue;
        }
        if let Access::Relation { slot_mut, .. } = attribute.access() {
            slot_mut(record)
                .persist(conn)
                .map_err(|err| relation::failed(R::TABLE, attribute.name(), err))?;
        }
    }
    Ok(())
}

/// Prepares `query` and binds all of its parameters.
fn prepare<'c>(conn: &'c mut dyn Connection, query: &Query) -> Result<Box<dyn Statement + 'c>> {
    debug!(
        table = query.table(),
        kind = %query.kind(),
        sql = query.sql(),
        "preparing statement"
    );

    let mut statement = conn
        .prepare(query.sql())
        .map_err(|err| prepare_failed(query, err))?;
    for (placeholder, value) in query.params() {
        statement
            .bind(placeholder, value)
            .map_err(|err| prepare_failed(query, err))?;
    }
    Ok(statement)
}

/// Prepares, binds and executes `query`, returning the affected row count.
fn run(conn: &mut dyn Connection, query: &Query) -> Result<usize> {
    let mut statement = prepare(conn, query)?;
    statement.execute().map_err(|err| exec_failed(query, err))
}

fn foreign_key(value: SqlValue) -> std::result::Result<Option<RecordId>, ValueError> {
    match value {
        SqlValue::Null | SqlValue::Int(0) => Ok(None),
        SqlValue::Int(n) => RecordId::try_from(n)
            .map(Some)
            .map_err(|_| ValueError::OutOfRange {
                expected: "record id",
                value: n.to_string(),
            }),
        other => Err(ValueError::mismatch("record id", &other)),
    }
}

fn rejected<R: Record>(operation: Operation, state: SaveState) -> RecordError {
    warn!(table = R::TABLE, %operation, %state, "operation rejected");
    RecordError::State { operation, state }
}

fn prepare_failed(query: &Query, err: DriverError) -> RecordError {
    error!(
        table = query.table(),
        kind = %query.kind(),
        sql = query.sql(),
        error = %err,
        "could not prepare statement"
    );
    RecordError::Prepare {
        kind: query.kind(),
        table: query.table(),
        message: err.into_message(),
    }
}

fn exec_failed(query: &Query, err: DriverError) -> RecordError {
    error!(
        table = query.table(),
        kind = %query.kind(),
        sql = query.sql(),
        error = %err,
        "could not execute statement"
    );
    RecordError::Exec {
        kind: query.kind(),
        table: query.table(),
        message: err.into_message(),
    }
}

fn value_failed<R: Record>(attribute: &Attribute<R>, source: ValueError) -> RecordError {
    error!(table = R::TABLE, attribute = attribute.name(), error = %source, "could not write loaded value");
    RecordError::Value {
        table: R::TABLE,
        attribute: attribute.name(),
        source,
    }
}

fn relation_failed<R: Record>(attribute: &str, source: RelationError) -> RecordError {
    RecordError::Relation {
        table: R::TABLE,
        attribute: attribute.to_string(),
        source,
    }
}
