//! The executor/mapper: runs statements on an [`Engine`] and maps results.
//!
//! A [`Session`] is stateless between calls: every method builds its statements from
//! the record's schema, runs them, and returns owned results. There are no implicit
//! transactions; a batch insert that fails halfway leaves the earlier statements
//! applied.
//!
//! # Example
//! ```ignore
//! use duckorm::prelude::*;
//!
//! let session = Session::new(DuckDbEngine::open_in_memory()?);
//! session.auto_migrate::<Product>()?;
//!
//! let result = session.insert(&Product::new("P001", "Widget", 1200))?;
//! let found: Option<Product> = session.find_one(Condition::eq("code", "P001"))?;
//! session.update::<Product>(
//!     Payload::new().with("price", 1500),
//!     Some(Condition::eq("code", "P001")),
//!     false,
//! )?;
//! ```

mod iter;

pub use iter::RecordIter;

use crate::condition::Condition;
use crate::config::SessionConfig;
use crate::dialect::Dialect;
use crate::engine::Engine;
use crate::error::{OrmError, OrmResult};
use crate::migrate::{MigrationPlan, plan_migration};
use crate::monitor;
use crate::registry;
use crate::row::{Record, Row};
use crate::schema::TableSchema;
use crate::statement::{
    AggregateExpr, AggregateQuery, DeletePlan, Find, InsertPlan, Payload, QueryPlan, SelectItem,
    Statement, StatementKind, UpdatePlan,
};
use crate::value::Value;
use std::time::Instant;

/// Outcome of an insert.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct InsertResult {
    /// Rows written.
    pub affected: u64,
    /// Primary key of each input row, in input order.
    ///
    /// Caller-supplied keys are echoed back; storage-assigned keys are read back
    /// from the engine. Empty for tables with a composite key.
    pub keys: Vec<Value>,
}

impl InsertResult {
    /// The first key as an integer, e.g. for a single-record insert.
    pub fn key_i64(&self) -> Option<i64> {
        self.keys.first().and_then(Value::as_i64)
    }
}

/// Executes statements against an [`Engine`] and maps results.
pub struct Session<E: Engine> {
    engine: E,
    config: SessionConfig,
}

impl<E: Engine> Session<E> {
    pub fn new(engine: E) -> Self {
        Self::with_config(engine, SessionConfig::default())
    }

    pub fn with_config(engine: E, config: SessionConfig) -> Self {
        Self { engine, config }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn dialect(&self) -> Dialect {
        self.engine.dialect()
    }

    pub fn into_engine(self) -> E {
        self.engine
    }

    // ==================== Execution ====================

    fn run_execute(&self, statement: &Statement) -> OrmResult<u64> {
        let start = Instant::now();
        let result = self.engine.execute(statement);
        monitor::log_statement(
            &self.config,
            statement,
            start.elapsed(),
            result.as_ref().map(|n| *n),
        );
        result.map_err(|e| OrmError::from_engine(e, &statement.table, statement.kind))
    }

    fn run_query(&self, statement: &Statement) -> OrmResult<Vec<Row>> {
        let start = Instant::now();
        let result = self.engine.query(statement);
        monitor::log_statement(
            &self.config,
            statement,
            start.elapsed(),
            result.as_ref().map(|rows| rows.len() as u64),
        );
        result.map_err(|e| OrmError::from_engine(e, &statement.table, statement.kind))
    }

    // ==================== Schema ====================

    /// Schema of record type `T`.
    pub fn describe<T: Record>(&self) -> OrmResult<TableSchema> {
        T::describe()
    }

    /// Live schema of `table`, `None` when it does not exist.
    pub fn introspect(&self, table: &str) -> OrmResult<Option<TableSchema>> {
        self.engine
            .introspect_schema(table)
            .map_err(|e| OrmError::from_engine(e, table, StatementKind::Introspect))
    }

    /// Compute, without applying, the DDL that [`migrate`](Self::migrate) would run.
    pub fn plan_migration(&self, schema: &TableSchema) -> OrmResult<MigrationPlan> {
        let live = self.introspect(&schema.name)?;
        plan_migration(schema, live.as_ref())
    }

    /// Bring the live table up to `schema`; returns the DDL applied.
    ///
    /// Stops at the first failing statement; statements already applied stay applied.
    pub fn migrate(&self, schema: &TableSchema) -> OrmResult<Vec<String>> {
        let plan = self.plan_migration(schema)?;
        for column in &plan.extra_columns {
            tracing::warn!(
                target: "duckorm.migrate",
                table = %schema.name,
                column = %column,
                "live column is not declared; keeping it"
            );
        }
        if plan.is_empty() {
            tracing::debug!(target: "duckorm.migrate", table = %schema.name, "schema up to date");
            return Ok(Vec::new());
        }

        let statements = plan.statements(&self.dialect());
        for sql in &statements {
            let statement = Statement::new(StatementKind::Ddl, &schema.name, sql.as_str());
            self.run_execute(&statement)?;
            tracing::info!(target: "duckorm.migrate", table = %schema.name, sql = %sql, "applied");
        }
        Ok(statements)
    }

    /// [`migrate`](Self::migrate) the schema of record type `T`.
    pub fn auto_migrate<T: Record>(&self) -> OrmResult<Vec<String>> {
        self.migrate(&T::describe()?)
    }

    /// Migrate every record registered by `#[derive(Record)]`, in table-name order.
    pub fn migrate_registered(&self) -> OrmResult<Vec<String>> {
        let mut applied = Vec::new();
        for schema in registry::registered_schemas()? {
            applied.extend(self.migrate(&schema)?);
        }
        Ok(applied)
    }

    // ==================== Insert ====================

    pub fn insert<T: Record>(&self, record: &T) -> OrmResult<InsertResult> {
        self.insert_rows(&T::describe()?, vec![record.to_payload()])
    }

    /// Insert records in order, grouping them into multi-row statements where the
    /// dialect allows.
    pub fn insert_many<T: Record>(&self, records: &[T]) -> OrmResult<InsertResult> {
        let rows = records.iter().map(Record::to_payload).collect();
        self.insert_rows(&T::describe()?, rows)
    }

    /// Insert untyped rows into the table described by `schema`.
    pub fn insert_rows(&self, schema: &TableSchema, rows: Vec<Payload>) -> OrmResult<InsertResult> {
        if rows.is_empty() {
            return Ok(InsertResult::default());
        }
        let rows: Vec<Payload> = rows
            .into_iter()
            .map(|mut row| {
                stamp_timestamps(schema, &mut row, true);
                row
            })
            .collect();
        let row_count = rows.len();
        let batches = InsertPlan::new(&schema.name).rows(rows).build(
            schema,
            &self.dialect(),
            self.config.effective_batch_size(),
        )?;

        let single_key = schema.primary_key().len() == 1;
        let has_auto_key = schema.auto_key().is_some();
        let mut keys = vec![Value::Null; row_count];
        let mut affected = 0;

        for batch in batches {
            if batch.returns_keys() {
                let returned = self.run_query(&batch.statement)?;
                if returned.len() != batch.rows.len() {
                    return Err(OrmError::decode(
                        batch.statement.columns.join(", "),
                        format!(
                            "expected {} returned key(s), got {}",
                            batch.rows.len(),
                            returned.len()
                        ),
                    ));
                }
                affected += returned.len() as u64;
                for (idx, row) in batch.rows.iter().zip(returned) {
                    keys[*idx] = row.into_values().into_iter().next().unwrap_or(Value::Null);
                }
                continue;
            }

            affected += self.run_execute(&batch.statement)?;
            match batch.supplied_keys {
                Some(supplied) => {
                    for (idx, key) in batch.rows.iter().zip(supplied) {
                        keys[*idx] = key;
                    }
                }
                None if has_auto_key => {
                    let key = self
                        .engine
                        .last_insert_key()
                        .map_err(|e| OrmError::from_engine(e, &schema.name, StatementKind::Insert))?;
                    if let (Some(key), Some(idx)) = (key, batch.rows.last()) {
                        keys[*idx] = Value::Integer(key);
                    }
                }
                None => {}
            }
        }

        Ok(InsertResult {
            affected,
            keys: if single_key { keys } else { Vec::new() },
        })
    }

    // ==================== Read ====================

    /// Records matching `find`, in storage order unless ordered.
    pub fn find<T: Record>(&self, find: Find) -> OrmResult<Vec<T>> {
        self.find_iter(find)?.collect()
    }

    /// Like [`find`](Self::find), decoding records lazily. The iterator ends after
    /// the first decode error.
    pub fn find_iter<T: Record>(&self, find: Find) -> OrmResult<RecordIter<T>> {
        let schema = T::describe()?;
        let plan = find
            .into_plan(T::TABLE)
            .columns(T::COLUMNS.iter().copied());
        let rows = self.find_rows(&schema, &plan)?;
        Ok(RecordIter::new(rows))
    }

    /// Rows of an arbitrary query plan.
    pub fn find_rows(&self, schema: &TableSchema, plan: &QueryPlan) -> OrmResult<Vec<Row>> {
        let statement = plan.build(schema, &self.dialect())?;
        self.run_query(&statement)
    }

    /// The first record matching `cond`.
    pub fn find_one<T: Record>(&self, cond: Condition) -> OrmResult<Option<T>> {
        self.find_iter(Find::filter(cond).limit(1))?
            .next()
            .transpose()
    }

    /// The record whose single-column primary key equals `key`.
    pub fn find_by_key<T: Record>(&self, key: impl Into<Value>) -> OrmResult<Option<T>> {
        let schema = T::describe()?;
        let pk = single_key_column(&schema)?;
        self.find_one(Condition::eq(pk, key))
    }

    /// Number of records matching `cond` (all records when `None`).
    pub fn count<T: Record>(&self, cond: Option<Condition>) -> OrmResult<i64> {
        let schema = T::describe()?;
        let mut plan = QueryPlan::new(T::TABLE).select(vec![SelectItem::Aggregate(
            AggregateExpr::count_all(),
        )]);
        if let Some(cond) = cond {
            plan = plan.filter(cond);
        }
        let rows = self.find_rows(&schema, &plan)?;
        match rows.first() {
            Some(row) => row.get::<i64>(0),
            None => Ok(0),
        }
    }

    /// Aggregate rows over the table of record type `T`.
    ///
    /// Over an empty table, an ungrouped aggregate yields one row whose AVG/MIN/MAX
    /// values are NULL.
    pub fn aggregate<T: Record>(&self, query: AggregateQuery) -> OrmResult<Vec<Row>> {
        let schema = T::describe()?;
        self.find_rows(&schema, &query.into_plan(T::TABLE))
    }

    // ==================== Update / Delete ====================

    /// Update records matching `cond`.
    ///
    /// `cond == None` (or a condition that matches everything) is rejected with
    /// [`OrmError::UnconditionedMutationRejected`] unless `affect_all` is set.
    pub fn update<T: Record>(
        &self,
        payload: Payload,
        cond: Option<Condition>,
        affect_all: bool,
    ) -> OrmResult<u64> {
        let schema = T::describe()?;
        let plan = UpdatePlan::new(T::TABLE, payload)
            .filter_opt(cond)
            .affect_all(affect_all);
        self.update_rows(&schema, plan)
    }

    pub fn update_rows(&self, schema: &TableSchema, mut plan: UpdatePlan) -> OrmResult<u64> {
        if !plan.payload().is_empty() {
            stamp_timestamps(schema, plan.payload_mut(), false);
        }
        let statement = plan.build(schema, &self.dialect())?;
        self.run_execute(&statement)
    }

    /// Delete records matching `cond`; see [`update`](Self::update) for the
    /// unconditioned rule.
    pub fn delete<T: Record>(&self, cond: Option<Condition>, affect_all: bool) -> OrmResult<u64> {
        let schema = T::describe()?;
        let plan = DeletePlan::new(T::TABLE)
            .filter_opt(cond)
            .affect_all(affect_all);
        self.delete_rows(&schema, &plan)
    }

    pub fn delete_rows(&self, schema: &TableSchema, plan: &DeletePlan) -> OrmResult<u64> {
        let statement = plan.build(schema, &self.dialect())?;
        self.run_execute(&statement)
    }

    /// Delete the record whose single-column primary key equals `key`.
    pub fn delete_by_key<T: Record>(&self, key: impl Into<Value>) -> OrmResult<u64> {
        let schema = T::describe()?;
        let pk = single_key_column(&schema)?.to_string();
        self.delete::<T>(Some(Condition::eq(pk, key)), false)
    }
}

fn single_key_column(schema: &TableSchema) -> OrmResult<&str> {
    match schema.primary_key().as_slice() {
        [pk] => Ok(pk.name.as_str()),
        _ => Err(OrmError::validation(format!(
            "'{}' has a composite primary key; use a condition instead",
            schema.name
        ))),
    }
}

/// Fill `auto_now_add` / `auto_now` columns with the current time.
///
/// On insert, missing or NULL values are filled for both kinds. On update,
/// `auto_now` columns are set unless the payload supplies a value.
fn stamp_timestamps(schema: &TableSchema, payload: &mut Payload, inserting: bool) {
    let now = chrono::Utc::now().naive_utc();
    for field in &schema.fields {
        let wants = if inserting {
            field.auto_now_add || field.auto_now
        } else {
            field.auto_now
        };
        if !wants {
            continue;
        }
        let missing = payload.get(&field.name).is_none_or(Value::is_null);
        if missing {
            payload.set(field.name.clone(), Value::Timestamp(now));
        }
    }
}
