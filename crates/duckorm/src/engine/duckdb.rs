//! DuckDB engine adapter.

use super::{Engine, EngineError, EngineErrorKind};
use crate::dialect::Dialect;
use crate::row::Row;
use crate::schema::{ColumnDefault, FieldDescriptor, FieldType, IndexDef, TableSchema};
use crate::statement::{Statement, StatementKind};
use crate::value::Value;
use ::duckdb::types::{TimeUnit, ToSqlOutput, Value as DuckValue};
use ::duckdb::{Connection, ToSql, params_from_iter};
use chrono::{DateTime, NaiveDateTime};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

/// [`Engine`] over a single DuckDB connection.
///
/// The connection is guarded by a mutex, so one engine can be shared by reference
/// across threads; statements run one at a time.
pub struct DuckDbEngine {
    conn: Mutex<Connection>,
}

impl DuckDbEngine {
    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self, EngineError> {
        Connection::open_in_memory()
            .map(Self::from_connection)
            .map_err(|e| EngineError::unavailable(e.to_string()))
    }

    /// Open (or create) a database file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        Connection::open(path)
            .map(Self::from_connection)
            .map_err(|e| EngineError::unavailable(e.to_string()))
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, EngineError> {
        self.conn
            .lock()
            .map_err(|_| EngineError::unavailable("duckdb connection mutex poisoned"))
    }

    fn introspect_query(
        &self,
        table: &str,
        sql: &str,
        columns: &[&str],
    ) -> Result<Vec<Row>, EngineError> {
        let statement = Statement::new(StatementKind::Introspect, table, sql)
            .with_params(vec![Value::from(table)])
            .with_columns(columns.iter().map(|c| c.to_string()).collect());
        self.query(&statement)
    }
}

impl Engine for DuckDbEngine {
    fn dialect(&self) -> Dialect {
        Dialect::DUCKDB
    }

    fn execute(&self, statement: &Statement) -> Result<u64, EngineError> {
        let conn = self.lock()?;
        if statement.params.is_empty() && statement.kind == StatementKind::Ddl {
            conn.execute_batch(&statement.sql).map_err(classify)?;
            return Ok(0);
        }
        let mut prepared = conn.prepare(&statement.sql).map_err(classify)?;
        let affected = prepared
            .execute(params_from_iter(statement.params.iter()))
            .map_err(classify)?;
        Ok(affected as u64)
    }

    fn query(&self, statement: &Statement) -> Result<Vec<Row>, EngineError> {
        let conn = self.lock()?;
        let mut prepared = conn.prepare(&statement.sql).map_err(classify)?;
        let mut rows = prepared
            .query(params_from_iter(statement.params.iter()))
            .map_err(classify)?;

        let columns: Arc<[String]> = Arc::from(statement.columns.clone());
        let width = columns.len();
        let mut out = Vec::new();
        while let Some(row) = rows.next().map_err(classify)? {
            let mut values = Vec::with_capacity(width);
            for (idx, name) in columns.iter().enumerate() {
                let raw: DuckValue = row.get(idx).map_err(classify)?;
                values.push(from_duck(raw).map_err(|msg| {
                    EngineError::new(EngineErrorKind::Decode, msg).with_column(name)
                })?);
            }
            out.push(Row::new(Arc::clone(&columns), values));
        }
        Ok(out)
    }

    fn introspect_schema(&self, table: &str) -> Result<Option<TableSchema>, EngineError> {
        let columns = self.introspect_query(
            table,
            "SELECT column_name, data_type, is_nullable, column_default \
             FROM information_schema.columns \
             WHERE table_name = $1 AND table_schema = current_schema() \
             ORDER BY ordinal_position",
            &["column_name", "data_type", "is_nullable", "column_default"],
        )?;
        if columns.is_empty() {
            return Ok(None);
        }

        let pk_rows = self.introspect_query(
            table,
            "SELECT unnest(constraint_column_names) AS column_name \
             FROM duckdb_constraints() \
             WHERE table_name = $1 AND constraint_type = 'PRIMARY KEY'",
            &["column_name"],
        )?;
        let primary_key: Vec<String> = pk_rows
            .iter()
            .filter_map(|r| r.value(0).and_then(Value::as_str).map(str::to_string))
            .collect();

        let mut schema = TableSchema::new(table);
        for row in &columns {
            let name = text_at(row, 0)?;
            let data_type = text_at(row, 1)?;
            let field_type = FieldType::from_storage_type(&name, &data_type)
                .map_err(|_| EngineError::unsupported_type(&name, &data_type))?;
            let mut field = FieldDescriptor::new(&name, field_type);
            field.nullable = row.value(2).and_then(Value::as_str) == Some("YES");
            field.primary_key = primary_key.contains(&name);
            if field_type == FieldType::Decimal {
                field.precision = decimal_precision(&data_type);
            }
            if let Some(default) = row.value(3).and_then(Value::as_str) {
                if default.contains("nextval(") {
                    field.auto_increment = true;
                } else {
                    field.default = Some(ColumnDefault::Expression(default.to_string()));
                }
            }
            schema.fields.push(field);
        }

        let index_rows = self.introspect_query(
            table,
            "SELECT index_name, is_unique, sql FROM duckdb_indexes() WHERE table_name = $1",
            &["index_name", "is_unique", "sql"],
        )?;
        for row in &index_rows {
            let name = text_at(row, 0)?;
            let unique = row.value(1).and_then(Value::as_bool).unwrap_or(false);
            let columns = row
                .value(2)
                .and_then(Value::as_str)
                .map(index_columns)
                .unwrap_or_default();
            schema.indexes.push(IndexDef::new(name, columns, unique));
        }

        Ok(Some(schema))
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> ::duckdb::Result<ToSqlOutput<'_>> {
        let value = match self {
            Value::Null => DuckValue::Null,
            Value::Integer(v) => DuckValue::BigInt(*v),
            Value::Float(v) => DuckValue::Double(*v),
            Value::Decimal(d) => DuckValue::Text(d.to_string()),
            Value::Text(s) => DuckValue::Text(s.clone()),
            Value::Boolean(b) => DuckValue::Boolean(*b),
            Value::Timestamp(ts) => DuckValue::Text(Value::timestamp_text(ts)),
        };
        Ok(ToSqlOutput::Owned(value))
    }
}

fn from_duck(value: DuckValue) -> Result<Value, String> {
    let int = |v: i128| {
        i64::try_from(v)
            .map(Value::Integer)
            .map_err(|_| format!("{v} overflows a 64-bit integer"))
    };
    match value {
        DuckValue::Null => Ok(Value::Null),
        DuckValue::Boolean(b) => Ok(Value::Boolean(b)),
        DuckValue::TinyInt(v) => Ok(Value::Integer(i64::from(v))),
        DuckValue::SmallInt(v) => Ok(Value::Integer(i64::from(v))),
        DuckValue::Int(v) => Ok(Value::Integer(i64::from(v))),
        DuckValue::BigInt(v) => Ok(Value::Integer(v)),
        DuckValue::HugeInt(v) => int(v),
        DuckValue::UTinyInt(v) => Ok(Value::Integer(i64::from(v))),
        DuckValue::USmallInt(v) => Ok(Value::Integer(i64::from(v))),
        DuckValue::UInt(v) => Ok(Value::Integer(i64::from(v))),
        DuckValue::UBigInt(v) => int(i128::from(v)),
        DuckValue::Float(v) => Ok(Value::Float(f64::from(v))),
        DuckValue::Double(v) => Ok(Value::Float(v)),
        DuckValue::Decimal(d) => Ok(Value::Decimal(d)),
        DuckValue::Text(s) => Ok(Value::Text(s)),
        DuckValue::Timestamp(unit, v) => timestamp(unit, v)
            .map(Value::Timestamp)
            .ok_or_else(|| format!("timestamp {v} out of range")),
        DuckValue::Date32(days) => DateTime::from_timestamp(i64::from(days) * 86_400, 0)
            .map(|dt| Value::Timestamp(dt.naive_utc()))
            .ok_or_else(|| format!("date {days} out of range")),
        other => Err(format!("unsupported storage value {other:?}")),
    }
}

fn timestamp(unit: TimeUnit, v: i64) -> Option<NaiveDateTime> {
    let micros = match unit {
        TimeUnit::Second => v.checked_mul(1_000_000)?,
        TimeUnit::Millisecond => v.checked_mul(1_000)?,
        TimeUnit::Microsecond => v,
        TimeUnit::Nanosecond => v.div_euclid(1_000),
    };
    DateTime::from_timestamp_micros(micros).map(|dt| dt.naive_utc())
}

fn text_at(row: &Row, idx: usize) -> Result<String, EngineError> {
    row.value(idx)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| EngineError::other(format!("introspection column {idx} is not text")))
}

/// `DECIMAL(18,3)` → `(18, 3)`
fn decimal_precision(data_type: &str) -> Option<(u32, u32)> {
    let inner = data_type.split_once('(')?.1.strip_suffix(')')?;
    let (p, s) = inner.split_once(',')?;
    Some((p.trim().parse().ok()?, s.trim().parse().ok()?))
}

/// Column list of a `CREATE INDEX ... ON t(a, b)` statement.
fn index_columns(sql: &str) -> Vec<String> {
    let Some(open) = sql.rfind('(') else {
        return Vec::new();
    };
    let Some(close) = sql[open..].find(')') else {
        return Vec::new();
    };
    sql[open + 1..open + close]
        .split(',')
        .map(|c| c.trim().trim_matches('"').to_string())
        .filter(|c| !c.is_empty())
        .collect()
}

/// Map a DuckDB error to an [`EngineError`] by its message class.
fn classify(err: ::duckdb::Error) -> EngineError {
    let message = err.to_string();
    let kind = error_kind(&message);
    let column = if kind == EngineErrorKind::Constraint {
        constraint_column(&message)
    } else {
        None
    };
    EngineError {
        kind,
        message,
        column,
    }
}

fn error_kind(message: &str) -> EngineErrorKind {
    if message.contains("Constraint Error") {
        EngineErrorKind::Constraint
    } else if message.contains("Connection Error") || message.contains("IO Error") {
        EngineErrorKind::Unavailable
    } else if message.contains("Catalog Error") {
        if message.contains("already exists") {
            EngineErrorKind::AlreadyExists
        } else {
            EngineErrorKind::NotFound
        }
    } else if message.contains("Parser Error")
        || message.contains("Binder Error")
        || message.contains("Conversion Error")
        || message.contains("Invalid Input Error")
    {
        EngineErrorKind::Syntax
    } else {
        EngineErrorKind::Other
    }
}

/// Column named by a constraint message, e.g. `Duplicate key "code: P001"` or
/// `NOT NULL constraint failed: products.name`.
fn constraint_column(message: &str) -> Option<String> {
    if let Some(rest) = message.split_once("Duplicate key \"").map(|(_, r)| r) {
        let column = rest.split(':').next()?.trim();
        return (!column.is_empty()).then(|| column.to_string());
    }
    if let Some(rest) = message.split_once("NOT NULL constraint failed: ").map(|(_, r)| r) {
        let qualified = rest.split_whitespace().next()?;
        let column = qualified.rsplit('.').next()?;
        return Some(column.trim_end_matches(['.', ',']).to_string());
    }
    None
}
