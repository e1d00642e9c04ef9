//! The storage engine boundary.
//!
//! An [`Engine`] executes rendered [`Statement`]s and reports live table schemas.
//! The mapping layer never talks to a database any other way, so any SQL engine
//! can be plugged in by implementing this trait.

#[cfg(feature = "duckdb")]
mod duckdb;

#[cfg(feature = "duckdb")]
pub use self::duckdb::DuckDbEngine;

use crate::dialect::Dialect;
use crate::row::Row;
use crate::schema::TableSchema;
use crate::statement::Statement;
use std::fmt;

/// Broad classification of engine failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineErrorKind {
    /// Engine unreachable or its connection unusable.
    Unavailable,
    /// Uniqueness / not-null / check violation.
    Constraint,
    /// Syntax or semantic error in a statement.
    Syntax,
    /// Referenced object (table, sequence, ...) does not exist.
    NotFound,
    /// Object being created (table, sequence, index) already exists.
    AlreadyExists,
    /// A live column has a storage type with no semantic mapping.
    UnsupportedType,
    /// A result value could not be converted to a [`Value`](crate::Value).
    Decode,
    Other,
}

/// Error reported by an [`Engine`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineError {
    pub kind: EngineErrorKind,
    pub message: String,
    /// Offending column, when the engine names one.
    pub column: Option<String>,
}

impl EngineError {
    pub fn new(kind: EngineErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            column: None,
        }
    }

    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(EngineErrorKind::Unavailable, message)
    }

    pub fn constraint(message: impl Into<String>) -> Self {
        Self::new(EngineErrorKind::Constraint, message)
    }

    /// `column` has storage type `type_name`, which has no semantic mapping.
    pub fn unsupported_type(column: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self::new(EngineErrorKind::UnsupportedType, type_name).with_column(column)
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::new(EngineErrorKind::Other, message)
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl std::error::Error for EngineError {}

/// Synchronous SQL execution interface.
pub trait Engine {
    /// SQL capabilities of this engine.
    fn dialect(&self) -> Dialect;

    /// Run a statement that returns no rows; returns the affected row count.
    fn execute(&self, statement: &Statement) -> Result<u64, EngineError>;

    /// Run a statement and return its rows, with values in `statement.columns` order.
    fn query(&self, statement: &Statement) -> Result<Vec<Row>, EngineError>;

    /// Report the live schema of `table`, or `None` if it does not exist.
    fn introspect_schema(&self, table: &str) -> Result<Option<TableSchema>, EngineError>;

    /// Key assigned by the most recent single-row insert, for engines without
    /// `RETURNING`.
    fn last_insert_key(&self) -> Result<Option<i64>, EngineError> {
        Ok(None)
    }
}

impl<E: Engine + ?Sized> Engine for &E {
    fn dialect(&self) -> Dialect {
        (**self).dialect()
    }

    fn execute(&self, statement: &Statement) -> Result<u64, EngineError> {
        (**self).execute(statement)
    }

    fn query(&self, statement: &Statement) -> Result<Vec<Row>, EngineError> {
        (**self).query(statement)
    }

    fn introspect_schema(&self, table: &str) -> Result<Option<TableSchema>, EngineError> {
        (**self).introspect_schema(table)
    }

    fn last_insert_key(&self) -> Result<Option<i64>, EngineError> {
        (**self).last_insert_key()
    }
}
