//! Error types for duckorm

use crate::engine::{EngineError, EngineErrorKind};
use crate::statement::StatementKind;
use thiserror::Error;

/// Result type alias for duckorm operations
pub type OrmResult<T> = Result<T, OrmError>;

/// Error types for schema, statement, and execution failures
#[derive(Debug, Error)]
pub enum OrmError {
    /// A field's type has no storage column mapping
    #[error("Unsupported field type for '{field}': {type_name}")]
    UnsupportedFieldType { field: String, type_name: String },

    /// The declared schema is internally inconsistent
    #[error("Invalid schema: {0}")]
    InvalidSchema(String),

    /// Reconciling the live schema would require a destructive change
    #[error("Irreconcilable schema for table '{table}': {reason}")]
    IrreconcilableSchema { table: String, reason: String },

    /// Uniqueness / not-null / check failure reported by storage
    #[error("Constraint violation on {kind} '{table}'{}: {message}", fmt_column(.column))]
    ConstraintViolation {
        table: String,
        column: Option<String>,
        kind: StatementKind,
        message: String,
    },

    /// Row decode/mapping error
    #[error("Decode error on column '{column}': {message}")]
    RowDecode { column: String, message: String },

    /// UPDATE or DELETE without a condition and without affect-all
    #[error("Refusing unconditioned {kind} on '{table}' (pass affect_all to allow)")]
    UnconditionedMutationRejected { table: String, kind: StatementKind },

    /// Storage engine unreachable
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// Syntax/semantic error reported by storage
    #[error("Storage error on {kind} '{table}': {message}")]
    Storage {
        table: String,
        kind: StatementKind,
        message: String,
    },

    /// Storage reported a missing object (e.g. table)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Storage refused to create an object that already exists
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Column referenced that the table schema does not declare
    #[error("Unknown column '{column}' on table '{table}'")]
    UnknownColumn { table: String, column: String },

    /// Payload or parameter value incompatible with the column
    #[error("Invalid value for '{table}.{column}': {message}")]
    InvalidValue {
        table: String,
        column: String,
        message: String,
    },

    /// Condition that cannot be rendered (e.g. placeholder count mismatch)
    #[error("Invalid condition: {0}")]
    InvalidCondition(String),

    /// Malformed plan (e.g. UPDATE with nothing to set)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration error
    #[error("Config error: {0}")]
    Config(String),
}

fn fmt_column(column: &Option<String>) -> String {
    match column {
        Some(c) => format!(" (column '{c}')"),
        None => String::new(),
    }
}

impl OrmError {
    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RowDecode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create an invalid schema error
    pub fn invalid_schema(message: impl Into<String>) -> Self {
        Self::InvalidSchema(message.into())
    }

    /// Create an irreconcilable schema error
    pub fn irreconcilable(table: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::IrreconcilableSchema {
            table: table.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid value error
    pub fn invalid_value(
        table: impl Into<String>,
        column: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            table: table.into(),
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create an unknown column error
    pub fn unknown_column(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self::UnknownColumn {
            table: table.into(),
            column: column.into(),
        }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Check if this is a constraint violation
    pub fn is_constraint_violation(&self) -> bool {
        matches!(self, Self::ConstraintViolation { .. })
    }

    /// Check if this is a row decode error
    pub fn is_decode(&self) -> bool {
        matches!(self, Self::RowDecode { .. })
    }

    /// Check if this is an unconditioned mutation rejection
    pub fn is_unconditioned_mutation(&self) -> bool {
        matches!(self, Self::UnconditionedMutationRejected { .. })
    }

    /// Check if storage reported a duplicate object
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists(_))
    }

    /// Check if this is an irreconcilable schema error
    pub fn is_irreconcilable(&self) -> bool {
        matches!(self, Self::IrreconcilableSchema { .. })
    }

    /// Wrap an engine error with the operation context it happened in.
    pub fn from_engine(err: EngineError, table: &str, kind: StatementKind) -> Self {
        match err.kind {
            EngineErrorKind::Unavailable => Self::StorageUnavailable(err.message),
            EngineErrorKind::Constraint => Self::ConstraintViolation {
                table: table.to_string(),
                column: err.column,
                kind,
                message: err.message,
            },
            EngineErrorKind::NotFound => Self::NotFound(format!("{table}: {}", err.message)),
            EngineErrorKind::AlreadyExists => {
                Self::AlreadyExists(format!("{table}: {}", err.message))
            }
            EngineErrorKind::Decode => Self::RowDecode {
                column: err.column.unwrap_or_else(|| table.to_string()),
                message: err.message,
            },
            EngineErrorKind::UnsupportedType => Self::UnsupportedFieldType {
                field: format!("{table}.{}", err.column.as_deref().unwrap_or("?")),
                type_name: err.message,
            },
            EngineErrorKind::Syntax | EngineErrorKind::Other => Self::Storage {
                table: table.to_string(),
                kind,
                message: err.message,
            },
        }
    }
}

impl From<toml::de::Error> for OrmError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(err.to_string())
    }
}
