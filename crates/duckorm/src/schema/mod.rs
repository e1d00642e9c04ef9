//! Table schemas derived from typed records.
//!
//! A [`TableSchema`] is produced either by `#[derive(Record)]` (see
//! [`Record::describe`](crate::Record::describe)) or by explicit [`SchemaBuilder`]
//! calls. Storage engines also report live schemas in this shape so the migration
//! planner can diff the two.

mod builder;

pub use builder::{FieldDef, SchemaBuilder};

use crate::error::{OrmError, OrmResult};
use crate::value::Value;
use std::fmt;

/// Semantic column type.
///
/// The mapping to storage column types is fixed: see [`FieldType::storage_type`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    Integer,
    Float,
    Decimal,
    Text,
    Boolean,
    Timestamp,
}

/// Default DECIMAL precision/scale when none is declared.
pub const DEFAULT_DECIMAL_PRECISION: u32 = 18;
pub const DEFAULT_DECIMAL_SCALE: u32 = 3;

impl FieldType {
    pub fn label(self) -> &'static str {
        match self {
            FieldType::Integer => "integer",
            FieldType::Float => "float",
            FieldType::Decimal => "decimal",
            FieldType::Text => "text",
            FieldType::Boolean => "boolean",
            FieldType::Timestamp => "timestamp",
        }
    }

    /// Parse a type name used in explicit schema-builder calls.
    ///
    /// Accepts semantic names and their common SQL spellings. Anything else fails
    /// with [`OrmError::UnsupportedFieldType`].
    pub fn parse(field: &str, type_name: &str) -> OrmResult<Self> {
        match type_name.trim().to_ascii_lowercase().as_str() {
            "integer" | "int" | "bigint" | "i64" | "i32" | "i16" | "u32" => Ok(FieldType::Integer),
            "float" | "double" | "real" | "f64" | "f32" => Ok(FieldType::Float),
            "decimal" | "numeric" => Ok(FieldType::Decimal),
            "text" | "string" | "varchar" => Ok(FieldType::Text),
            "boolean" | "bool" => Ok(FieldType::Boolean),
            "timestamp" | "datetime" => Ok(FieldType::Timestamp),
            _ => Err(OrmError::UnsupportedFieldType {
                field: field.to_string(),
                type_name: type_name.to_string(),
            }),
        }
    }

    /// Map a storage type name reported by introspection back to a semantic type.
    pub fn from_storage_type(column: &str, storage: &str) -> OrmResult<Self> {
        let upper = storage.trim().to_ascii_uppercase();
        let base = upper.split('(').next().unwrap_or("").trim();
        let ty = match base {
            "TINYINT" | "SMALLINT" | "INTEGER" | "INT" | "BIGINT" | "HUGEINT" | "UTINYINT"
            | "USMALLINT" | "UINTEGER" | "UBIGINT" | "INT2" | "INT4" | "INT8" => FieldType::Integer,
            "FLOAT" | "REAL" | "DOUBLE" | "FLOAT4" | "FLOAT8" | "DOUBLE PRECISION" => {
                FieldType::Float
            }
            "DECIMAL" | "NUMERIC" => FieldType::Decimal,
            "VARCHAR" | "TEXT" | "CHAR" | "BPCHAR" | "STRING" | "CHARACTER VARYING" => {
                FieldType::Text
            }
            "BOOLEAN" | "BOOL" => FieldType::Boolean,
            t if t.starts_with("TIMESTAMP") || t == "DATETIME" => FieldType::Timestamp,
            _ => {
                return Err(OrmError::UnsupportedFieldType {
                    field: column.to_string(),
                    type_name: storage.to_string(),
                });
            }
        };
        Ok(ty)
    }

    /// Whether a value of this type may be bound to a column of this type.
    ///
    /// Integers widen into decimal and float columns; NULL is handled separately.
    pub fn accepts(self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null) => true,
            (FieldType::Integer, Value::Integer(_)) => true,
            (FieldType::Float, Value::Float(_) | Value::Integer(_) | Value::Decimal(_)) => true,
            (FieldType::Decimal, Value::Decimal(_) | Value::Integer(_) | Value::Float(_)) => true,
            (FieldType::Text, Value::Text(_)) => true,
            (FieldType::Boolean, Value::Boolean(_)) => true,
            (FieldType::Timestamp, Value::Timestamp(_)) => true,
            _ => false,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Column default.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnDefault {
    /// A literal value.
    Value(Value),
    /// The storage engine's current timestamp.
    CurrentTimestamp,
    /// Raw storage expression, as reported by introspection.
    Expression(String),
}

impl ColumnDefault {
    /// Render for a `DEFAULT` clause.
    pub fn to_sql(&self) -> String {
        match self {
            ColumnDefault::Value(v) => v.to_sql_literal(),
            ColumnDefault::CurrentTimestamp => "CURRENT_TIMESTAMP".to_string(),
            ColumnDefault::Expression(expr) => expr.clone(),
        }
    }
}

/// Description of one column.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    pub name: String,
    pub field_type: FieldType,
    pub nullable: bool,
    pub default: Option<ColumnDefault>,
    pub unique: bool,
    pub primary_key: bool,
    /// Storage assigns the value when the caller does not supply one.
    pub auto_increment: bool,
    /// Maximum length for text columns.
    pub size: Option<u32>,
    /// Precision and scale for decimal columns.
    pub precision: Option<(u32, u32)>,
    /// Raw CHECK expression (DDL only).
    pub check: Option<String>,
    /// Stamp the current time on insert when no value is supplied.
    pub auto_now_add: bool,
    /// Stamp the current time on every insert and update.
    pub auto_now: bool,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            nullable: true,
            default: None,
            unique: false,
            primary_key: false,
            auto_increment: false,
            size: None,
            precision: None,
            check: None,
            auto_now_add: false,
            auto_now: false,
        }
    }

    /// Storage column type for this field.
    pub fn storage_type(&self) -> String {
        match self.field_type {
            FieldType::Integer => "BIGINT".to_string(),
            FieldType::Float => "DOUBLE".to_string(),
            FieldType::Decimal => {
                let (p, s) = self
                    .precision
                    .unwrap_or((DEFAULT_DECIMAL_PRECISION, DEFAULT_DECIMAL_SCALE));
                format!("DECIMAL({p},{s})")
            }
            FieldType::Text => match self.size {
                Some(n) => format!("VARCHAR({n})"),
                None => "VARCHAR".to_string(),
            },
            FieldType::Boolean => "BOOLEAN".to_string(),
            FieldType::Timestamp => "TIMESTAMP".to_string(),
        }
    }

    pub fn has_default(&self) -> bool {
        self.default.is_some() || self.auto_increment
    }
}

/// An index over one or more columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDef {
    pub name: String,
    pub columns: Vec<String>,
    pub unique: bool,
}

impl IndexDef {
    pub fn new(name: impl Into<String>, columns: Vec<String>, unique: bool) -> Self {
        Self {
            name: name.into(),
            columns,
            unique,
        }
    }

    /// Conventional index name: `idx_<table>_<col>[_<col>...]`.
    pub fn conventional_name(table: &str, columns: &[String]) -> String {
        format!("idx_{}_{}", table, columns.join("_"))
    }
}

/// Structural description of a table.
#[derive(Debug, Clone, PartialEq)]
pub struct TableSchema {
    pub name: String,
    pub fields: Vec<FieldDescriptor>,
    pub indexes: Vec<IndexDef>,
}

impl TableSchema {
    /// An empty schema; use [`SchemaBuilder`] for validated construction.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            indexes: Vec::new(),
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Look up a field or fail with [`OrmError::UnknownColumn`].
    pub fn require_field(&self, name: &str) -> OrmResult<&FieldDescriptor> {
        self.field(name)
            .ok_or_else(|| OrmError::unknown_column(&self.name, name))
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    pub fn column_names(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.name.clone()).collect()
    }

    pub fn primary_key(&self) -> Vec<&FieldDescriptor> {
        self.fields.iter().filter(|f| f.primary_key).collect()
    }

    /// The single storage-assigned key column, if any.
    pub fn auto_key(&self) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.auto_increment)
    }

    pub fn index(&self, name: &str) -> Option<&IndexDef> {
        self.indexes.iter().find(|i| i.name == name)
    }

    /// Name of the sequence backing the auto key on sequence-based dialects.
    pub fn sequence_name(&self) -> Option<String> {
        self.auto_key()
            .map(|f| format!("{}_{}_seq", self.name, f.name))
    }
}

#[cfg(test)]
mod tests;
