//! Statement construction from plans and schemas.
//!
//! Builders here validate every referenced column and value against a
//! [`TableSchema`](crate::TableSchema) before producing SQL, then emit a
//! [`Statement`]: the only thing that crosses the engine boundary.

mod aggregate;
mod delete;
mod insert;
mod select;
mod update;

pub use aggregate::{AggregateExpr, AggregateFn};
pub use delete::DeletePlan;
pub use insert::{InsertBatch, InsertPlan};
pub use select::{AggregateQuery, Find, Projection, QueryPlan, SelectItem};
pub use update::UpdatePlan;

use crate::condition::Condition;
use crate::dialect::Dialect;
use crate::error::{OrmError, OrmResult};
use crate::param::ParamList;
use crate::schema::TableSchema;
use crate::value::Value;
use std::fmt;

/// What a statement does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementKind {
    Select,
    Insert,
    Update,
    Delete,
    Ddl,
    Introspect,
}

impl StatementKind {
    pub fn as_str(self) -> &'static str {
        match self {
            StatementKind::Select => "SELECT",
            StatementKind::Insert => "INSERT",
            StatementKind::Update => "UPDATE",
            StatementKind::Delete => "DELETE",
            StatementKind::Ddl => "DDL",
            StatementKind::Introspect => "INTROSPECT",
        }
    }
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully rendered statement ready for an [`Engine`](crate::Engine).
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub kind: StatementKind,
    /// Table the statement targets, for error context.
    pub table: String,
    pub sql: String,
    /// Bound values in placeholder order.
    pub params: Vec<Value>,
    /// Names of the result columns, in order. Empty for statements without results.
    pub columns: Vec<String>,
}

impl Statement {
    pub fn new(kind: StatementKind, table: impl Into<String>, sql: impl Into<String>) -> Self {
        Self {
            kind,
            table: table.into(),
            sql: sql.into(),
            params: Vec::new(),
            columns: Vec::new(),
        }
    }

    pub fn with_params(mut self, params: Vec<Value>) -> Self {
        self.params = params;
        self
    }

    pub fn with_columns(mut self, columns: Vec<String>) -> Self {
        self.columns = columns;
        self
    }

    /// Whether the statement produces result rows.
    pub fn returns_rows(&self) -> bool {
        !self.columns.is_empty()
    }
}

/// Ordered column → value mapping used for inserts and updates.
///
/// Setting a column that is already present replaces its value in place, so the
/// column order is the order of first assignment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Payload {
    entries: Vec<(String, Value)>,
}

impl Payload {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a column value (builder form).
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(column, value);
        self
    }

    pub fn set(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        let column = column.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(c, _)| *c == column) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((column, value)),
        }
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(c, _)| c == column)
            .map(|(_, v)| v)
    }

    pub fn remove(&mut self, column: &str) -> Option<Value> {
        let pos = self.entries.iter().position(|(c, _)| c == column)?;
        Some(self.entries.remove(pos).1)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.get(column).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(c, _)| c.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(c, v)| (c.as_str(), v))
    }
}

impl<C: Into<String>, V: Into<Value>> FromIterator<(C, V)> for Payload {
    fn from_iter<I: IntoIterator<Item = (C, V)>>(iter: I) -> Self {
        let mut payload = Payload::new();
        for (c, v) in iter {
            payload.set(c, v);
        }
        payload
    }
}

impl IntoIterator for Payload {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Check a payload value against its column: known column, compatible type,
/// and no NULL into a non-nullable column.
pub(crate) fn check_payload_value(
    schema: &TableSchema,
    column: &str,
    value: &Value,
) -> OrmResult<()> {
    let field = schema.require_field(column)?;
    if value.is_null() {
        if !field.nullable {
            return Err(OrmError::invalid_value(
                &schema.name,
                column,
                "NULL for a non-nullable column",
            ));
        }
        return Ok(());
    }
    if !field.field_type.accepts(value) {
        return Err(OrmError::invalid_value(
            &schema.name,
            column,
            format!(
                "expected {}, got {} ({value})",
                field.field_type,
                value.type_label()
            ),
        ));
    }
    Ok(())
}

pub(crate) fn check_table(plan_table: &str, schema: &TableSchema) -> OrmResult<()> {
    if plan_table != schema.name {
        return Err(OrmError::validation(format!(
            "plan targets '{plan_table}' but schema describes '{}'",
            schema.name
        )));
    }
    Ok(())
}

/// Resolve the WHERE clause of an UPDATE/DELETE, refusing unconditioned writes.
///
/// Returns `None` when the mutation legitimately targets every row.
pub(crate) fn mutation_filter<'a>(
    schema: &TableSchema,
    kind: StatementKind,
    filter: Option<&'a Condition>,
    affect_all: bool,
) -> OrmResult<Option<&'a Condition>> {
    let effective = filter.filter(|c| !c.is_tautology());
    match effective {
        Some(cond) => {
            cond.validate(schema, &[])?;
            Ok(Some(cond))
        }
        None if affect_all => Ok(None),
        None => Err(OrmError::UnconditionedMutationRejected {
            table: schema.name.clone(),
            kind,
        }),
    }
}

pub(crate) fn push_where(
    sql: &mut String,
    filter: Option<&Condition>,
    dialect: &Dialect,
    params: &mut ParamList,
) -> OrmResult<()> {
    if let Some(cond) = filter {
        let fragment = cond.render(dialect, params)?;
        sql.push_str(" WHERE ");
        sql.push_str(&fragment);
    }
    Ok(())
}

#[cfg(test)]
mod tests;
