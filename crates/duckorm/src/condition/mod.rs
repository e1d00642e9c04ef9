//! Composable filter conditions with safe parameter binding.
//!
//! A [`Condition`] is an immutable expression tree. Values are stored as typed
//! [`Value`]s and only become placeholders when the tree is rendered, so the
//! placeholder numbering always follows left-to-right traversal order no matter how
//! subtrees were built, reordered, or reused.
//!
//! # Example
//! ```ignore
//! use duckorm::{Condition, Dialect};
//!
//! let cond = Condition::and(vec![
//!     Condition::eq("status", "active"),
//!     Condition::or(vec![
//!         Condition::eq("role", "admin"),
//!         Condition::gt("reputation", 100),
//!     ]),
//! ]);
//! let (sql, params) = cond.to_fragment(&Dialect::DUCKDB)?;
//! assert_eq!(sql, r#""status" = $1 AND ("role" = $2 OR "reputation" > $3)"#);
//! assert_eq!(params.len(), 3);
//! ```

mod order;

pub use order::{OrderBy, Pagination, SortDirection};

use crate::dialect::Dialect;
use crate::error::{OrmError, OrmResult};
use crate::ident;
use crate::param::ParamList;
use crate::schema::{FieldType, TableSchema};
use crate::statement::AggregateExpr;
use crate::value::Value;

/// Comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
    Like,
}

impl CmpOp {
    pub fn as_sql(self) -> &'static str {
        match self {
            CmpOp::Eq => "=",
            CmpOp::Ne => "<>",
            CmpOp::Lt => "<",
            CmpOp::Lte => "<=",
            CmpOp::Gt => ">",
            CmpOp::Gte => ">=",
            CmpOp::Like => "LIKE",
        }
    }
}

/// Left-hand side of a comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Column(String),
    /// Aggregate expression, for HAVING clauses.
    Aggregate(AggregateExpr),
}

impl Operand {
    fn render(&self) -> String {
        match self {
            Operand::Column(c) => ident::quote(c),
            Operand::Aggregate(agg) => agg.render(),
        }
    }
}

impl From<&str> for Operand {
    fn from(column: &str) -> Self {
        Operand::Column(column.to_string())
    }
}

impl From<String> for Operand {
    fn from(column: String) -> Self {
        Operand::Column(column)
    }
}

impl From<AggregateExpr> for Operand {
    fn from(agg: AggregateExpr) -> Self {
        Operand::Aggregate(agg)
    }
}

/// Filter expression node.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// `operand <op> $n`
    Compare {
        operand: Operand,
        op: CmpOp,
        value: Value,
    },
    /// `operand [NOT] IN ($n, ...)`
    In {
        operand: Operand,
        values: Vec<Value>,
        negated: bool,
    },
    /// `operand IS [NOT] NULL`
    Null { operand: Operand, negated: bool },
    /// All children must hold. Empty renders as `true`.
    And(Vec<Condition>),
    /// At least one child must hold. Empty renders as `false`.
    Or(Vec<Condition>),
    Not(Box<Condition>),
    /// Raw SQL with `?` placeholders, one per value.
    ///
    /// Column names inside the fragment are not checked against the schema.
    Raw { sql: String, params: Vec<Value> },
}

impl Condition {
    pub fn compare(operand: impl Into<Operand>, op: CmpOp, value: impl Into<Value>) -> Self {
        Condition::Compare {
            operand: operand.into(),
            op,
            value: value.into(),
        }
    }

    /// `column = value`
    pub fn eq(column: impl Into<Operand>, value: impl Into<Value>) -> Self {
        Self::compare(column, CmpOp::Eq, value)
    }

    /// `column <> value`
    pub fn ne(column: impl Into<Operand>, value: impl Into<Value>) -> Self {
        Self::compare(column, CmpOp::Ne, value)
    }

    /// `column < value`
    pub fn lt(column: impl Into<Operand>, value: impl Into<Value>) -> Self {
        Self::compare(column, CmpOp::Lt, value)
    }

    /// `column <= value`
    pub fn lte(column: impl Into<Operand>, value: impl Into<Value>) -> Self {
        Self::compare(column, CmpOp::Lte, value)
    }

    /// `column > value`
    pub fn gt(column: impl Into<Operand>, value: impl Into<Value>) -> Self {
        Self::compare(column, CmpOp::Gt, value)
    }

    /// `column >= value`
    pub fn gte(column: impl Into<Operand>, value: impl Into<Value>) -> Self {
        Self::compare(column, CmpOp::Gte, value)
    }

    /// `column LIKE pattern`
    pub fn like(column: impl Into<Operand>, pattern: impl Into<Value>) -> Self {
        Self::compare(column, CmpOp::Like, pattern)
    }

    /// `column IN (values...)`; an empty list renders as `false`.
    pub fn in_list<I, V>(column: impl Into<Operand>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Condition::In {
            operand: column.into(),
            values: values.into_iter().map(Into::into).collect(),
            negated: false,
        }
    }

    /// `column NOT IN (values...)`; an empty list renders as `true`.
    pub fn not_in<I, V>(column: impl Into<Operand>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Condition::In {
            operand: column.into(),
            values: values.into_iter().map(Into::into).collect(),
            negated: true,
        }
    }

    /// `column IS NULL`
    pub fn is_null(column: impl Into<Operand>) -> Self {
        Condition::Null {
            operand: column.into(),
            negated: false,
        }
    }

    /// `column IS NOT NULL`
    pub fn is_not_null(column: impl Into<Operand>) -> Self {
        Condition::Null {
            operand: column.into(),
            negated: true,
        }
    }

    pub fn and(children: Vec<Condition>) -> Self {
        Condition::And(children)
    }

    pub fn or(children: Vec<Condition>) -> Self {
        Condition::Or(children)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(inner: Condition) -> Self {
        Condition::Not(Box::new(inner))
    }

    /// Raw SQL fragment with `?` placeholders.
    ///
    /// # Safety
    /// The fragment text is emitted verbatim; only the values are bound.
    pub fn raw<I, V>(sql: impl Into<String>, params: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Condition::Raw {
            sql: sql.into(),
            params: params.into_iter().map(Into::into).collect(),
        }
    }

    /// Conjoin with another condition, flattening nested conjunctions.
    pub fn and_also(self, other: Condition) -> Self {
        match (self, other) {
            (Condition::And(mut a), Condition::And(b)) => {
                a.extend(b);
                Condition::And(a)
            }
            (Condition::And(mut a), other) => {
                a.push(other);
                Condition::And(a)
            }
            (this, Condition::And(mut b)) => {
                b.insert(0, this);
                Condition::And(b)
            }
            (this, other) => Condition::And(vec![this, other]),
        }
    }

    /// True when the condition holds for every row regardless of data.
    ///
    /// Used to treat e.g. an empty filter set as "no condition" for mutations.
    pub fn is_tautology(&self) -> bool {
        match self {
            Condition::And(children) => children.iter().all(Condition::is_tautology),
            Condition::Or(children) => children.iter().any(Condition::is_tautology),
            Condition::Not(inner) => inner.is_contradiction(),
            Condition::In {
                values, negated, ..
            } => *negated && values.is_empty(),
            _ => false,
        }
    }

    /// True when the condition matches no row regardless of data.
    pub fn is_contradiction(&self) -> bool {
        match self {
            Condition::And(children) => children.iter().any(Condition::is_contradiction),
            Condition::Or(children) => children.iter().all(Condition::is_contradiction),
            Condition::Not(inner) => inner.is_tautology(),
            Condition::In {
                values, negated, ..
            } => !*negated && values.is_empty(),
            _ => false,
        }
    }

    /// Number of values this condition binds when rendered.
    pub fn param_count(&self) -> usize {
        match self {
            Condition::Compare { .. } => 1,
            Condition::In { values, .. } => values.len(),
            Condition::Null { .. } => 0,
            Condition::And(c) | Condition::Or(c) => c.iter().map(Condition::param_count).sum(),
            Condition::Not(inner) => inner.param_count(),
            Condition::Raw { params, .. } => params.len(),
        }
    }

    /// Render to a fragment plus its parameters, numbering placeholders from 1.
    pub fn to_fragment(&self, dialect: &Dialect) -> OrmResult<(String, Vec<Value>)> {
        let mut params = ParamList::new();
        let sql = self.render(dialect, &mut params)?;
        Ok((sql, params.into_vec()))
    }

    /// Render into an existing parameter list, continuing its numbering.
    pub fn render(&self, dialect: &Dialect, params: &mut ParamList) -> OrmResult<String> {
        match self {
            Condition::Compare { operand, op, value } => {
                let lhs = operand.render();
                let ph = params.bind(value.clone(), dialect);
                Ok(format!("{lhs} {} {ph}", op.as_sql()))
            }
            Condition::In {
                operand,
                values,
                negated,
            } => {
                if values.is_empty() {
                    return Ok(if *negated { "true" } else { "false" }.to_string());
                }
                let lhs = operand.render();
                let placeholders: Vec<String> = values
                    .iter()
                    .map(|v| params.bind(v.clone(), dialect))
                    .collect();
                let op = if *negated { "NOT IN" } else { "IN" };
                Ok(format!("{lhs} {op} ({})", placeholders.join(", ")))
            }
            Condition::Null { operand, negated } => {
                let op = if *negated { "IS NOT NULL" } else { "IS NULL" };
                Ok(format!("{} {op}", operand.render()))
            }
            Condition::And(children) => render_group(children, " AND ", "true", dialect, params),
            Condition::Or(children) => render_group(children, " OR ", "false", dialect, params),
            Condition::Not(inner) => {
                let sql = inner.render(dialect, params)?;
                Ok(format!("NOT ({sql})"))
            }
            Condition::Raw { sql, params: values } => render_raw(sql, values, dialect, params),
        }
    }

    /// Check every column reference and comparison value against `schema`.
    ///
    /// `aliases` are extra names accepted as columns (projection aliases in HAVING).
    pub fn validate(&self, schema: &TableSchema, aliases: &[String]) -> OrmResult<()> {
        match self {
            Condition::Compare { operand, op, value } => {
                let ty = operand_type(operand, schema, aliases)?;
                if value.is_null() {
                    return Err(OrmError::InvalidCondition(format!(
                        "comparison {} NULL on {}; use is_null/is_not_null",
                        op.as_sql(),
                        operand.render()
                    )));
                }
                if let Some(ty) = ty {
                    if *op == CmpOp::Like && ty != FieldType::Text {
                        return Err(OrmError::InvalidCondition(format!(
                            "LIKE on non-text column {}",
                            operand.render()
                        )));
                    }
                    check_value(schema, operand, ty, value)?;
                }
                Ok(())
            }
            Condition::In {
                operand, values, ..
            } => {
                if let Some(ty) = operand_type(operand, schema, aliases)? {
                    for v in values {
                        check_value(schema, operand, ty, v)?;
                    }
                }
                Ok(())
            }
            Condition::Null { operand, .. } => operand_type(operand, schema, aliases).map(|_| ()),
            Condition::And(children) | Condition::Or(children) => children
                .iter()
                .try_for_each(|c| c.validate(schema, aliases)),
            Condition::Not(inner) => inner.validate(schema, aliases),
            Condition::Raw { sql, params } => {
                let found = count_placeholders(sql);
                if found != params.len() {
                    return Err(OrmError::InvalidCondition(format!(
                        "raw fragment has {found} placeholder(s) but {} value(s): {sql}",
                        params.len()
                    )));
                }
                Ok(())
            }
        }
    }
}

/// Resolve the semantic type of an operand; `None` when it is not a plain
/// schema column (alias or aggregate).
fn operand_type(
    operand: &Operand,
    schema: &TableSchema,
    aliases: &[String],
) -> OrmResult<Option<FieldType>> {
    match operand {
        Operand::Column(c) => match schema.field(c) {
            Some(f) => Ok(Some(f.field_type)),
            None if aliases.iter().any(|a| a == c) => Ok(None),
            None => Err(OrmError::unknown_column(&schema.name, c)),
        },
        Operand::Aggregate(agg) => {
            agg.validate(schema)?;
            Ok(None)
        }
    }
}

fn check_value(schema: &TableSchema, operand: &Operand, ty: FieldType, value: &Value) -> OrmResult<()> {
    if ty.accepts(value) {
        return Ok(());
    }
    let column = match operand {
        Operand::Column(c) => c.clone(),
        Operand::Aggregate(agg) => agg.render(),
    };
    Err(OrmError::invalid_value(
        &schema.name,
        column,
        format!("expected {ty}, got {} ({value})", value.type_label()),
    ))
}

fn render_group(
    children: &[Condition],
    sep: &str,
    empty: &str,
    dialect: &Dialect,
    params: &mut ParamList,
) -> OrmResult<String> {
    match children {
        [] => Ok(empty.to_string()),
        [only] => only.render(dialect, params),
        _ => {
            let mut parts = Vec::with_capacity(children.len());
            for child in children {
                let sql = child.render(dialect, params)?;
                if needs_parens(child) {
                    parts.push(format!("({sql})"));
                } else {
                    parts.push(sql);
                }
            }
            Ok(parts.join(sep))
        }
    }
}

fn needs_parens(c: &Condition) -> bool {
    match c {
        Condition::And(children) | Condition::Or(children) => match children.as_slice() {
            [only] => needs_parens(only),
            children => children.len() > 1,
        },
        Condition::Raw { .. } => true,
        _ => false,
    }
}

/// Replace each `?` outside quoted literals and identifiers with the next placeholder.
fn render_raw(
    sql: &str,
    values: &[Value],
    dialect: &Dialect,
    params: &mut ParamList,
) -> OrmResult<String> {
    let mut out = String::with_capacity(sql.len() + values.len() * 2);
    let mut values_iter = values.iter();
    let mut quote: Option<char> = None;
    for c in sql.chars() {
        match c {
            '\'' | '"' => {
                quote = toggle_quote(quote, c);
                out.push(c);
            }
            '?' if quote.is_none() => {
                let value = values_iter.next().ok_or_else(|| {
                    OrmError::InvalidCondition(format!(
                        "raw fragment has more placeholders than values: {sql}"
                    ))
                })?;
                out.push_str(&params.bind(value.clone(), dialect));
            }
            _ => out.push(c),
        }
    }
    if values_iter.next().is_some() {
        return Err(OrmError::InvalidCondition(format!(
            "raw fragment has fewer placeholders than values: {sql}"
        )));
    }
    Ok(out)
}

fn count_placeholders(sql: &str) -> usize {
    let mut quote: Option<char> = None;
    let mut n = 0;
    for c in sql.chars() {
        match c {
            '\'' | '"' => quote = toggle_quote(quote, c),
            '?' if quote.is_none() => n += 1,
            _ => {}
        }
    }
    n
}

/// Track the open quote; a quote of the other kind inside a span is literal text.
fn toggle_quote(open: Option<char>, c: char) -> Option<char> {
    match open {
        None => Some(c),
        Some(q) if q == c => None,
        other => other,
    }
}
