use crate::error::{OrmError, OrmResult};
use crate::ident::{self, Ident};
use crate::schema::{FieldType, TableSchema};

/// Aggregate function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFn {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl AggregateFn {
    pub fn as_sql(self) -> &'static str {
        match self {
            AggregateFn::Count => "COUNT",
            AggregateFn::Sum => "SUM",
            AggregateFn::Avg => "AVG",
            AggregateFn::Min => "MIN",
            AggregateFn::Max => "MAX",
        }
    }

    fn prefix(self) -> &'static str {
        match self {
            AggregateFn::Count => "count",
            AggregateFn::Sum => "sum",
            AggregateFn::Avg => "avg",
            AggregateFn::Min => "min",
            AggregateFn::Max => "max",
        }
    }

    fn needs_numeric(self) -> bool {
        matches!(self, AggregateFn::Sum | AggregateFn::Avg)
    }
}

/// An aggregate over one column, or `COUNT(*)`.
///
/// The output column is named by [`alias`](Self::alias) when set, otherwise
/// `<fn>_<column>` (`count` for `COUNT(*)`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateExpr {
    pub func: AggregateFn,
    /// `None` means `*` (COUNT only).
    pub column: Option<String>,
    pub alias: Option<String>,
}

impl AggregateExpr {
    pub fn new(func: AggregateFn, column: impl Into<String>) -> Self {
        Self {
            func,
            column: Some(column.into()),
            alias: None,
        }
    }

    /// `COUNT(*)`
    pub fn count_all() -> Self {
        Self {
            func: AggregateFn::Count,
            column: None,
            alias: None,
        }
    }

    pub fn count(column: impl Into<String>) -> Self {
        Self::new(AggregateFn::Count, column)
    }

    pub fn sum(column: impl Into<String>) -> Self {
        Self::new(AggregateFn::Sum, column)
    }

    pub fn avg(column: impl Into<String>) -> Self {
        Self::new(AggregateFn::Avg, column)
    }

    pub fn min(column: impl Into<String>) -> Self {
        Self::new(AggregateFn::Min, column)
    }

    pub fn max(column: impl Into<String>) -> Self {
        Self::new(AggregateFn::Max, column)
    }

    /// Name the output column.
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn output_name(&self) -> String {
        if let Some(alias) = &self.alias {
            return alias.clone();
        }
        match &self.column {
            Some(col) => format!("{}_{col}", self.func.prefix()),
            None => self.func.prefix().to_string(),
        }
    }

    /// The expression without alias, e.g. `AVG("price")`.
    pub fn render(&self) -> String {
        match &self.column {
            Some(col) => format!("{}({})", self.func.as_sql(), ident::quote(col)),
            None => format!("{}(*)", self.func.as_sql()),
        }
    }

    pub(crate) fn validate(&self, schema: &TableSchema) -> OrmResult<()> {
        if let Some(alias) = &self.alias {
            Ident::validate(alias)?;
        }
        let Some(column) = &self.column else {
            if self.func != AggregateFn::Count {
                return Err(OrmError::InvalidCondition(format!(
                    "{}(*) is not supported; name a column",
                    self.func.as_sql()
                )));
            }
            return Ok(());
        };
        let field = schema.require_field(column)?;
        if self.func.needs_numeric()
            && !matches!(
                field.field_type,
                FieldType::Integer | FieldType::Float | FieldType::Decimal
            )
        {
            return Err(OrmError::InvalidCondition(format!(
                "{} over non-numeric column '{column}' ({})",
                self.func.as_sql(),
                field.field_type
            )));
        }
        Ok(())
    }
}
