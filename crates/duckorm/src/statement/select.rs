use super::{AggregateExpr, Statement, StatementKind, check_table};
use crate::condition::{Condition, OrderBy, Pagination};
use crate::dialect::Dialect;
use crate::error::{OrmError, OrmResult};
use crate::ident::{self, Ident};
use crate::param::ParamList;
use crate::schema::TableSchema;

/// One item of an explicit projection.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectItem {
    Column(String),
    Aggregate(AggregateExpr),
}

impl SelectItem {
    pub fn output_name(&self) -> String {
        match self {
            SelectItem::Column(c) => c.clone(),
            SelectItem::Aggregate(agg) => agg.output_name(),
        }
    }
}

impl From<&str> for SelectItem {
    fn from(column: &str) -> Self {
        SelectItem::Column(column.to_string())
    }
}

impl From<AggregateExpr> for SelectItem {
    fn from(agg: AggregateExpr) -> Self {
        SelectItem::Aggregate(agg)
    }
}

/// What a SELECT returns.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Projection {
    /// Every schema column, in schema order.
    #[default]
    All,
    /// A subset of schema columns.
    Columns(Vec<String>),
    /// Columns and aggregate expressions.
    Items(Vec<SelectItem>),
}

/// A complete SELECT description.
///
/// # Example
/// ```ignore
/// use duckorm::{AggregateExpr, Condition, Dialect, OrderBy, QueryPlan, SelectItem};
///
/// let stmt = QueryPlan::new("products")
///     .select(vec![
///         SelectItem::from("in_stock"),
///         AggregateExpr::avg("price").into(),
///     ])
///     .filter(Condition::gt("price", 100))
///     .group_by(["in_stock"])
///     .order_by(OrderBy::desc("avg_price"))
///     .build(&schema, &Dialect::DUCKDB)?;
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPlan {
    /// Target table
    table: String,
    /// SELECT list
    projection: Projection,
    /// WHERE condition
    filter: Option<Condition>,
    /// GROUP BY columns
    group_by: Vec<String>,
    /// HAVING condition
    having: Option<Condition>,
    /// ORDER BY items
    order: Vec<OrderBy>,
    /// LIMIT / OFFSET
    pagination: Pagination,
}

impl QueryPlan {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            projection: Projection::All,
            filter: None,
            group_by: Vec::new(),
            having: None,
            order: Vec::new(),
            pagination: Pagination::default(),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn projection(mut self, projection: Projection) -> Self {
        self.projection = projection;
        self
    }

    /// Select a subset of columns.
    pub fn columns<I, S>(self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.projection(Projection::Columns(
            columns.into_iter().map(Into::into).collect(),
        ))
    }

    /// Select columns and aggregates.
    pub fn select(self, items: Vec<SelectItem>) -> Self {
        self.projection(Projection::Items(items))
    }

    /// Add a WHERE condition, AND-ed with any existing one.
    pub fn filter(mut self, cond: Condition) -> Self {
        self.filter = Some(match self.filter.take() {
            Some(existing) => existing.and_also(cond),
            None => cond,
        });
        self
    }

    pub fn group_by<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.group_by.extend(columns.into_iter().map(Into::into));
        self
    }

    /// Add a HAVING condition, AND-ed with any existing one.
    pub fn having(mut self, cond: Condition) -> Self {
        self.having = Some(match self.having.take() {
            Some(existing) => existing.and_also(cond),
            None => cond,
        });
        self
    }

    pub fn order_by(mut self, order: OrderBy) -> Self {
        self.order.push(order);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.pagination.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.pagination.offset = Some(offset);
        self
    }

    pub fn paginate(mut self, pagination: Pagination) -> Self {
        self.pagination = pagination;
        self
    }

    /// Validate against `schema` and render.
    pub fn build(&self, schema: &TableSchema, dialect: &Dialect) -> OrmResult<Statement> {
        check_table(&self.table, schema)?;

        let (select_list, outputs) = self.render_projection(schema)?;

        for col in &self.group_by {
            schema.require_field(col)?;
        }
        let grouped = self.is_aggregate() || !self.group_by.is_empty();
        if let Projection::Items(items) = &self.projection
            && grouped
        {
            for item in items {
                if let SelectItem::Column(c) = item
                    && !self.group_by.contains(c)
                {
                    return Err(OrmError::validation(format!(
                        "column '{c}' must appear in group_by when aggregating"
                    )));
                }
            }
        }
        if self.having.is_some() && self.group_by.is_empty() && !self.is_aggregate() {
            return Err(OrmError::validation(
                "having requires group_by or an aggregate projection",
            ));
        }

        if let Some(filter) = &self.filter {
            filter.validate(schema, &[])?;
        }
        if let Some(having) = &self.having {
            having.validate(schema, &outputs)?;
        }
        for order in &self.order {
            if !schema.has_column(&order.column) && !outputs.contains(&order.column) {
                return Err(OrmError::unknown_column(&schema.name, &order.column));
            }
            if grouped
                && !outputs.contains(&order.column)
                && !self.group_by.contains(&order.column)
            {
                return Err(OrmError::validation(format!(
                    "cannot order by '{}': it is neither grouped nor selected",
                    order.column
                )));
            }
        }

        let mut params = ParamList::new();
        let mut sql = format!("SELECT {select_list} FROM {}", ident::quote(&schema.name));

        if let Some(filter) = &self.filter {
            sql.push_str(" WHERE ");
            sql.push_str(&filter.render(dialect, &mut params)?);
        }
        if !self.group_by.is_empty() {
            let cols: Vec<String> = self.group_by.iter().map(|c| ident::quote(c)).collect();
            sql.push_str(" GROUP BY ");
            sql.push_str(&cols.join(", "));
        }
        if let Some(having) = &self.having {
            sql.push_str(" HAVING ");
            sql.push_str(&having.render(dialect, &mut params)?);
        }
        if !self.order.is_empty() {
            let items: Vec<String> = self.order.iter().map(OrderBy::render).collect();
            sql.push_str(" ORDER BY ");
            sql.push_str(&items.join(", "));
        }
        self.pagination.render_into(&mut sql);

        Ok(Statement::new(StatementKind::Select, &schema.name, sql)
            .with_params(params.into_vec())
            .with_columns(outputs))
    }

    fn is_aggregate(&self) -> bool {
        matches!(&self.projection, Projection::Items(items)
            if items.iter().any(|i| matches!(i, SelectItem::Aggregate(_))))
    }

    fn render_projection(&self, schema: &TableSchema) -> OrmResult<(String, Vec<String>)> {
        match &self.projection {
            Projection::All => {
                let outputs = schema.column_names();
                let list: Vec<String> = outputs.iter().map(|c| ident::quote(c)).collect();
                Ok((list.join(", "), outputs))
            }
            Projection::Columns(columns) => {
                if columns.is_empty() {
                    return Err(OrmError::validation("empty column projection"));
                }
                for c in columns {
                    schema.require_field(c)?;
                }
                let list: Vec<String> = columns.iter().map(|c| ident::quote(c)).collect();
                Ok((list.join(", "), columns.clone()))
            }
            Projection::Items(items) => {
                if items.is_empty() {
                    return Err(OrmError::validation("empty select list"));
                }
                let mut list = Vec::with_capacity(items.len());
                let mut outputs = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        SelectItem::Column(c) => {
                            schema.require_field(c)?;
                            list.push(ident::quote(c));
                        }
                        SelectItem::Aggregate(agg) => {
                            agg.validate(schema)?;
                            let name = agg.output_name();
                            Ident::validate(&name)?;
                            list.push(format!("{} AS {}", agg.render(), ident::quote(&name)));
                        }
                    }
                    let name = item.output_name();
                    if outputs.contains(&name) {
                        return Err(OrmError::validation(format!(
                            "duplicate output column '{name}'"
                        )));
                    }
                    outputs.push(name);
                }
                Ok((list.join(", "), outputs))
            }
        }
    }
}

/// Record lookup criteria for [`Session::find`](crate::Session::find).
///
/// Always selects every column of the record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Find {
    filter: Option<Condition>,
    order: Vec<OrderBy>,
    pagination: Pagination,
}

impl Find {
    /// Every row.
    pub fn all() -> Self {
        Self::default()
    }

    /// Rows matching `cond`.
    pub fn filter(cond: Condition) -> Self {
        Self::default().and(cond)
    }

    /// AND another condition onto the filter.
    pub fn and(mut self, cond: Condition) -> Self {
        self.filter = Some(match self.filter.take() {
            Some(existing) => existing.and_also(cond),
            None => cond,
        });
        self
    }

    pub fn order_by(mut self, order: OrderBy) -> Self {
        self.order.push(order);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.pagination.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.pagination.offset = Some(offset);
        self
    }

    pub fn paginate(mut self, pagination: Pagination) -> Self {
        self.pagination = pagination;
        self
    }

    pub fn into_plan(self, table: impl Into<String>) -> QueryPlan {
        let mut plan = QueryPlan::new(table).paginate(self.pagination);
        if let Some(filter) = self.filter {
            plan = plan.filter(filter);
        }
        for order in self.order {
            plan = plan.order_by(order);
        }
        plan
    }
}

impl From<Condition> for Find {
    fn from(cond: Condition) -> Self {
        Find::filter(cond)
    }
}

/// Aggregation criteria for [`Session::aggregate`](crate::Session::aggregate).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregateQuery {
    items: Vec<SelectItem>,
    filter: Option<Condition>,
    group_by: Vec<String>,
    having: Option<Condition>,
    order: Vec<OrderBy>,
    pagination: Pagination,
}

impl AggregateQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select(mut self, item: impl Into<SelectItem>) -> Self {
        self.items.push(item.into());
        self
    }

    pub fn filter(mut self, cond: Condition) -> Self {
        self.filter = Some(match self.filter.take() {
            Some(existing) => existing.and_also(cond),
            None => cond,
        });
        self
    }

    pub fn group_by(mut self, column: impl Into<String>) -> Self {
        self.group_by.push(column.into());
        self
    }

    pub fn having(mut self, cond: Condition) -> Self {
        self.having = Some(match self.having.take() {
            Some(existing) => existing.and_also(cond),
            None => cond,
        });
        self
    }

    pub fn order_by(mut self, order: OrderBy) -> Self {
        self.order.push(order);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.pagination.limit = Some(limit);
        self
    }

    pub fn into_plan(self, table: impl Into<String>) -> QueryPlan {
        let mut plan = QueryPlan::new(table)
            .select(self.items)
            .group_by(self.group_by)
            .paginate(self.pagination);
        if let Some(filter) = self.filter {
            plan = plan.filter(filter);
        }
        if let Some(having) = self.having {
            plan = plan.having(having);
        }
        for order in self.order {
            plan = plan.order_by(order);
        }
        plan
    }
}
