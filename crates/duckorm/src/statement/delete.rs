use super::{Statement, StatementKind, check_table, mutation_filter, push_where};
use crate::condition::Condition;
use crate::dialect::Dialect;
use crate::error::OrmResult;
use crate::ident;
use crate::param::ParamList;
use crate::schema::TableSchema;

/// DELETE of the rows matching a condition.
///
/// Without a condition (or with one that matches every row) the plan only builds
/// when [`affect_all`](Self::affect_all) is set.
#[derive(Debug, Clone, PartialEq)]
pub struct DeletePlan {
    /// Target table
    table: String,
    /// WHERE condition
    filter: Option<Condition>,
    /// Allow deleting every row (dangerous!)
    affect_all: bool,
}

impl DeletePlan {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            filter: None,
            affect_all: false,
        }
    }

    /// Add a WHERE condition, AND-ed with any existing one.
    pub fn filter(mut self, cond: Condition) -> Self {
        self.filter = Some(match self.filter.take() {
            Some(existing) => existing.and_also(cond),
            None => cond,
        });
        self
    }

    pub fn filter_opt(self, cond: Option<Condition>) -> Self {
        match cond {
            Some(c) => self.filter(c),
            None => self,
        }
    }

    /// Explicitly allow the delete to remove every row.
    pub fn affect_all(mut self, affect_all: bool) -> Self {
        self.affect_all = affect_all;
        self
    }

    pub fn build(&self, schema: &TableSchema, dialect: &Dialect) -> OrmResult<Statement> {
        check_table(&self.table, schema)?;
        let filter = mutation_filter(
            schema,
            StatementKind::Delete,
            self.filter.as_ref(),
            self.affect_all,
        )?;

        let mut params = ParamList::new();
        let mut sql = format!("DELETE FROM {}", ident::quote(&schema.name));
        push_where(&mut sql, filter, dialect, &mut params)?;

        Ok(Statement::new(StatementKind::Delete, &schema.name, sql).with_params(params.into_vec()))
    }
}
