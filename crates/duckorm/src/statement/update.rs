use super::{
    Payload, Statement, StatementKind, check_payload_value, check_table, mutation_filter,
    push_where,
};
use crate::condition::Condition;
use crate::dialect::Dialect;
use crate::error::{OrmError, OrmResult};
use crate::ident;
use crate::param::ParamList;
use crate::schema::TableSchema;

/// UPDATE of the rows matching a condition.
///
/// Without a condition (or with one that matches every row) the plan only builds
/// when [`affect_all`](Self::affect_all) is set.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdatePlan {
    /// Target table
    table: String,
    /// SET values, in order
    payload: Payload,
    /// WHERE condition
    filter: Option<Condition>,
    /// Allow updating every row
    affect_all: bool,
}

impl UpdatePlan {
    pub fn new(table: impl Into<String>, payload: Payload) -> Self {
        Self {
            table: table.into(),
            payload,
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

    /// Explicitly allow the update to touch every row.
    pub fn affect_all(mut self, affect_all: bool) -> Self {
        self.affect_all = affect_all;
        self
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub(crate) fn payload_mut(&mut self) -> &mut Payload {
        &mut self.payload
    }

    pub fn build(&self, schema: &TableSchema, dialect: &Dialect) -> OrmResult<Statement> {
        check_table(&self.table, schema)?;
        if self.payload.is_empty() {
            return Err(OrmError::validation(format!(
                "UPDATE on '{}' has no columns to set",
                schema.name
            )));
        }
        for (column, value) in self.payload.iter() {
            check_payload_value(schema, column, value)?;
        }
        let filter = mutation_filter(
            schema,
            StatementKind::Update,
            self.filter.as_ref(),
            self.affect_all,
        )?;

        let mut params = ParamList::new();
        let sets: Vec<String> = self
            .payload
            .iter()
            .map(|(column, value)| {
                format!(
                    "{} = {}",
                    ident::quote(column),
                    params.bind(value.clone(), dialect)
                )
            })
            .collect();
        let mut sql = format!(
            "UPDATE {} SET {}",
            ident::quote(&schema.name),
            sets.join(", ")
        );
        push_where(&mut sql, filter, dialect, &mut params)?;

        Ok(Statement::new(StatementKind::Update, &schema.name, sql).with_params(params.into_vec()))
    }
}
