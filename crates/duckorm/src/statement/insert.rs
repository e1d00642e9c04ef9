use super::{Payload, Statement, StatementKind, check_payload_value, check_table};
use crate::dialect::Dialect;
use crate::error::OrmResult;
use crate::ident;
use crate::param::ParamList;
use crate::schema::TableSchema;
use crate::value::Value;

/// INSERT of one or more rows.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertPlan {
    /// Target table
    table: String,
    /// Rows in input order
    rows: Vec<Payload>,
}

/// One INSERT statement and the input rows it writes.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertBatch {
    pub statement: Statement,
    /// Indices into the plan's rows, in statement order.
    pub rows: Vec<usize>,
    /// Caller-supplied key per row, when the single key column was in the payload.
    pub supplied_keys: Option<Vec<Value>>,
}

impl InsertBatch {
    /// Whether the engine hands the assigned keys back as result rows.
    pub fn returns_keys(&self) -> bool {
        self.statement.returns_rows()
    }
}

impl InsertPlan {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            rows: Vec::new(),
        }
    }

    pub fn row(mut self, payload: Payload) -> Self {
        self.rows.push(payload);
        self
    }

    pub fn rows<I: IntoIterator<Item = Payload>>(mut self, rows: I) -> Self {
        self.rows.extend(rows);
        self
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Validate and render.
    ///
    /// Consecutive rows with identical column sets share a multi-row statement of at
    /// most `batch_size` rows (fewer if the dialect caps parameters) when the dialect
    /// allows it; otherwise each row gets its own statement. Statements are returned in input order.
    pub fn build(
        &self,
        schema: &TableSchema,
        dialect: &Dialect,
        batch_size: usize,
    ) -> OrmResult<Vec<InsertBatch>> {
        check_table(&self.table, schema)?;

        let mut normalized = Vec::with_capacity(self.rows.len());
        for row in &self.rows {
            normalized.push(normalize_row(schema, row)?);
        }

        let key_column = match schema.primary_key().as_slice() {
            [pk] => Some(pk.name.clone()),
            _ => None,
        };
        let auto_key = schema.auto_key().map(|f| f.name.clone());

        let mut batches = Vec::new();
        let mut start = 0;
        while start < normalized.len() {
            let columns = &normalized[start].columns;
            let key_supplied = key_column
                .as_ref()
                .is_some_and(|k| columns.iter().any(|c| c == k));
            let returning = dialect.returning && auto_key.is_some() && !key_supplied;
            // Without RETURNING, generated keys can only be read back one row at a time.
            let needs_readback = auto_key.is_some() && !key_supplied && !dialect.returning;
            let limit = if dialect.multi_row_insert && !needs_readback && !columns.is_empty() {
                dialect.rows_per_statement(columns.len(), batch_size)
            } else {
                1
            };

            let mut end = start + 1;
            while end < normalized.len()
                && end - start < limit
                && normalized[end].columns == *columns
            {
                end += 1;
            }

            let group = &normalized[start..end];
            let statement = render_insert(
                schema,
                dialect,
                columns,
                group,
                if returning { auto_key.as_deref() } else { None },
            );
            let supplied_keys = match (&key_column, key_supplied) {
                (Some(k), true) => Some(
                    group
                        .iter()
                        .map(|r| r.value_of(k).cloned().unwrap_or(Value::Null))
                        .collect(),
                ),
                _ => None,
            };
            batches.push(InsertBatch {
                statement,
                rows: (start..end).collect(),
                supplied_keys,
            });
            start = end;
        }
        Ok(batches)
    }
}

#[derive(Debug)]
struct NormalizedRow {
    columns: Vec<String>,
    values: Vec<Value>,
}

impl NormalizedRow {
    fn value_of(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|i| &self.values[i])
    }
}

/// Drop values the storage should assign itself and type-check the rest.
fn normalize_row(schema: &TableSchema, row: &Payload) -> OrmResult<NormalizedRow> {
    let mut columns = Vec::with_capacity(row.len());
    let mut values = Vec::with_capacity(row.len());
    for (column, value) in row.iter() {
        let field = schema.require_field(column)?;
        if value.is_null() && (field.auto_increment || field.default.is_some()) {
            continue;
        }
        // A zero auto key on a non-optional field means "not assigned yet".
        if field.auto_increment && matches!(value, Value::Integer(0)) {
            continue;
        }
        check_payload_value(schema, column, value)?;
        columns.push(column.to_string());
        values.push(value.clone());
    }
    Ok(NormalizedRow { columns, values })
}

fn render_insert(
    schema: &TableSchema,
    dialect: &Dialect,
    columns: &[String],
    rows: &[NormalizedRow],
    returning: Option<&str>,
) -> Statement {
    let table = ident::quote(&schema.name);
    let mut params = ParamList::new();
    let mut sql = if columns.is_empty() {
        format!("INSERT INTO {table} DEFAULT VALUES")
    } else {
        let cols: Vec<String> = columns.iter().map(|c| ident::quote(c)).collect();
        let tuples: Vec<String> = rows
            .iter()
            .map(|row| {
                let phs: Vec<String> = row
                    .values
                    .iter()
                    .map(|v| params.bind(v.clone(), dialect))
                    .collect();
                format!("({})", phs.join(", "))
            })
            .collect();
        format!(
            "INSERT INTO {table} ({}) VALUES {}",
            cols.join(", "),
            tuples.join(", ")
        )
    };

    let mut result_columns = Vec::new();
    if let Some(key) = returning {
        sql.push_str(" RETURNING ");
        sql.push_str(&ident::quote(key));
        result_columns.push(key.to_string());
    }

    Statement::new(StatementKind::Insert, &schema.name, sql)
        .with_params(params.into_vec())
        .with_columns(result_columns)
}
