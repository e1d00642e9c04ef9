//! Result rows and the record mapping trait

use crate::error::{OrmError, OrmResult};
use crate::schema::TableSchema;
use crate::statement::Payload;
use crate::value::{FieldValue, Value};
use std::sync::Arc;

/// One result row: values in result-column order.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<Value>,
}

impl Row {
    /// Rows of one result set share their column list.
    pub fn new(columns: Arc<[String]>, values: Vec<Value>) -> Self {
        Self { columns, values }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn value(&self, idx: usize) -> Option<&Value> {
        self.values.get(idx)
    }

    fn column_name(&self, idx: usize) -> String {
        self.columns
            .get(idx)
            .cloned()
            .unwrap_or_else(|| format!("#{idx}"))
    }

    /// Decode the value at position `idx`, failing with [`OrmError::RowDecode`]
    /// naming the column.
    pub fn get<T: FieldValue>(&self, idx: usize) -> OrmResult<T> {
        let value = self.values.get(idx).cloned().ok_or_else(|| {
            OrmError::decode(
                self.column_name(idx),
                format!("row has {} column(s)", self.values.len()),
            )
        })?;
        T::from_value(value).map_err(|e| OrmError::decode(self.column_name(idx), e))
    }

    /// Check that this row's columns are exactly `expected`, in order.
    ///
    /// Records decode positionally, so a row from a differently shaped result would
    /// otherwise bind values to the wrong fields.
    pub fn expect_columns(&self, expected: &[&str]) -> OrmResult<()> {
        if self.values.len() != expected.len() {
            return Err(OrmError::decode(
                expected.join(", "),
                format!(
                    "expected {} column(s), row has {}",
                    expected.len(),
                    self.values.len()
                ),
            ));
        }
        for (idx, want) in expected.iter().enumerate() {
            match self.columns.get(idx) {
                Some(got) if got == want => {}
                Some(got) => {
                    return Err(OrmError::decode(
                        *want,
                        format!("result column {idx} is '{got}'"),
                    ));
                }
                None => {}
            }
        }
        Ok(())
    }

    /// Decode the value of the named result column.
    pub fn get_by_name<T: FieldValue>(&self, column: &str) -> OrmResult<T> {
        let idx = self
            .columns
            .iter()
            .position(|c| c == column)
            .ok_or_else(|| OrmError::decode(column, "no such result column"))?;
        self.get(idx)
    }
}

/// A typed record persisted as one table row.
///
/// Usually derived with `#[derive(Record)]`:
///
/// ```ignore
/// use duckorm::Record;
///
/// #[derive(Record)]
/// struct Product {
///     id: Option<i64>,
///     #[orm(size = 50, unique)]
///     code: String,
///     name: String,
///     price: i64,
///     #[orm(default = "true")]
///     in_stock: Option<bool>,
/// }
/// ```
pub trait Record: Sized {
    /// Table name.
    const TABLE: &'static str;
    /// Declared columns in field order; rows are decoded positionally against it.
    const COLUMNS: &'static [&'static str];

    /// Build the table schema. Deterministic: the same record always yields an
    /// identical schema.
    fn describe() -> OrmResult<TableSchema>;

    /// Field values keyed by column, in field order.
    fn to_payload(&self) -> Payload;

    /// Decode a row whose columns are [`Self::COLUMNS`], in order.
    fn from_row(row: &Row) -> OrmResult<Self>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> Row {
        Row::new(
            Arc::from(vec!["id".to_string(), "name".to_string()]),
            vec![Value::Integer(1), Value::Null],
        )
    }

    #[test]
    fn get_decodes_by_position() {
        let row = row();
        assert_eq!(row.get::<i64>(0).unwrap(), 1);
        assert_eq!(row.get::<Option<String>>(1).unwrap(), None);
        assert_eq!(row.get_by_name::<i64>("id").unwrap(), 1);
    }

    #[test]
    fn decode_error_names_column() {
        let err = row().get::<String>(1).unwrap_err();
        match err {
            OrmError::RowDecode { column, .. } => assert_eq!(column, "name"),
            other => panic!("unexpected {other:?}"),
        }
        let err = row().get::<i64>(5).unwrap_err();
        assert!(err.is_decode());
    }

    #[test]
    fn expect_columns_checks_shape() {
        let row = row();
        assert!(row.expect_columns(&["id", "name"]).is_ok());
        assert!(row.expect_columns(&["id"]).unwrap_err().is_decode());
        assert!(row.expect_columns(&["name", "id"]).unwrap_err().is_decode());
    }
}
