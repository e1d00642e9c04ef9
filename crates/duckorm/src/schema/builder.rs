use super::{ColumnDefault, FieldDescriptor, FieldType, IndexDef, TableSchema};
use crate::error::{OrmError, OrmResult};
use crate::ident::Ident;
use crate::value::Value;
use std::collections::HashSet;

/// Declarative options for one field, before validation.
///
/// These are the options `#[orm(...)]` accepts on a record field; the derive
/// expands to a chain of these calls.
#[derive(Debug, Clone)]
pub struct FieldDef {
    name: String,
    field_type: FieldType,
    nullable: bool,
    default: Option<String>,
    unique: bool,
    index: bool,
    primary_key: bool,
    size: Option<u32>,
    precision: Option<u32>,
    scale: Option<u32>,
    check: Option<String>,
    auto_now_add: bool,
    auto_now: bool,
}

impl FieldDef {
    /// A non-nullable field of the given type.
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            nullable: false,
            default: None,
            unique: false,
            index: false,
            primary_key: false,
            size: None,
            precision: None,
            scale: None,
            check: None,
            auto_now_add: false,
            auto_now: false,
        }
    }

    /// A field whose type is given by name, e.g. `"text"` or `"decimal"`.
    pub fn named_type(name: impl Into<String>, type_name: &str) -> OrmResult<Self> {
        let name = name.into();
        let field_type = FieldType::parse(&name, type_name)?;
        Ok(Self::new(name, field_type))
    }

    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Integer)
    }

    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Text)
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Boolean)
    }

    pub fn timestamp(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Timestamp)
    }

    pub fn decimal(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Decimal)
    }

    pub fn float(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Float)
    }

    /// Override the column name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    pub fn not_null(self) -> Self {
        self.nullable(false)
    }

    /// Default as a literal, parsed against the field type when the schema is built.
    ///
    /// `CURRENT_TIMESTAMP` / `now()` are accepted for timestamp fields.
    pub fn default_literal(mut self, literal: impl Into<String>) -> Self {
        self.default = Some(literal.into());
        self
    }

    pub fn default_value(self, value: impl Into<Value>) -> Self {
        let value = value.into();
        let literal = match &value {
            Value::Text(s) => format!("'{}'", s),
            other => other.to_string(),
        };
        self.default_literal(literal)
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn index(mut self) -> Self {
        self.index = true;
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn size(mut self, size: u32) -> Self {
        self.size = Some(size);
        self
    }

    pub fn precision(mut self, precision: u32) -> Self {
        self.precision = Some(precision);
        self
    }

    pub fn scale(mut self, scale: u32) -> Self {
        self.scale = Some(scale);
        self
    }

    pub fn check(mut self, expr: impl Into<String>) -> Self {
        self.check = Some(expr.into());
        self
    }

    pub fn auto_now_add(mut self) -> Self {
        self.auto_now_add = true;
        self
    }

    pub fn auto_now(mut self) -> Self {
        self.auto_now = true;
        self
    }

    pub fn column_name(&self) -> &str {
        &self.name
    }

    fn into_descriptor(self, table: &str) -> OrmResult<FieldDescriptor> {
        let ctx = |msg: String| OrmError::invalid_schema(format!("{table}.{}: {msg}", self.name));

        Ident::validate(&self.name)?;

        if self.size.is_some() && self.field_type != FieldType::Text {
            return Err(ctx(format!("size applies to text fields, not {}", self.field_type)));
        }
        if (self.precision.is_some() || self.scale.is_some())
            && self.field_type != FieldType::Decimal
        {
            return Err(ctx(format!(
                "precision/scale apply to decimal fields, not {}",
                self.field_type
            )));
        }
        if (self.auto_now || self.auto_now_add) && self.field_type != FieldType::Timestamp {
            return Err(ctx(format!(
                "auto_now/auto_now_add apply to timestamp fields, not {}",
                self.field_type
            )));
        }

        let precision = match (self.precision, self.scale) {
            (None, None) => None,
            (p, s) => {
                let p = p.unwrap_or(super::DEFAULT_DECIMAL_PRECISION);
                let s = s.unwrap_or(0);
                if s > p {
                    return Err(ctx(format!("scale {s} exceeds precision {p}")));
                }
                Some((p, s))
            }
        };

        let default = match &self.default {
            None => None,
            Some(lit) => Some(parse_default(self.field_type, lit).map_err(ctx)?),
        };
        if matches!(default, Some(ColumnDefault::Value(Value::Null))) && !self.nullable {
            return Err(ctx("NULL default on a non-nullable field".to_string()));
        }

        Ok(FieldDescriptor {
            name: self.name.clone(),
            field_type: self.field_type,
            nullable: self.nullable,
            default,
            unique: self.unique,
            primary_key: self.primary_key,
            auto_increment: false,
            size: self.size,
            precision,
            check: self.check.clone(),
            auto_now_add: self.auto_now_add,
            auto_now: self.auto_now,
        })
    }
}

fn parse_default(ty: FieldType, literal: &str) -> Result<ColumnDefault, String> {
    let trimmed = literal.trim();
    if ty == FieldType::Timestamp
        && (trimmed.eq_ignore_ascii_case("current_timestamp")
            || trimmed.eq_ignore_ascii_case("now()"))
    {
        return Ok(ColumnDefault::CurrentTimestamp);
    }
    Value::parse_literal(ty, literal).map(ColumnDefault::Value)
}

/// Validated construction of a [`TableSchema`].
///
/// # Example
/// ```ignore
/// use duckorm::{FieldDef, SchemaBuilder};
///
/// let schema = SchemaBuilder::new("products")
///     .field(FieldDef::text("code").size(50).unique())
///     .field(FieldDef::text("name"))
///     .field(FieldDef::integer("price"))
///     .field(FieldDef::boolean("in_stock").default_literal("true"))
///     .build()?;
///
/// // A surrogate `id` key was synthesized.
/// assert_eq!(schema.fields[0].name, "id");
/// ```
#[derive(Debug, Clone)]
pub struct SchemaBuilder {
    table: String,
    fields: Vec<FieldDef>,
    composite_key: Option<Vec<String>>,
    indexes: Vec<IndexDef>,
}

/// Name of the synthesized surrogate key.
pub const SURROGATE_KEY: &str = "id";

impl SchemaBuilder {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            fields: Vec::new(),
            composite_key: None,
            indexes: Vec::new(),
        }
    }

    pub fn field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    /// Declare a composite primary key over the named columns.
    pub fn composite_key<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.composite_key = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    /// Add an explicit (possibly multi-column) index.
    pub fn index(mut self, index: IndexDef) -> Self {
        self.indexes.push(index);
        self
    }

    pub fn build(self) -> OrmResult<TableSchema> {
        let table = self.table;
        Ident::validate(&table)?;

        let mut seen = HashSet::new();
        let mut fields = Vec::with_capacity(self.fields.len() + 1);
        let mut index_flags = Vec::with_capacity(self.fields.len());
        for def in self.fields {
            if !seen.insert(def.name.clone()) {
                return Err(OrmError::invalid_schema(format!(
                    "duplicate field '{}' in table '{table}'",
                    def.name
                )));
            }
            index_flags.push(def.index);
            fields.push(def.into_descriptor(&table)?);
        }

        match &self.composite_key {
            Some(columns) => {
                if columns.len() < 2 {
                    return Err(OrmError::invalid_schema(format!(
                        "composite key on '{table}' needs at least two columns"
                    )));
                }
                for col in columns {
                    let field = fields.iter_mut().find(|f| &f.name == col).ok_or_else(|| {
                        OrmError::invalid_schema(format!(
                            "composite key column '{col}' is not a field of '{table}'"
                        ))
                    })?;
                    field.primary_key = true;
                }
                let declared = fields.iter().filter(|f| f.primary_key).count();
                if declared != columns.len() {
                    return Err(OrmError::invalid_schema(format!(
                        "table '{table}' marks primary_key on fields outside its composite key"
                    )));
                }
            }
            None => {
                let declared: Vec<&str> = fields
                    .iter()
                    .filter(|f| f.primary_key)
                    .map(|f| f.name.as_str())
                    .collect();
                if declared.len() > 1 {
                    return Err(OrmError::invalid_schema(format!(
                        "table '{table}' declares multiple primary keys ({}) without a composite key",
                        declared.join(", ")
                    )));
                }
                if declared.is_empty() {
                    match fields.iter_mut().find(|f| f.name == SURROGATE_KEY) {
                        Some(id) => id.primary_key = true,
                        None => {
                            let mut id = FieldDescriptor::new(SURROGATE_KEY, FieldType::Integer);
                            id.primary_key = true;
                            fields.insert(0, id);
                            index_flags.insert(0, false);
                        }
                    }
                }
                if let Some(pk) = fields.iter_mut().find(|f| f.primary_key)
                    && pk.field_type == FieldType::Integer
                    && pk.default.is_none()
                {
                    pk.auto_increment = true;
                }
            }
        }

        for pk in fields.iter_mut().filter(|f| f.primary_key) {
            if pk.nullable {
                // Option<_> key fields mean "storage assigns it", not a NULL column.
                if pk.auto_increment {
                    pk.nullable = false;
                } else {
                    return Err(OrmError::invalid_schema(format!(
                        "primary key '{table}.{}' cannot be nullable",
                        pk.name
                    )));
                }
            }
            pk.unique = false;
        }

        let mut indexes = Vec::new();
        for (field, wants_index) in fields.iter().zip(&index_flags) {
            if field.unique || *wants_index {
                let columns = vec![field.name.clone()];
                indexes.push(IndexDef::new(
                    IndexDef::conventional_name(&table, &columns),
                    columns,
                    field.unique,
                ));
            }
        }
        for index in self.indexes {
            for col in &index.columns {
                if !fields.iter().any(|f| &f.name == col) {
                    return Err(OrmError::invalid_schema(format!(
                        "index '{}' references unknown column '{col}'",
                        index.name
                    )));
                }
            }
            if indexes.iter().any(|i| i.name == index.name) {
                return Err(OrmError::invalid_schema(format!(
                    "duplicate index '{}' on '{table}'",
                    index.name
                )));
            }
            indexes.push(index);
        }

        Ok(TableSchema {
            name: table,
            fields,
            indexes,
        })
    }
}
