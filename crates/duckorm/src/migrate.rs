//! Additive schema migration.
//!
//! [`plan_migration`] diffs a target [`TableSchema`] against the live one reported by
//! the engine and produces the DDL needed to make the live table a superset of the
//! target: create the table, add missing columns, create missing indexes. Nothing
//! is ever dropped or altered in place; divergences that would need that fail with
//! [`OrmError::IrreconcilableSchema`].
//!
//! Every emitted statement is idempotent (`IF NOT EXISTS`), and a live schema that
//! already matches produces an empty plan.

use crate::dialect::{Dialect, KeyStrategy};
use crate::error::{OrmError, OrmResult};
use crate::ident;
use crate::schema::{FieldDescriptor, IndexDef, TableSchema};
use std::collections::BTreeSet;

/// One schema change.
#[derive(Debug, Clone, PartialEq)]
pub enum DdlOp {
    /// Create the table (and its key sequence where the dialect uses one).
    CreateTable(TableSchema),
    AddColumn {
        table: String,
        field: FieldDescriptor,
    },
    CreateIndex {
        table: String,
        index: IndexDef,
    },
}

impl DdlOp {
    /// Render as one or more DDL statements.
    pub fn statements(&self, dialect: &Dialect) -> Vec<String> {
        match self {
            DdlOp::CreateTable(schema) => create_table_sql(schema, dialect),
            DdlOp::AddColumn { table, field } => add_column_sql(table, field),
            DdlOp::CreateIndex { table, index } => vec![create_index_sql(table, index)],
        }
    }
}

/// Ordered changes for one table: table creation, then columns, then indexes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MigrationPlan {
    pub table: String,
    pub ops: Vec<DdlOp>,
    /// Live columns the target does not declare. Kept as-is.
    pub extra_columns: Vec<String>,
}

impl MigrationPlan {
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn statements(&self, dialect: &Dialect) -> Vec<String> {
        self.ops.iter().flat_map(|op| op.statements(dialect)).collect()
    }
}

/// Compute the changes that bring `live` up to `target`.
///
/// `live == None` means the table does not exist yet.
pub fn plan_migration(
    target: &TableSchema,
    live: Option<&TableSchema>,
) -> OrmResult<MigrationPlan> {
    let mut plan = MigrationPlan {
        table: target.name.clone(),
        ..Default::default()
    };

    let Some(live) = live else {
        plan.ops.push(DdlOp::CreateTable(target.clone()));
        for index in &target.indexes {
            plan.ops.push(DdlOp::CreateIndex {
                table: target.name.clone(),
                index: index.clone(),
            });
        }
        return Ok(plan);
    };

    let target_pk: BTreeSet<&str> = target
        .primary_key()
        .iter()
        .map(|f| f.name.as_str())
        .collect();
    let live_pk: BTreeSet<&str> = live.primary_key().iter().map(|f| f.name.as_str()).collect();
    if target_pk != live_pk {
        return Err(OrmError::irreconcilable(
            &target.name,
            format!(
                "primary key differs (declared {:?}, live {:?})",
                target_pk, live_pk
            ),
        ));
    }

    let mut added = Vec::new();
    for field in &target.fields {
        match live.field(&field.name) {
            Some(existing) => compare_column(&target.name, field, existing)?,
            None => {
                if field.auto_increment {
                    return Err(OrmError::irreconcilable(
                        &target.name,
                        format!("cannot add storage-assigned key column '{}'", field.name),
                    ));
                }
                if !field.nullable && field.default.is_none() {
                    return Err(OrmError::irreconcilable(
                        &target.name,
                        format!(
                            "cannot add NOT NULL column '{}' without a default",
                            field.name
                        ),
                    ));
                }
                added.push(DdlOp::AddColumn {
                    table: target.name.clone(),
                    field: field.clone(),
                });
            }
        }
    }
    plan.ops.extend(added);

    for index in &target.indexes {
        if live.index(&index.name).is_none() {
            plan.ops.push(DdlOp::CreateIndex {
                table: target.name.clone(),
                index: index.clone(),
            });
        }
    }

    plan.extra_columns = live
        .fields
        .iter()
        .filter(|f| !target.has_column(&f.name))
        .map(|f| f.name.clone())
        .collect();

    Ok(plan)
}

fn compare_column(table: &str, target: &FieldDescriptor, live: &FieldDescriptor) -> OrmResult<()> {
    if target.field_type != live.field_type {
        return Err(OrmError::irreconcilable(
            table,
            format!(
                "column '{}' is {} but declared {}",
                target.name, live.field_type, target.field_type
            ),
        ));
    }
    if target.nullable != live.nullable {
        let describe = |nullable: bool| if nullable { "nullable" } else { "NOT NULL" };
        return Err(OrmError::irreconcilable(
            table,
            format!(
                "column '{}' is {} but declared {}",
                target.name,
                describe(live.nullable),
                describe(target.nullable)
            ),
        ));
    }
    Ok(())
}

/// `CREATE TABLE` (preceded by `CREATE SEQUENCE` on sequence dialects).
pub fn create_table_sql(schema: &TableSchema, dialect: &Dialect) -> Vec<String> {
    let mut statements = Vec::with_capacity(2);
    let sequence = match dialect.key_strategy {
        KeyStrategy::Sequence => schema.sequence_name(),
        _ => None,
    };
    if let Some(seq) = &sequence {
        statements.push(format!(
            "CREATE SEQUENCE IF NOT EXISTS {}",
            ident::quote(seq)
        ));
    }

    let pk = schema.primary_key();
    let inline_pk = pk.len() == 1;
    let mut defs: Vec<String> = schema
        .fields
        .iter()
        .map(|f| column_def(f, inline_pk, sequence.as_deref(), dialect))
        .collect();
    if !inline_pk && !pk.is_empty() {
        let cols: Vec<String> = pk.iter().map(|f| ident::quote(&f.name)).collect();
        defs.push(format!("PRIMARY KEY ({})", cols.join(", ")));
    }

    statements.push(format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        ident::quote(&schema.name),
        defs.join(", ")
    ));
    statements
}

fn column_def(
    field: &FieldDescriptor,
    inline_pk: bool,
    sequence: Option<&str>,
    dialect: &Dialect,
) -> String {
    let mut sql = format!("{} {}", ident::quote(&field.name), field.storage_type());
    if field.primary_key && inline_pk {
        sql.push_str(" PRIMARY KEY");
    } else if !field.nullable {
        sql.push_str(" NOT NULL");
    }
    if field.auto_increment {
        match (dialect.key_strategy, sequence) {
            (KeyStrategy::Sequence, Some(seq)) => {
                sql.push_str(&format!(" DEFAULT nextval('{seq}')"));
            }
            (KeyStrategy::Identity, _) => sql.push_str(" GENERATED BY DEFAULT AS IDENTITY"),
            (KeyStrategy::AutoIncrement, _) => sql.push_str(" AUTOINCREMENT"),
            (KeyStrategy::Sequence, None) => {}
        }
    } else if let Some(default) = &field.default {
        sql.push_str(" DEFAULT ");
        sql.push_str(&default.to_sql());
    }
    if let Some(check) = &field.check {
        sql.push_str(&format!(" CHECK ({check})"));
    }
    sql
}

/// `ALTER TABLE ... ADD COLUMN`, then `SET NOT NULL` for non-nullable columns.
///
/// CHECK expressions are only applied when the table is created.
fn add_column_sql(table: &str, field: &FieldDescriptor) -> Vec<String> {
    let table = ident::quote(table);
    let column = ident::quote(&field.name);
    let mut add = format!(
        "ALTER TABLE {table} ADD COLUMN IF NOT EXISTS {column} {}",
        field.storage_type()
    );
    if let Some(default) = &field.default {
        add.push_str(" DEFAULT ");
        add.push_str(&default.to_sql());
    }
    let mut statements = vec![add];
    if !field.nullable {
        statements.push(format!(
            "ALTER TABLE {table} ALTER COLUMN {column} SET NOT NULL"
        ));
    }
    statements
}

fn create_index_sql(table: &str, index: &IndexDef) -> String {
    let cols: Vec<String> = index.columns.iter().map(|c| ident::quote(c)).collect();
    format!(
        "CREATE {}INDEX IF NOT EXISTS {} ON {} ({})",
        if index.unique { "UNIQUE " } else { "" },
        ident::quote(&index.name),
        ident::quote(table),
        cols.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ColumnDefault, FieldDef, FieldType, SchemaBuilder};

    fn products() -> TableSchema {
        SchemaBuilder::new("products")
            .field(FieldDef::text("code").size(50).unique())
            .field(FieldDef::text("name"))
            .field(FieldDef::integer("price"))
            .field(
                FieldDef::boolean("in_stock")
                    .nullable(true)
                    .default_literal("true"),
            )
            .build()
            .unwrap()
    }

    /// What an engine would report after applying `products()`.
    fn live_products() -> TableSchema {
        let mut live = products();
        for f in &mut live.fields {
            f.size = None;
            f.unique = false;
            if f.default.is_some() {
                f.default = Some(ColumnDefault::Expression("CAST('t' AS BOOLEAN)".into()));
            }
        }
        live
    }

    #[test]
    fn fresh_table_creates_sequence_table_and_indexes() {
        let plan = plan_migration(&products(), None).unwrap();
        let sql = plan.statements(&Dialect::DUCKDB);
        assert_eq!(
            sql,
            vec![
                r#"CREATE SEQUENCE IF NOT EXISTS "products_id_seq""#.to_string(),
                concat!(
                    r#"CREATE TABLE IF NOT EXISTS "products" ("#,
                    r#""id" BIGINT PRIMARY KEY DEFAULT nextval('products_id_seq'), "#,
                    r#""code" VARCHAR(50) NOT NULL, "#,
                    r#""name" VARCHAR NOT NULL, "#,
                    r#""price" BIGINT NOT NULL, "#,
                    r#""in_stock" BOOLEAN DEFAULT TRUE)"#
                )
                .to_string(),
                r#"CREATE UNIQUE INDEX IF NOT EXISTS "idx_products_code" ON "products" ("code")"#
                    .to_string(),
            ]
        );
    }

    #[test]
    fn matching_live_schema_is_a_no_op() {
        let plan = plan_migration(&products(), Some(&live_products())).unwrap();
        assert!(plan.is_empty(), "{plan:?}");
        assert!(plan.extra_columns.is_empty());
    }

    #[test]
    fn adds_missing_columns_before_indexes() {
        let target = SchemaBuilder::new("products")
            .field(FieldDef::text("code").size(50).unique())
            .field(FieldDef::text("name"))
            .field(FieldDef::integer("price"))
            .field(
                FieldDef::boolean("in_stock")
                    .nullable(true)
                    .default_literal("true"),
            )
            .field(FieldDef::text("category").nullable(true).index())
            .field(FieldDef::integer("stock").default_literal("0"))
            .build()
            .unwrap();
        let plan = plan_migration(&target, Some(&live_products())).unwrap();
        let sql = plan.statements(&Dialect::DUCKDB);
        assert_eq!(
            sql,
            vec![
                r#"ALTER TABLE "products" ADD COLUMN IF NOT EXISTS "category" VARCHAR"#,
                r#"ALTER TABLE "products" ADD COLUMN IF NOT EXISTS "stock" BIGINT DEFAULT 0"#,
                r#"ALTER TABLE "products" ALTER COLUMN "stock" SET NOT NULL"#,
                r#"CREATE INDEX IF NOT EXISTS "idx_products_category" ON "products" ("category")"#,
            ]
        );
    }

    #[test]
    fn extra_live_columns_are_kept() {
        let mut live = live_products();
        live.fields.push(FieldDescriptor::new("legacy", FieldType::Text));
        let plan = plan_migration(&products(), Some(&live)).unwrap();
        assert!(plan.is_empty());
        assert_eq!(plan.extra_columns, vec!["legacy"]);
    }

    #[test]
    fn type_change_is_irreconcilable() {
        let mut live = live_products();
        live.fields[3].field_type = FieldType::Text;
        let err = plan_migration(&products(), Some(&live)).unwrap_err();
        assert!(err.is_irreconcilable());
    }

    #[test]
    fn nullability_change_is_irreconcilable() {
        let mut live = live_products();
        live.fields[2].nullable = true;
        let err = plan_migration(&products(), Some(&live)).unwrap_err();
        assert!(err.is_irreconcilable());
    }

    #[test]
    fn primary_key_change_is_irreconcilable() {
        let mut live = live_products();
        live.fields[0].primary_key = false;
        live.fields[1].primary_key = true;
        let err = plan_migration(&products(), Some(&live)).unwrap_err();
        assert!(err.is_irreconcilable());
    }

    #[test]
    fn new_not_null_column_without_default_is_irreconcilable() {
        let target = SchemaBuilder::new("products")
            .field(FieldDef::text("code").size(50).unique())
            .field(FieldDef::text("name"))
            .field(FieldDef::integer("price"))
            .field(
                FieldDef::boolean("in_stock")
                    .nullable(true)
                    .default_literal("true"),
            )
            .field(FieldDef::text("sku"))
            .build()
            .unwrap();
        let err = plan_migration(&target, Some(&live_products())).unwrap_err();
        assert!(err.is_irreconcilable());
    }

    #[test]
    fn composite_key_renders_table_constraint() {
        let schema = SchemaBuilder::new("order_items")
            .field(FieldDef::integer("order_id"))
            .field(FieldDef::integer("line"))
            .field(FieldDef::integer("qty").check("qty > 0"))
            .composite_key(["order_id", "line"])
            .build()
            .unwrap();
        let sql = create_table_sql(&schema, &Dialect::DUCKDB);
        assert_eq!(sql.len(), 1);
        assert_eq!(
            sql[0],
            concat!(
                r#"CREATE TABLE IF NOT EXISTS "order_items" ("#,
                r#""order_id" BIGINT NOT NULL, "line" BIGINT NOT NULL, "#,
                r#""qty" BIGINT NOT NULL CHECK (qty > 0), "#,
                r#"PRIMARY KEY ("order_id", "line"))"#
            )
        );
    }

    #[test]
    fn identity_dialect_skips_sequence() {
        let sql = create_table_sql(&products(), &Dialect::POSTGRES);
        assert_eq!(sql.len(), 1);
        assert!(sql[0].contains(r#""id" BIGINT PRIMARY KEY GENERATED BY DEFAULT AS IDENTITY"#));
    }
}
