use super::*;
use crate::condition::{OrderBy, Pagination};
use crate::schema::{FieldDef, SchemaBuilder};

fn products() -> TableSchema {
    SchemaBuilder::new("products")
        .field(FieldDef::text("code").size(50).unique())
        .field(FieldDef::text("name"))
        .field(FieldDef::integer("price"))
        .field(FieldDef::boolean("in_stock").default_literal("true"))
        .build()
        .unwrap()
}

fn product(code: &str, price: i64) -> Payload {
    Payload::new()
        .with("code", code)
        .with("name", format!("item {code}"))
        .with("price", price)
}

// ==================== Payload ====================

#[test]
fn payload_set_replaces_in_place() {
    let mut p = Payload::new().with("a", 1).with("b", 2);
    p.set("a", 10);
    let cols: Vec<&str> = p.columns().collect();
    assert_eq!(cols, vec!["a", "b"]);
    assert_eq!(p.get("a"), Some(&Value::Integer(10)));
    assert_eq!(p.remove("b"), Some(Value::Integer(2)));
    assert_eq!(p.len(), 1);
}

// ==================== SELECT ====================

#[test]
fn select_all_lists_schema_columns() {
    let stmt = QueryPlan::new("products")
        .build(&products(), &Dialect::DUCKDB)
        .unwrap();
    assert_eq!(
        stmt.sql,
        r#"SELECT "id", "code", "name", "price", "in_stock" FROM "products""#
    );
    assert_eq!(stmt.columns, vec!["id", "code", "name", "price", "in_stock"]);
    assert!(stmt.params.is_empty());
}

#[test]
fn select_with_filter_order_and_pagination() {
    let stmt = QueryPlan::new("products")
        .columns(["id", "code"])
        .filter(Condition::eq("code", "P001"))
        .filter(Condition::gt("price", 10))
        .order_by(OrderBy::desc("price"))
        .paginate(Pagination::page(2, 10).unwrap())
        .build(&products(), &Dialect::DUCKDB)
        .unwrap();
    assert_eq!(
        stmt.sql,
        r#"SELECT "id", "code" FROM "products" WHERE "code" = $1 AND "price" > $2 ORDER BY "price" DESC LIMIT 10 OFFSET 10"#
    );
    assert_eq!(stmt.params, vec![Value::from("P001"), Value::Integer(10)]);
    assert_eq!(stmt.kind, StatementKind::Select);
}

#[test]
fn select_aggregates_with_group_and_having() {
    let stmt = QueryPlan::new("products")
        .select(vec![
            SelectItem::from("in_stock"),
            AggregateExpr::avg("price").into(),
            AggregateExpr::count_all().alias("n").into(),
        ])
        .group_by(["in_stock"])
        .having(Condition::gte(AggregateExpr::count_all(), 2))
        .order_by(OrderBy::desc("avg_price"))
        .build(&products(), &Dialect::DUCKDB)
        .unwrap();
    assert_eq!(
        stmt.sql,
        r#"SELECT "in_stock", AVG("price") AS "avg_price", COUNT(*) AS "n" FROM "products" GROUP BY "in_stock" HAVING COUNT(*) >= $1 ORDER BY "avg_price" DESC"#
    );
    assert_eq!(stmt.columns, vec!["in_stock", "avg_price", "n"]);
}

#[test]
fn select_having_may_reference_alias() {
    let stmt = QueryPlan::new("products")
        .select(vec![AggregateExpr::max("price").into()])
        .having(Condition::gt("max_price", 5))
        .build(&products(), &Dialect::DUCKDB)
        .unwrap();
    assert!(stmt.sql.ends_with(r#"HAVING "max_price" > $1"#));
}

#[test]
fn select_rejects_ungrouped_column() {
    let err = QueryPlan::new("products")
        .select(vec![SelectItem::from("name"), AggregateExpr::avg("price").into()])
        .build(&products(), &Dialect::DUCKDB)
        .unwrap_err();
    assert!(matches!(err, OrmError::Validation(_)));
}

#[test]
fn select_rejects_order_by_ungrouped_column() {
    let err = QueryPlan::new("products")
        .select(vec![SelectItem::from("in_stock"), AggregateExpr::sum("price").into()])
        .group_by(["in_stock"])
        .order_by(OrderBy::asc("name"))
        .build(&products(), &Dialect::DUCKDB)
        .unwrap_err();
    assert!(matches!(err, OrmError::Validation(_)));

    let err = QueryPlan::new("products")
        .select(vec![AggregateExpr::max("price").into()])
        .order_by(OrderBy::desc("price"))
        .build(&products(), &Dialect::DUCKDB)
        .unwrap_err();
    assert!(matches!(err, OrmError::Validation(_)));

    // Grouped columns may be ordered on even when not selected.
    let stmt = QueryPlan::new("products")
        .select(vec![AggregateExpr::count_all().into()])
        .group_by(["in_stock"])
        .order_by(OrderBy::asc("in_stock"))
        .build(&products(), &Dialect::DUCKDB)
        .unwrap();
    assert!(stmt.sql.ends_with(r#"GROUP BY "in_stock" ORDER BY "in_stock" ASC"#));
}

#[test]
fn select_rejects_sum_over_text() {
    let err = QueryPlan::new("products")
        .select(vec![AggregateExpr::sum("name").into()])
        .build(&products(), &Dialect::DUCKDB)
        .unwrap_err();
    assert!(matches!(err, OrmError::InvalidCondition(_)));
}

#[test]
fn select_rejects_unknown_columns_before_rendering() {
    let schema = products();
    let err = QueryPlan::new("products")
        .columns(["nope"])
        .build(&schema, &Dialect::DUCKDB)
        .unwrap_err();
    assert!(matches!(err, OrmError::UnknownColumn { .. }));

    let err = QueryPlan::new("products")
        .order_by(OrderBy::asc("nope"))
        .build(&schema, &Dialect::DUCKDB)
        .unwrap_err();
    assert!(matches!(err, OrmError::UnknownColumn { .. }));

    let err = QueryPlan::new("products")
        .filter(Condition::eq("nope", 1))
        .build(&schema, &Dialect::DUCKDB)
        .unwrap_err();
    assert!(matches!(err, OrmError::UnknownColumn { .. }));
}

#[test]
fn plan_for_other_table_is_rejected() {
    let err = QueryPlan::new("orders")
        .build(&products(), &Dialect::DUCKDB)
        .unwrap_err();
    assert!(matches!(err, OrmError::Validation(_)));
}

#[test]
fn find_and_aggregate_query_convert_to_plans() {
    let plan = Find::filter(Condition::eq("code", "A"))
        .order_by(OrderBy::asc("id"))
        .limit(1)
        .into_plan("products");
    let stmt = plan.build(&products(), &Dialect::DUCKDB).unwrap();
    assert!(stmt.sql.ends_with(r#"WHERE "code" = $1 ORDER BY "id" ASC LIMIT 1"#));

    let stmt = AggregateQuery::new()
        .select(AggregateExpr::min("price"))
        .filter(Condition::eq("in_stock", true))
        .into_plan("products")
        .build(&products(), &Dialect::DUCKDB)
        .unwrap();
    assert_eq!(
        stmt.sql,
        r#"SELECT MIN("price") AS "min_price" FROM "products" WHERE "in_stock" = $1"#
    );
}

// ==================== INSERT ====================

#[test]
fn insert_omits_null_auto_key_and_defaulted_columns() {
    let row = product("P001", 1200)
        .with("id", Value::Null)
        .with("in_stock", Value::Null);
    let batches = InsertPlan::new("products")
        .row(row)
        .build(&products(), &Dialect::DUCKDB, 100)
        .unwrap();
    assert_eq!(batches.len(), 1);
    let stmt = &batches[0].statement;
    assert_eq!(
        stmt.sql,
        r#"INSERT INTO "products" ("code", "name", "price") VALUES ($1, $2, $3) RETURNING "id""#
    );
    assert_eq!(stmt.columns, vec!["id"]);
    assert!(batches[0].returns_keys());
    assert_eq!(batches[0].supplied_keys, None);
}

#[test]
fn insert_with_supplied_key_skips_returning() {
    let batches = InsertPlan::new("products")
        .row(product("P001", 1).with("id", 42))
        .build(&products(), &Dialect::DUCKDB, 100)
        .unwrap();
    assert!(!batches[0].statement.sql.contains("RETURNING"));
    assert_eq!(batches[0].supplied_keys, Some(vec![Value::Integer(42)]));
}

#[test]
fn insert_groups_consecutive_rows_with_same_columns() {
    let plan = InsertPlan::new("products").rows(vec![
        product("A", 1),
        product("B", 2),
        product("C", 3).with("in_stock", false),
        product("D", 4),
    ]);
    let batches = plan.build(&products(), &Dialect::DUCKDB, 100).unwrap();
    assert_eq!(batches.len(), 3);
    assert_eq!(batches[0].rows, vec![0, 1]);
    assert_eq!(batches[1].rows, vec![2]);
    assert_eq!(batches[2].rows, vec![3]);
    assert_eq!(
        batches[0].statement.sql,
        r#"INSERT INTO "products" ("code", "name", "price") VALUES ($1, $2, $3), ($4, $5, $6) RETURNING "id""#
    );
    assert_eq!(batches[0].statement.params.len(), 6);
}

#[test]
fn insert_chunks_by_batch_size() {
    let rows: Vec<Payload> = (0..5).map(|i| product(&format!("P{i}"), i)).collect();
    let batches = InsertPlan::new("products")
        .rows(rows)
        .build(&products(), &Dialect::DUCKDB, 2)
        .unwrap();
    let sizes: Vec<usize> = batches.iter().map(|b| b.rows.len()).collect();
    assert_eq!(sizes, vec![2, 2, 1]);
}

#[test]
fn insert_chunks_by_dialect_param_cap() {
    let rows: Vec<Payload> = (0..5).map(|i| product(&format!("P{i}"), i)).collect();
    let capped = Dialect {
        max_params: Some(7),
        ..Dialect::DUCKDB
    };
    let batches = InsertPlan::new("products")
        .rows(rows)
        .build(&products(), &capped, 100)
        .unwrap();
    let sizes: Vec<usize> = batches.iter().map(|b| b.rows.len()).collect();
    assert_eq!(sizes, vec![2, 2, 1]);
    assert!(batches.iter().all(|b| b.statement.params.len() <= 7));
}

#[test]
fn insert_treats_zero_auto_key_as_unassigned() {
    let batches = InsertPlan::new("products")
        .row(product("P001", 1).with("id", 0))
        .build(&products(), &Dialect::DUCKDB, 100)
        .unwrap();
    let stmt = &batches[0].statement;
    assert!(!stmt.sql.contains(r#""id","#));
    assert!(stmt.sql.ends_with(r#"RETURNING "id""#));
    assert_eq!(batches[0].supplied_keys, None);

    let batches = InsertPlan::new("products")
        .row(product("P002", 1).with("id", 7))
        .build(&products(), &Dialect::DUCKDB, 100)
        .unwrap();
    assert_eq!(batches[0].supplied_keys, Some(vec![Value::Integer(7)]));
}

#[test]
fn insert_per_row_on_generic_dialect() {
    let rows: Vec<Payload> = (0..3).map(|i| product(&format!("P{i}"), i)).collect();
    let batches = InsertPlan::new("products")
        .rows(rows)
        .build(&products(), &Dialect::GENERIC, 100)
        .unwrap();
    assert_eq!(batches.len(), 3);
    assert_eq!(
        batches[0].statement.sql,
        r#"INSERT INTO "products" ("code", "name", "price") VALUES (?, ?, ?)"#
    );
    assert!(!batches[0].returns_keys());
}

#[test]
fn insert_type_checks_payload() {
    let err = InsertPlan::new("products")
        .row(product("A", 1).with("price", "free"))
        .build(&products(), &Dialect::DUCKDB, 10)
        .unwrap_err();
    assert!(matches!(err, OrmError::InvalidValue { ref column, .. } if column == "price"));

    let err = InsertPlan::new("products")
        .row(product("A", 1).with("name", Value::Null))
        .build(&products(), &Dialect::DUCKDB, 10)
        .unwrap_err();
    assert!(matches!(err, OrmError::InvalidValue { ref column, .. } if column == "name"));

    let err = InsertPlan::new("products")
        .row(product("A", 1).with("colour", "red"))
        .build(&products(), &Dialect::DUCKDB, 10)
        .unwrap_err();
    assert!(matches!(err, OrmError::UnknownColumn { .. }));
}

#[test]
fn insert_of_only_defaults() {
    let schema = SchemaBuilder::new("events")
        .field(FieldDef::boolean("seen").default_literal("false"))
        .build()
        .unwrap();
    let batches = InsertPlan::new("events")
        .row(Payload::new())
        .build(&schema, &Dialect::DUCKDB, 10)
        .unwrap();
    assert_eq!(
        batches[0].statement.sql,
        r#"INSERT INTO "events" DEFAULT VALUES RETURNING "id""#
    );
}

// ==================== UPDATE / DELETE ====================

#[test]
fn update_renders_set_then_where() {
    let stmt = UpdatePlan::new("products", Payload::new().with("price", 99))
        .filter(Condition::eq("code", "P001"))
        .build(&products(), &Dialect::DUCKDB)
        .unwrap();
    assert_eq!(
        stmt.sql,
        r#"UPDATE "products" SET "price" = $1 WHERE "code" = $2"#
    );
    assert_eq!(stmt.params, vec![Value::Integer(99), Value::from("P001")]);
    assert!(!stmt.returns_rows());
}

#[test]
fn unconditioned_update_is_rejected() {
    let plan = UpdatePlan::new("products", Payload::new().with("price", 1));
    let err = plan.build(&products(), &Dialect::DUCKDB).unwrap_err();
    assert!(err.is_unconditioned_mutation());

    let tautology = plan.clone().filter(Condition::and(vec![]));
    assert!(
        tautology
            .build(&products(), &Dialect::DUCKDB)
            .unwrap_err()
            .is_unconditioned_mutation()
    );

    let stmt = plan.affect_all(true).build(&products(), &Dialect::DUCKDB).unwrap();
    assert_eq!(stmt.sql, r#"UPDATE "products" SET "price" = $1"#);
}

#[test]
fn empty_update_is_rejected() {
    let err = UpdatePlan::new("products", Payload::new())
        .filter(Condition::eq("id", 1))
        .build(&products(), &Dialect::DUCKDB)
        .unwrap_err();
    assert!(matches!(err, OrmError::Validation(_)));
}

#[test]
fn delete_requires_condition_or_affect_all() {
    let schema = products();
    let err = DeletePlan::new("products")
        .build(&schema, &Dialect::DUCKDB)
        .unwrap_err();
    assert!(matches!(
        err,
        OrmError::UnconditionedMutationRejected { kind: StatementKind::Delete, .. }
    ));

    let stmt = DeletePlan::new("products")
        .filter(Condition::in_list("id", [1, 2]))
        .build(&schema, &Dialect::DUCKDB)
        .unwrap();
    assert_eq!(stmt.sql, r#"DELETE FROM "products" WHERE "id" IN ($1, $2)"#);

    let stmt = DeletePlan::new("products")
        .affect_all(true)
        .build(&schema, &Dialect::DUCKDB)
        .unwrap();
    assert_eq!(stmt.sql, r#"DELETE FROM "products""#);
}

#[test]
fn statement_kind_display() {
    assert_eq!(StatementKind::Insert.to_string(), "INSERT");
    assert_eq!(StatementKind::Ddl.to_string(), "DDL");
}
