//! Aggregation against an in-memory DuckDB.

#![cfg(feature = "duckdb")]

use duckorm::prelude::*;
use duckorm::{AggregateFn, QueryPlan, SelectItem};

#[derive(Debug, Record)]
struct Sale {
    id: Option<i64>,
    region: String,
    amount: i64,
    #[orm(nullable)]
    note: Option<String>,
}

fn sale(region: &str, amount: i64) -> Sale {
    Sale {
        id: None,
        region: region.to_string(),
        amount,
        note: None,
    }
}

fn session() -> Session<DuckDbEngine> {
    let session = Session::new(DuckDbEngine::open_in_memory().unwrap());
    session.auto_migrate::<Sale>().unwrap();
    session
}

fn stats() -> AggregateQuery {
    AggregateQuery::new()
        .select(AggregateExpr::avg("amount"))
        .select(AggregateExpr::max("amount"))
        .select(AggregateExpr::min("amount"))
}

#[test]
fn aggregates_over_empty_table_yield_one_row_of_nulls() {
    let session = session();

    let rows = session.aggregate::<Sale>(stats()).unwrap();
    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    assert_eq!(row.columns(), ["avg_amount", "max_amount", "min_amount"]);
    assert!(row.values().iter().all(Value::is_null));
    assert_eq!(row.get::<Option<f64>>(0).unwrap(), None);

    assert_eq!(session.count::<Sale>(None).unwrap(), 0);
}

#[test]
fn aggregates_over_rows() {
    let session = session();
    session
        .insert_many(&[sale("north", 10), sale("north", 30), sale("south", 5)])
        .unwrap();

    let rows = session.aggregate::<Sale>(stats()).unwrap();
    let row = &rows[0];
    assert_eq!(row.get::<f64>(0).unwrap(), 15.0);
    assert_eq!(row.get_by_name::<i64>("max_amount").unwrap(), 30);
    assert_eq!(row.get_by_name::<i64>("min_amount").unwrap(), 5);
}

#[test]
fn grouped_aggregates_with_having() {
    let session = session();
    session
        .insert_many(&[
            sale("north", 10),
            sale("north", 30),
            sale("south", 5),
            sale("west", 50),
        ])
        .unwrap();

    let rows = session
        .aggregate::<Sale>(
            AggregateQuery::new()
                .select("region")
                .select(AggregateExpr::sum("amount").alias("total"))
                .select(AggregateExpr::count_all())
                .group_by("region")
                .having(Condition::gt(AggregateExpr::sum("amount"), 20))
                .order_by(OrderBy::desc("total")),
        )
        .unwrap();

    let summary: Vec<(String, i64, i64)> = rows
        .iter()
        .map(|r| {
            (
                r.get::<String>(0).unwrap(),
                r.get::<i64>(1).unwrap(),
                r.get::<i64>(2).unwrap(),
            )
        })
        .collect();
    assert_eq!(
        summary,
        vec![("west".to_string(), 50, 1), ("north".to_string(), 40, 2)]
    );
}

#[test]
fn count_with_condition() {
    let session = session();
    session
        .insert_many(&[sale("north", 10), sale("south", 20)])
        .unwrap();

    assert_eq!(session.count::<Sale>(Some(Condition::eq("region", "north"))).unwrap(), 1);
    assert_eq!(session.count::<Sale>(Some(Condition::is_null("note"))).unwrap(), 2);
}

#[test]
fn find_rows_with_explicit_plan() {
    let session = session();
    session.insert_many(&[sale("north", 10), sale("south", 20)]).unwrap();

    let schema = Sale::describe().unwrap();
    let plan = QueryPlan::new("sales")
        .select(vec![
            SelectItem::Column("region".to_string()),
            SelectItem::Aggregate(AggregateExpr::new(AggregateFn::Max, "amount")),
        ])
        .group_by(["region"])
        .order_by(OrderBy::asc("region"));
    let rows = session.find_rows(&schema, &plan).unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1].get::<String>(0).unwrap(), "south");
    assert_eq!(rows[1].get::<i64>(1).unwrap(), 20);
}
