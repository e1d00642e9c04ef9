use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use duckorm::{
    Condition, Dialect, FieldDef, InsertPlan, Payload, QueryPlan, SchemaBuilder, TableSchema,
};

/// A table with `n` integer columns `col0..col{n-1}`.
fn wide_schema(n: usize) -> TableSchema {
    (0..n)
        .fold(SchemaBuilder::new("t"), |b, i| {
            b.field(FieldDef::integer(format!("col{i}")))
        })
        .build()
        .expect("valid schema")
}

/// `col0 = $1 AND col1 = $2 ...`
fn conjunction(n: usize) -> Condition {
    Condition::and(
        (0..n)
            .map(|i| Condition::eq(format!("col{i}"), i as i64))
            .collect(),
    )
}

fn bench_condition_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("statement_builder/condition_render");

    for n in [1, 5, 10, 50] {
        let cond = conjunction(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &cond, |b, cond| {
            b.iter(|| black_box(cond.to_fragment(&Dialect::DUCKDB)));
        });
    }

    group.finish();
}

fn bench_select_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("statement_builder/select_build");

    for n in [1, 5, 10, 50] {
        let schema = wide_schema(n);
        let plan = QueryPlan::new("t").filter(conjunction(n)).limit(10);
        group.bench_with_input(BenchmarkId::from_parameter(n), &plan, |b, plan| {
            b.iter(|| black_box(plan.build(&schema, &Dialect::DUCKDB)));
        });
    }

    group.finish();
}

fn bench_insert_batch(c: &mut Criterion) {
    let mut group = c.benchmark_group("statement_builder/insert_batch");
    let schema = wide_schema(5);

    for rows in [1, 10, 100, 1000] {
        let plan = InsertPlan::new("t").rows((0..rows).map(|r| {
            (0..5)
                .map(|i| (format!("col{i}"), duckorm::Value::Integer(r * 5 + i)))
                .collect::<Payload>()
        }));
        group.bench_with_input(BenchmarkId::from_parameter(rows), &plan, |b, plan| {
            b.iter(|| black_box(plan.build(&schema, &Dialect::DUCKDB, 500)));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_condition_render,
    bench_select_build,
    bench_insert_batch
);
criterion_main!(benches);
