use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use pg_dbc::prelude::*;
use std::hint::black_box;

fn wide_row(columns: usize) -> ColumnValues {
    (0..columns)
        .map(|i| (format!("col_{i}"), RowValues::Int(i64::try_from(i).unwrap_or_default())))
        .collect()
}

fn benchmark_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_insert");
    for columns in [4, 32, 256] {
        let row = wide_row(columns);
        group.bench_with_input(BenchmarkId::from_parameter(columns), &row, |b, row| {
            b.iter(|| build_insert(black_box("wide"), row.clone()));
        });
    }
    group.finish();
}

fn benchmark_select(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_select");
    for values in [1, 16, 512] {
        let query = SelectQuery::new("events")
            .fields(["id", "kind", "at"])
            .filter(
                FilterCondition::new()
                    .eq("owner", 7_i64)
                    .any_of("id", (0..values).map(i64::from)),
            )
            .order_by("at", "DESC")
            .limit(100);
        group.bench_with_input(BenchmarkId::from_parameter(values), &query, |b, query| {
            b.iter(|| black_box(query).build());
        });
    }
    group.finish();
}

fn benchmark_update(c: &mut Criterion) {
    let filter = FilterCondition::new().eq("tenant", 1_i64).eq("id", 42_i64);
    let updates = wide_row(16);
    c.bench_function("build_update", |b| {
        b.iter(|| build_update(black_box("wide"), &filter, updates.clone()));
    });
}

criterion_group!(benches, benchmark_insert, benchmark_select, benchmark_update);
criterion_main!(benches);
