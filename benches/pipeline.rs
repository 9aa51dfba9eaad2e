//! Pipeline benchmarks for rust-schemadiff
//!
//! Measures each stage on a generated schema:
//! - SQL parsing
//! - Metadata extraction
//! - Catalog walk-through
//! - Diffing
//! - Migration generation
//!
//! Run with: cargo bench
//! Compare against baseline: cargo bench -- --save-baseline before
//!                          (make changes)
//!                          cargo bench -- --baseline before

use std::fmt::Write;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rust_schemadiff::diff::{diff, DiffOptions};
use rust_schemadiff::migration::generate_migration;
use rust_schemadiff::model::{build_snapshot, ExtractOptions};
use rust_schemadiff::parser::parse_sql;
use rust_schemadiff::walk_through::{walk_through, WalkThroughOptions};
use rust_schemadiff::DatabaseSnapshot;

/// A schema of `tables` tables; `revision` shifts a few columns and indexes.
fn generate_schema(tables: usize, revision: usize) -> String {
    let mut sql = String::new();
    for i in 0..tables {
        let _ = write!(
            sql,
            "CREATE TABLE t{i} (\n  id INT NOT NULL AUTO_INCREMENT,\n  name VARCHAR(64) NOT NULL,\n  \
             created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,\n"
        );
        if (i + revision) % 3 == 0 {
            sql.push_str("  note TEXT,\n");
        }
        if i > 0 {
            let _ = writeln!(sql, "  parent_id INT,\n  CONSTRAINT fk_t{i} FOREIGN KEY (parent_id) REFERENCES t{} (id),", i - 1);
        }
        if (i + revision) % 2 == 0 {
            sql.push_str("  KEY idx_name (name),\n");
        }
        sql.push_str("  PRIMARY KEY (id)\n) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4;\n\n");
    }
    sql
}

fn extract(sql: &str) -> DatabaseSnapshot {
    build_snapshot(&parse_sql(sql).unwrap(), &ExtractOptions::default()).unwrap()
}

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");
    for tables in [10, 100] {
        let sql = generate_schema(tables, 0);
        group.throughput(Throughput::Bytes(sql.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(tables), &sql, |b, sql| {
            b.iter(|| parse_sql(black_box(sql)).unwrap())
        });
    }
    group.finish();
}

fn bench_extract(c: &mut Criterion) {
    let mut group = c.benchmark_group("extract");
    for tables in [10, 100] {
        let statements = parse_sql(&generate_schema(tables, 0)).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(tables), &statements, |b, statements| {
            b.iter(|| build_snapshot(black_box(statements), &ExtractOptions::default()).unwrap())
        });
    }
    group.finish();
}

fn bench_walk_through(c: &mut Criterion) {
    let mut group = c.benchmark_group("walk_through");
    for tables in [10, 100] {
        let statements = parse_sql(&generate_schema(tables, 0)).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(tables), &statements, |b, statements| {
            b.iter(|| {
                let mut snapshot = DatabaseSnapshot::new("", false);
                walk_through(&mut snapshot, black_box(statements), &WalkThroughOptions::default())
            })
        });
    }
    group.finish();
}

fn bench_diff_and_migrate(c: &mut Criterion) {
    let mut group = c.benchmark_group("diff_and_migrate");
    for tables in [10, 100] {
        let before = extract(&generate_schema(tables, 0));
        let after = extract(&generate_schema(tables, 1));
        let options = DiffOptions::default();

        group.bench_with_input(BenchmarkId::new("diff", tables), &(&before, &after), |b, (before, after)| {
            b.iter(|| diff(black_box(before), black_box(after), &options).unwrap())
        });

        let changes = diff(&before, &after, &options).unwrap();
        group.bench_with_input(BenchmarkId::new("migrate", tables), &changes, |b, changes| {
            b.iter(|| generate_migration(black_box(changes)).unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, bench_parse, bench_extract, bench_walk_through, bench_diff_and_migrate);
criterion_main!(benches);
