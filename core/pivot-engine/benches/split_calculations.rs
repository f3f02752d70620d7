//! FILENAME: core/pivot-engine/benches/split_calculations.rs
//! Benchmarks for the row-wise and column-wise split transforms.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use engine::{
    BucketSchema, Cell, CellValue, Column, ColumnKind, FormatterCache, LeafTable, Row, TableNode,
};
use pivot_engine::{split_cols, split_table};

fn build_leaf(rows: usize, split_schema: BucketSchema) -> LeafTable {
    let columns = vec![
        Column::new("host", "host", ColumnKind::Bucket)
            .with_schema(BucketSchema::Bucket)
            .with_declared_index(0),
        Column::new("os", "os", ColumnKind::Bucket)
            .with_schema(split_schema)
            .with_declared_index(1),
        Column::new("count", "Count", ColumnKind::Metric).with_declared_index(2),
        Column::new("bytes", "Bytes", ColumnKind::Metric).with_declared_index(3),
    ];
    let data = (0..rows)
        .map(|i| {
            Row::new(vec![
                Cell::new(CellValue::Text(format!("host-{}", i / 8)), "host"),
                Cell::new(CellValue::Text(format!("os-{}", i % 8)), "os"),
                Cell::new(CellValue::Number(i as f64), "count"),
                Cell::new(CellValue::Number((i * 1024) as f64), "bytes"),
            ])
        })
        .collect();
    LeafTable::new(columns, data)
}

fn bench_splits(c: &mut Criterion) {
    let mut group = c.benchmark_group("split");

    for rows in [1_000usize, 10_000, 100_000] {
        group.throughput(Throughput::Elements(rows as u64));

        let leaf = build_leaf(rows, BucketSchema::Split);
        group.bench_with_input(BenchmarkId::new("split_table", rows), &leaf, |b, leaf| {
            b.iter(|| {
                let formatters = FormatterCache::new();
                let out = split_table(TableNode::Leaf(leaf.clone()), false, &formatters);
                black_box(out);
            })
        });

        let leaf = build_leaf(rows, BucketSchema::SplitCols);
        group.bench_with_input(BenchmarkId::new("split_cols", rows), &leaf, |b, leaf| {
            b.iter(|| {
                let formatters = FormatterCache::new();
                let mut node = TableNode::Leaf(leaf.clone());
                split_cols(&mut node, &formatters, rows as f64);
                black_box(node);
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_splits);
criterion_main!(benches);
