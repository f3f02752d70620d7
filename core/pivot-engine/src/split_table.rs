//! FILENAME: core/pivot-engine/src/split_table.rs
//! Row-wise split: distinct values of a split bucket become sub-tables.
//!
//! Algorithm:
//! 1. Find the first bucket with the `split` schema in the leaf
//! 2. Group rows by that bucket's value, in first-seen order. Values are
//!    interned as `ValueKey`s so 1 and "1" stay distinct groups
//! 3. Each group becomes a child leaf without the split column (and, when
//!    metrics are repeated at every level, without the metrics after it)
//! 4. Recurse into each child to apply further splits

use engine::{
    CellValue, Column, FormatterCache, LeafTable, Row, TableGroup, TableNode, ValueKey,
};
use log::debug;
use rustc_hash::FxHashMap;

/// Metrics belonging to each bucket level when metrics are repeated per level.
pub fn metrics_per_bucket(columns: &[Column]) -> usize {
    let buckets = columns.iter().filter(|c| c.is_bucket()).count();
    let metrics = columns.iter().filter(|c| c.is_metric()).count();
    if buckets == 0 {
        0
    } else {
        metrics / buckets
    }
}

/// Splits every leaf of `node` on its split buckets.
pub fn split_table(
    node: TableNode,
    metrics_at_all_levels: bool,
    formatters: &FormatterCache,
) -> TableNode {
    match node {
        TableNode::Group(mut group) => {
            group.tables = group
                .tables
                .into_iter()
                .map(|table| split_table(table, metrics_at_all_levels, formatters))
                .collect();
            TableNode::Group(group)
        }
        TableNode::Leaf(leaf) => {
            let per_bucket = if metrics_at_all_levels {
                metrics_per_bucket(&leaf.columns)
            } else {
                0
            };
            split_leaf(leaf, per_bucket, formatters)
        }
    }
}

fn split_leaf(leaf: LeafTable, per_bucket: usize, formatters: &FormatterCache) -> TableNode {
    let Some(split_index) = leaf.columns.iter().position(Column::is_split) else {
        return TableNode::Leaf(leaf);
    };

    let removed: Vec<usize> = std::iter::once(split_index)
        .chain(
            (split_index + 1..leaf.columns.len())
                .take_while(|&i| leaf.columns[i].is_metric())
                .take(per_bucket),
        )
        .collect();

    let split_column = leaf.columns[split_index].clone();
    // Children number their columns from zero so `colN` follows what is shown
    let child_columns: Vec<Column> = leaf
        .columns
        .iter()
        .enumerate()
        .filter(|(i, _)| !removed.contains(i))
        .enumerate()
        .map(|(position, (_, c))| c.clone().with_declared_index(position))
        .collect();

    let mut slots: FxHashMap<ValueKey, usize> = FxHashMap::default();
    let mut groups: Vec<(CellValue, Vec<Row>)> = Vec::new();

    for row in leaf.rows {
        let value = row
            .cells
            .get(split_index)
            .map(|c| c.value.clone())
            .unwrap_or_default();
        let slot = *slots.entry(ValueKey::from(&value)).or_insert_with(|| {
            groups.push((value.clone(), Vec::new()));
            groups.len() - 1
        });

        let cells = row
            .cells
            .into_iter()
            .enumerate()
            .filter(|(i, _)| !removed.contains(i))
            .map(|(_, c)| c)
            .collect();
        groups[slot].1.push(Row {
            cells,
            sort: row.sort,
        });
    }

    debug!(
        target: "PIVOT",
        "split '{}' into {} tables",
        split_column.title,
        groups.len()
    );

    let tables = groups
        .into_iter()
        .map(|(value, rows)| {
            let title = format!(
                "{}: {}",
                formatters.format_value(&value, &split_column),
                split_column.title
            );
            let mut child = LeafTable::new(child_columns.clone(), rows);
            child.title = Some(title.clone());
            child.total_label = leaf.total_label.clone();
            TableNode::Group(TableGroup {
                title,
                key: value,
                tables: vec![split_leaf(child, per_bucket, formatters)],
            })
        })
        .collect();

    TableNode::Group(TableGroup {
        title: split_column.title.clone(),
        key: CellValue::Null,
        tables,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine::{BucketSchema, Cell, ColumnKind};
    use pretty_assertions::assert_eq;

    fn column(id: &str, title: &str, kind: ColumnKind, index: usize) -> Column {
        let c = Column::new(id, title, kind).with_declared_index(index);
        if kind == ColumnKind::Bucket {
            c.with_schema(BucketSchema::Bucket)
        } else {
            c
        }
    }

    fn row(values: Vec<CellValue>, columns: &[Column]) -> Row {
        Row::new(
            values
                .into_iter()
                .zip(columns)
                .map(|(v, c)| Cell::new(v, c.id.clone()))
                .collect(),
        )
    }

    fn table(columns: Vec<Column>, rows: Vec<Vec<CellValue>>) -> LeafTable {
        let rows = rows.into_iter().map(|r| row(r, &columns)).collect();
        LeafTable::new(columns, rows)
    }

    fn t(s: &str) -> CellValue {
        CellValue::Text(s.into())
    }

    fn n(v: f64) -> CellValue {
        CellValue::Number(v)
    }

    #[test]
    fn leaf_without_split_bucket_is_unchanged() {
        let leaf = table(
            vec![column("0", "host", ColumnKind::Bucket, 0), column("1", "Count", ColumnKind::Metric, 1)],
            vec![vec![t("a"), n(1.0)]],
        );
        let out = split_table(TableNode::Leaf(leaf), false, &FormatterCache::new());
        assert!(matches!(out, TableNode::Leaf(_)));
    }

    #[test]
    fn groups_rows_in_first_seen_order_without_coercing_keys() {
        let columns = vec![
            column("0", "code", ColumnKind::Bucket, 0).with_schema(BucketSchema::Split),
            column("1", "host", ColumnKind::Bucket, 1),
            column("2", "Count", ColumnKind::Metric, 2),
        ];
        let leaf = table(
            columns,
            vec![
                vec![n(1.0), t("a"), n(3.0)],
                vec![t("1"), t("b"), n(4.0)],
                vec![n(1.0), t("c"), n(5.0)],
            ],
        );

        let out = split_table(TableNode::Leaf(leaf), false, &FormatterCache::new());
        let TableNode::Group(root) = &out else {
            panic!("expected a group");
        };
        assert_eq!(root.tables.len(), 2);

        let TableNode::Group(first) = &root.tables[0] else {
            panic!("expected a group");
        };
        assert_eq!(first.title, "1: code");
        assert_eq!(first.key, n(1.0));

        let leaves = out.leaves();
        assert_eq!(leaves[0].rows.len(), 2);
        assert_eq!(leaves[1].rows.len(), 1);
        assert_eq!(leaves[0].columns.len(), 2);
        assert!(out.is_rectangular());
    }

    #[test]
    fn split_round_trip_preserves_rows_per_value() {
        let columns = vec![
            column("0", "region", ColumnKind::Bucket, 0).with_schema(BucketSchema::Split),
            column("1", "Count", ColumnKind::Metric, 1),
        ];
        let values = vec![
            vec![t("EU"), n(1.0)],
            vec![t("US"), n(2.0)],
            vec![t("EU"), n(3.0)],
        ];
        let leaf = table(columns, values.clone());
        let out = split_table(TableNode::Leaf(leaf), false, &FormatterCache::new());

        let TableNode::Group(root) = &out else {
            panic!("expected a group");
        };
        let mut rebuilt = Vec::new();
        for child in &root.tables {
            let TableNode::Group(group) = child else {
                panic!("expected a group");
            };
            for leaf in child.leaves() {
                for row in &leaf.rows {
                    rebuilt.push(vec![group.key.clone(), row.cells[0].value.clone()]);
                }
            }
        }
        assert_eq!(rebuilt.len(), values.len());
        for original in &values {
            assert!(rebuilt.contains(original));
        }
    }

    #[test]
    fn metrics_at_all_levels_drop_the_split_levels_metrics() {
        let columns = vec![
            column("0", "region", ColumnKind::Bucket, 0).with_schema(BucketSchema::Split),
            column("1", "Count", ColumnKind::Metric, 1),
            column("2", "host", ColumnKind::Bucket, 2),
            column("3", "Count", ColumnKind::Metric, 3),
        ];
        let leaf = table(columns, vec![vec![t("EU"), n(9.0), t("a"), n(4.0)]]);
        let out = split_table(TableNode::Leaf(leaf), true, &FormatterCache::new());
        let leaves = out.leaves();
        let ids: Vec<&str> = leaves[0].columns.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["2", "3"]);
        assert_eq!(leaves[0].columns[1].declared_index, 1);
        assert_eq!(leaves[0].rows[0].cells[1].value, n(4.0));
    }

    #[test]
    fn nested_split_buckets_recurse() {
        let columns = vec![
            column("0", "region", ColumnKind::Bucket, 0).with_schema(BucketSchema::Split),
            column("1", "os", ColumnKind::Bucket, 1).with_schema(BucketSchema::Split),
            column("2", "Count", ColumnKind::Metric, 2),
        ];
        let leaf = table(
            columns,
            vec![
                vec![t("EU"), t("linux"), n(1.0)],
                vec![t("EU"), t("mac"), n(2.0)],
                vec![t("US"), t("linux"), n(3.0)],
            ],
        );
        let out = split_table(TableNode::Leaf(leaf), false, &FormatterCache::new());
        let leaves = out.leaves();
        assert_eq!(leaves.len(), 3);
        assert!(leaves.iter().all(|l| l.columns.len() == 1));
        assert_eq!(leaves[1].title.as_deref(), Some("mac: os"));
    }

    #[test]
    fn metrics_per_bucket_divides_metric_count() {
        let columns = vec![
            column("0", "a", ColumnKind::Bucket, 0),
            column("1", "m", ColumnKind::Metric, 1),
            column("2", "b", ColumnKind::Bucket, 2),
            column("3", "m", ColumnKind::Metric, 3),
        ];
        assert_eq!(metrics_per_bucket(&columns), 1);
        assert_eq!(metrics_per_bucket(&[]), 0);
    }
}
