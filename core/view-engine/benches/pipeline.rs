//! FILENAME: core/view-engine/benches/pipeline.rs
//! Benchmarks for the filter -> group -> flatten -> window pipeline.

use std::collections::HashSet;
use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use engine::{DateBucket, Field, FieldType, GroupRule, Row};
use view_engine::{
    build_groups, compute_window, filter_rows, flatten_groups, GroupOptions, HeightModel,
    WindowConfig,
};

fn sample_rows(count: usize) -> Vec<Arc<Row>> {
    let regions = ["North", "South", "East", "West"];
    (0..count)
        .map(|i| {
            Arc::new(
                Row::new(i)
                    .with("Name", format!("Item {}", i))
                    .with("Region", regions[i % regions.len()])
                    .with("Due", format!("2024-{:02}-{:02}", i % 12 + 1, i % 28 + 1)),
            )
        })
        .collect()
}

fn sample_fields() -> Vec<Field> {
    vec![
        Field::new("f1", "Name", FieldType::Text),
        Field::new("f2", "Region", FieldType::Text),
        Field::new("f3", "Due", FieldType::Date),
    ]
}

fn bench_pipeline(c: &mut Criterion) {
    let rows = sample_rows(50_000);
    let fields = sample_fields();
    let rules = vec![
        GroupRule::field("Region"),
        GroupRule::date("Due", DateBucket::Month),
    ];
    let options = GroupOptions::default();

    c.bench_function("filter_50k", |b| {
        b.iter(|| filter_rows(black_box(&rows), &fields, "item 4"))
    });

    c.bench_function("group_50k_two_levels", |b| {
        b.iter(|| build_groups(black_box(&rows), &fields, &rules, &options))
    });

    let groups = build_groups(&rows, &fields, &rules, &options);
    let collapsed = HashSet::new();
    c.bench_function("flatten_50k", |b| {
        b.iter(|| flatten_groups(black_box(&groups), &collapsed))
    });

    let items = flatten_groups(&groups, &collapsed);
    let heights = HeightModel::default();
    let config = WindowConfig::default();
    c.bench_function("window_mid_scroll", |b| {
        b.iter(|| {
            compute_window(
                black_box(&items),
                |item| heights.height_of(item),
                black_box(600_000.0),
                900.0,
                &config,
            )
        })
    });
}

criterion_group!(benches, bench_pipeline);
criterion_main!(benches);
