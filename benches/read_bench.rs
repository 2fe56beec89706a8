//! Benchmarks for the TsFile reading layer
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use tsfile::file::statistics::ValueStatistics;
use tsfile::{
    DeviceTimeIndex, MetadataIndexEntry, MetadataIndexNode, MetadataIndexNodeType, Statistics,
    TsDataType,
};

fn page_stats(i: u64) -> Statistics {
    let v = i as f64;
    Statistics {
        count: 100,
        start_time: i as i64 * 1000,
        end_time: i as i64 * 1000 + 999,
        values: ValueStatistics::Double {
            min: v - 1.0,
            max: v + 1.0,
            first: v,
            last: v,
            sum: v * 100.0,
        },
    }
}

fn bench_statistics_merge(c: &mut Criterion) {
    let mut group = c.benchmark_group("statistics_merge");

    for size in [100u64, 1000, 10000] {
        let pages: Vec<Statistics> = (0..size).map(page_stats).collect();
        group.throughput(Throughput::Elements(size));

        group.bench_function(format!("fold_{}", size), |b| {
            b.iter(|| {
                let mut acc = Statistics::empty(TsDataType::Double);
                for page in &pages {
                    acc.merge(black_box(page)).unwrap();
                }
                acc
            })
        });
    }

    group.finish();
}

fn bench_index_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("index_search");

    for size in [100usize, 10000] {
        let children: Vec<MetadataIndexEntry> = (0..size)
            .map(|i| MetadataIndexEntry {
                name: format!("s{:08}", i),
                offset: i as u64 * 64,
            })
            .collect();
        let node = MetadataIndexNode {
            children,
            end_offset: size as u64 * 64,
            node_type: MetadataIndexNodeType::LeafMeasurement,
        };

        group.bench_function(format!("exact_{}", size), |b| {
            b.iter(|| node.child_entry(black_box("s00000042"), true))
        });

        group.bench_function(format!("nearest_{}", size), |b| {
            b.iter(|| node.child_entry(black_box("s00000042x"), false))
        });
    }

    group.finish();
}

fn bench_time_index_roundtrip(c: &mut Criterion) {
    let mut group = c.benchmark_group("time_index");

    let mut index = DeviceTimeIndex::new(604_800_000);
    for i in 0..1000i64 {
        let device = format!("root.sg{}.d{}", i % 10, i);
        index.update_start_time(&device, i * 100);
        index.update_end_time(&device, i * 100 + 99);
    }

    group.bench_function("serialize_1000", |b| {
        b.iter(|| {
            let mut buf = Vec::new();
            index.serialize(&mut buf).unwrap();
            buf
        })
    });

    let mut serialized = Vec::new();
    index.serialize(&mut serialized).unwrap();

    group.bench_function("deserialize_1000", |b| {
        b.iter(|| DeviceTimeIndex::deserialize(&mut black_box(serialized.as_slice()), 604_800_000))
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_statistics_merge,
    bench_index_search,
    bench_time_index_roundtrip
);
criterion_main!(benches);
