use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::hint::black_box;
use tiercache_storage::{Cache, Ordering, Predicate, Record, RecordList, UniqueKey};

const STATUSES: [&str; 4] = ["OPEN", "HELD", "CLOSED", "VOID"];

fn order(id: i64) -> Record {
    Record::builder("Order")
        .key("id", id)
        .field("status", STATUSES[(id % 4) as usize])
        .field("total", id * 7 % 1000)
        .build()
}

/// A cache holding `conditions` list entries for Order, each a distinct
/// range over `total` combined with a status check.
fn populated(conditions: i64) -> Cache {
    let cache = Cache::new("bench");
    let kind = "Order".into();
    let empty: RecordList = Vec::new().into();
    for i in 0..conditions {
        let predicate = Predicate::and(
            Predicate::eq("status", STATUSES[(i % 4) as usize]),
            Predicate::between("total", i * 10, i * 10 + 50),
        );
        cache
            .put_list(&kind, predicate, Ordering::asc("id"), empty.clone())
            .expect("populate list tier");
    }
    cache
}

fn bench_key_lookup(c: &mut Criterion) {
    let cache = Cache::new("bench");
    for id in 0..10_000 {
        cache.put(order(id)).expect("populate key tier");
    }
    let key = UniqueKey::single("Order", "id", 4_242);

    c.bench_function("key/get_hit", |b| {
        b.iter(|| black_box(cache.get(black_box(&key))));
    });
}

fn bench_fan_out(c: &mut Criterion) {
    let mut group = c.benchmark_group("fan_out/remove");
    for conditions in [16i64, 256, 4_096] {
        group.bench_with_input(
            BenchmarkId::from_parameter(conditions),
            &conditions,
            |b, &conditions| {
                let cache = populated(conditions);
                // Matches nothing, so the partition stays populated across iterations.
                let record = Record::builder("Order")
                    .key("id", -1)
                    .field("status", "ARCHIVED")
                    .field("total", 0)
                    .build();
                b.iter(|| black_box(cache.remove(black_box(&record)).expect("fan-out")));
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_key_lookup, bench_fan_out);
criterion_main!(benches);
