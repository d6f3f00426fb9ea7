//! Benchmarks for interning, container growth and collection.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use blade_core::{Heap, Value};

/// Intern the same small set of names repeatedly, as the compiler does
/// for identifiers.
fn bench_interning(c: &mut Criterion) {
    let names: Vec<String> = (0..64).map(|i| format!("identifier_{}", i)).collect();
    c.bench_function("intern_hits", |b| {
        let mut heap = Heap::new();
        for name in &names {
            heap.new_string(name).expect("intern");
        }
        b.iter(|| {
            for name in &names {
                black_box(heap.new_string(name).expect("intern"));
            }
        })
    });
}

fn bench_list_growth(c: &mut Criterion) {
    let mut group = c.benchmark_group("list_append");
    for size in [16usize, 1024, 16384] {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter(|| {
                let mut heap = Heap::new();
                let list = heap.new_list().expect("list");
                for i in 0..size {
                    heap.list_append(list, Value::from(i as i64)).expect("append");
                }
                black_box(heap.bytes_allocated())
            })
        });
    }
    group.finish();
}

/// Build a rooted list of dictionaries next to an equal amount of garbage,
/// then collect.
fn bench_collect(c: &mut Criterion) {
    let mut group = c.benchmark_group("collect");
    for objects in [1000usize, 10000] {
        group.bench_with_input(BenchmarkId::from_parameter(objects), &objects, |b, &objects| {
            b.iter(|| {
                let mut heap = Heap::new();
                let root = heap.new_list().expect("list");
                for i in 0..objects {
                    let dict = heap.new_dict().expect("dict");
                    heap.dict_set(dict, Value::from(i as i64), Value::Nil).expect("set");
                    heap.list_append(root, Value::Object(dict)).expect("append");
                    heap.new_range(0, i as i64).expect("range");
                }
                black_box(heap.collect(&root))
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_interning, bench_list_growth, bench_collect);
criterion_main!(benches);
