use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

use recast_regions::compact::build_compact_heightfield;
use recast_regions::distance_field::build_distance_field;
use recast_regions::heightfield::Heightfield;
use recast_regions::regions::{monotone, watershed};

fn flat_plane(size: i32) -> Heightfield {
    let mut hf = Heightfield::new(size, size);
    for y in 0..size {
        for x in 0..size {
            hf.add_span(x, y, 0, 1, 1, 0);
        }
    }
    hf
}

fn bench_watershed(c: &mut Criterion) {
    let mut group = c.benchmark_group("watershed");
    for size in [16, 32, 64] {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            let hf = flat_plane(size);

            b.iter(|| {
                let mut chf = build_compact_heightfield(&hf, 2, 1).unwrap();
                build_distance_field(&mut chf);
                watershed::build_regions(&mut chf, 2, 8, 20).unwrap();
            });
        });
    }
    group.finish();
}

fn bench_monotone(c: &mut Criterion) {
    let mut group = c.benchmark_group("monotone");
    for size in [16, 32, 64] {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            let hf = flat_plane(size);

            b.iter(|| {
                let mut chf = build_compact_heightfield(&hf, 2, 1).unwrap();
                monotone::build_regions(&mut chf, 2, 8, 20).unwrap();
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_watershed, bench_monotone);
criterion_main!(benches);
