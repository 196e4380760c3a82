use criterion::{Criterion, black_box, criterion_group, criterion_main};
use std::time::Duration;

use geist_blocks::registry::BlockRegistry;
use geist_chunk::{Chunk, ChunkMap, LightChannel};
use geist_lighting::{LightEngine, compute_column_sunlight, snapshot_cluster};
use geist_world::{ChunkCoord, ColumnCoord, VoxelCoord};

fn air_world(r: i32, height: i32) -> ChunkMap {
    let mut map = ChunkMap::new(height);
    for cy in 0..height {
        for cz in -r..=r {
            for cx in -r..=r {
                map.insert(Chunk::filled(ChunkCoord::new(cx, cy, cz), 0));
            }
        }
    }
    map
}

fn bench_torch_place_remove(c: &mut Criterion) {
    let mut group = c.benchmark_group("torch");
    let reg = BlockRegistry::builtin();
    let at = VoxelCoord::new(8, 24, 8);
    group.bench_function("place_15", |b| {
        b.iter_batched(
            || air_world(1, 3),
            |mut world| {
                let mut engine = LightEngine::new();
                engine.add_light(&mut world, at, LightChannel::Red, 15);
                black_box(engine.drain_all(&mut world, &reg));
            },
            criterion::BatchSize::LargeInput,
        )
    });
    group.bench_function("place_remove_15", |b| {
        b.iter_batched(
            || {
                let mut world = air_world(1, 3);
                let mut engine = LightEngine::new();
                engine.add_light(&mut world, at, LightChannel::Red, 15);
                engine.drain_all(&mut world, &reg);
                (world, engine)
            },
            |(mut world, mut engine)| {
                engine.remove_light(&mut world, at, LightChannel::Red);
                black_box(engine.drain_all(&mut world, &reg));
            },
            criterion::BatchSize::LargeInput,
        )
    });
    group.finish();
}

fn bench_column_sunlight(c: &mut Criterion) {
    let mut group = c.benchmark_group("column_sunlight");
    group.measurement_time(Duration::from_secs(8));
    let reg = BlockRegistry::builtin();
    let world = air_world(1, 8);
    group.bench_function("air_column_8", |b| {
        b.iter(|| {
            let cluster = snapshot_cluster(&world, ColumnCoord::new(0, 0)).ok();
            black_box(cluster.map(|c| compute_column_sunlight(c, &reg)));
        })
    });
    group.finish();
}

criterion_group!(benches, bench_torch_place_remove, bench_column_sunlight);
criterion_main!(benches);
