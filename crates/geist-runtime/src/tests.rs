use std::sync::Arc;
use std::thread;
use std::time::Duration;

use super::*;
use geist_chunk::{Chunk, ChunkFlags, ChunkMap, ChunkStore, LightChannel};
use geist_world::{CHUNK_SIZE, LocalCoord};

const AIR: u16 = 0;
const STONE: u16 = 1;
const TORCH: u16 = 7;

fn registry() -> Arc<BlockRegistry> {
    Arc::new(BlockRegistry::builtin())
}

fn air_world(r: i32, height: i32) -> ChunkMap {
    let mut map = ChunkMap::new(height);
    for cy in 0..height {
        for cz in -r..=r {
            for cx in -r..=r {
                map.insert(Chunk::filled(ChunkCoord::new(cx, cy, cz), AIR));
            }
        }
    }
    map
}

fn light(store: &ChunkMap, at: VoxelCoord, ch: LightChannel) -> u8 {
    store
        .chunk(at.chunk())
        .map_or(0, |c| c.light(at.local(), ch))
}

fn field(store: &ChunkMap, ch: LightChannel) -> Vec<(ChunkCoord, Vec<u8>)> {
    let mut out: Vec<_> = store
        .iter()
        .map(|c| (c.coord, c.voxels().iter().map(|v| v.light.get(ch)).collect()))
        .collect();
    out.sort_by_key(|(c, _)| (c.cx, c.cy, c.cz));
    out
}

fn request_ring(init: &mut ColumnInitializer, r: i32) {
    for cz in -r..=r {
        for cx in -r..=r {
            init.request_column_initialization(ColumnCoord::new(cx, cz));
        }
    }
}

/// Runs every requested column through the pool one job at a time.
fn run_all_columns(
    init: &mut ColumnInitializer,
    world: &mut ChunkMap,
    engine: &mut LightEngine,
    reg: &Arc<BlockRegistry>,
) {
    for _ in 0..64 {
        if init.is_idle() {
            return;
        }
        init.poll_column_job(world, engine, reg);
        init.wait_column_job(world, engine);
    }
    panic!("columns did not settle");
}

#[test]
fn config_defaults_fill_missing_fields() {
    let cfg = RuntimeConfig::from_toml_str("column_height = 4\n").unwrap();
    assert_eq!(cfg.column_height, 4);
    assert_eq!(cfg.sunlight_threads, 1);
    assert_eq!(cfg.max_cluster_attempts_per_tick, 16);
    assert_eq!(cfg.finalize_settle_limit, 600);

    let empty = RuntimeConfig::from_toml_str("").unwrap();
    assert_eq!(empty.column_height, RuntimeConfig::default().column_height);
}

#[test]
fn config_rejects_bad_values() {
    assert!(RuntimeConfig::from_toml_str("column_height = 0\n").is_err());
    assert!(RuntimeConfig::from_toml_str("sunlight_threads = 0\n").is_err());
    assert!(RuntimeConfig::from_toml_str("column_height = \"tall\"\n").is_err());
}

#[test]
fn one_job_at_a_time_in_request_order() {
    let reg = registry();
    let mut world = air_world(2, 2);
    let mut rt = LightingRuntime::new(reg, &RuntimeConfig::default());
    let mut expected = Vec::new();
    for cz in -1..=1 {
        for cx in -1..=1 {
            let col = ColumnCoord::new(cx, cz);
            rt.request_column_initialization(col);
            expected.push(col);
        }
    }
    // Duplicates of pending requests are dropped
    rt.request_column_initialization(ColumnCoord::new(0, 0));
    assert_eq!(rt.columns().pending(), 9);

    let mut order = Vec::new();
    for i in 0..9 {
        let report = rt.tick(&mut world);
        let ColumnPoll::Scheduled(col) = report.column else {
            panic!("tick {i} scheduled nothing: {:?}", report.column);
        };
        assert_eq!(rt.columns().in_flight(), Some(col));
        assert_eq!(rt.columns().pending(), 8 - i);
        assert_eq!(rt.wait_column_job(&mut world), Some(col));
        assert_eq!(rt.columns().in_flight(), None);
        order.push(col);
    }
    assert_eq!(order, expected);
    assert_eq!(rt.tick(&mut world).column, ColumnPoll::Idle);

    let stats = rt.columns().stats();
    assert_eq!(stats.scheduled, 9);
    assert_eq!(stats.applied, 9);
    assert_eq!(stats.stale, 0);
    assert!(rt.is_idle());
}

#[test]
fn tick_loop_lights_open_sky() {
    let reg = registry();
    let mut world = air_world(2, 2);
    let mut rt = LightingRuntime::new(reg, &RuntimeConfig::default());
    for cz in -1..=1 {
        for cx in -1..=1 {
            rt.request_column_initialization(ColumnCoord::new(cx, cz));
        }
    }
    for _ in 0..20_000 {
        rt.tick(&mut world);
        world.take_dirty();
        if rt.is_idle() {
            break;
        }
        thread::sleep(Duration::from_millis(1));
    }
    assert!(rt.is_idle());
    assert_eq!(rt.columns().stats().applied, 9);

    for cy in 0..2 {
        let chunk = world.chunk(ChunkCoord::new(0, cy, 0)).unwrap();
        assert!(chunk.voxels().iter().all(|v| v.light.get(LightChannel::Sun) == 15));
        assert!(chunk.flags.contains(ChunkFlags::SUNLIGHT));
    }
    // Spilled one voxel into the unrequested ring
    assert_eq!(light(&world, VoxelCoord::new(-17, 5, 3), LightChannel::Sun), 14);
    assert_eq!(light(&world, VoxelCoord::new(32, 5, 3), LightChannel::Sun), 14);
}

#[test]
fn finalize_waits_for_neighbors() {
    let reg = registry();
    let cfg = RuntimeConfig {
        finalize_settle_limit: 3,
        ..RuntimeConfig::default()
    };
    let mut world = air_world(2, 2);
    let mut engine = LightEngine::new();
    let mut init = ColumnInitializer::new(&cfg);
    request_ring(&mut init, 1);
    run_all_columns(&mut init, &mut world, &mut engine, &reg);
    engine.drain_all(&mut world, &reg);
    world.take_dirty();

    // Only the center column has lit neighbors all round
    assert_eq!(init.finalize_ready_columns(&mut world), 2);
    let center = world.chunk(ChunkCoord::new(0, 0, 0)).unwrap();
    assert!(!center.flags.contains(ChunkFlags::INCOMPLETE_LIGHTING));
    assert!(center.flags.contains(ChunkFlags::SUNLIGHT | ChunkFlags::DIRTY));
    assert!(!center.flags.contains(ChunkFlags::IMMEDIATE));
    let edge = world.chunk(ChunkCoord::new(1, 0, 0)).unwrap();
    assert!(edge.flags.contains(ChunkFlags::INCOMPLETE_LIGHTING));
    let ring = world.chunk(ChunkCoord::new(2, 0, 0)).unwrap();
    assert!(!ring.flags.contains(ChunkFlags::SUNLIGHT));

    // Each finalized exactly once
    world.take_dirty();
    assert_eq!(init.finalize_ready_columns(&mut world), 0);
    assert_eq!(init.finalize_ready_columns(&mut world), 0);
    assert_eq!(init.stats().forced, 0);
    // Fourth failed check exceeds the limit
    assert_eq!(init.finalize_ready_columns(&mut world), 16);
    let stats = init.stats();
    assert_eq!(stats.forced, 16);
    assert_eq!(stats.finalized, 18);
    assert!(
        world
            .iter()
            .all(|c| !c.flags.contains(ChunkFlags::INCOMPLETE_LIGHTING))
    );
}

#[test]
fn dirty_chunk_is_not_finalized() {
    let reg = registry();
    let mut world = air_world(2, 1);
    let mut engine = LightEngine::new();
    let mut init = ColumnInitializer::new(&RuntimeConfig::default());
    request_ring(&mut init, 1);
    run_all_columns(&mut init, &mut world, &mut engine, &reg);
    engine.drain_all(&mut world, &reg);
    world.take_dirty();

    world.mark_dirty(ChunkCoord::new(0, 0, 0), true);
    assert_eq!(init.finalize_ready_columns(&mut world), 0);
    world.take_dirty();
    assert_eq!(init.finalize_ready_columns(&mut world), 1);
}

#[test]
fn edit_during_job_requeues_column() {
    let reg = registry();
    let mut world = air_world(1, 1);
    let mut engine = LightEngine::new();
    let mut init = ColumnInitializer::new(&RuntimeConfig::default());
    init.request_column_initialization(ColumnCoord::new(0, 0));
    assert_eq!(
        init.poll_column_job(&mut world, &mut engine, &reg),
        ColumnPoll::Scheduled(ColumnCoord::new(0, 0))
    );
    world
        .chunk_mut(ChunkCoord::new(0, 0, 0))
        .unwrap()
        .set_block(LocalCoord::new(4, 15, 4), STONE);

    init.wait_column_job(&mut world, &mut engine);
    assert_eq!(init.stats().stale, 1);
    assert_eq!(init.pending(), 1);
    let chunk = world.chunk(ChunkCoord::new(0, 0, 0)).unwrap();
    assert!(!chunk.flags.contains(ChunkFlags::SUNLIGHT));

    run_all_columns(&mut init, &mut world, &mut engine, &reg);
    assert_eq!(init.stats().applied, 1);
    assert_eq!(light(&world, VoxelCoord::new(4, 14, 4), LightChannel::Sun), 14);
    assert_eq!(light(&world, VoxelCoord::new(4, 15, 4), LightChannel::Sun), 0);
}

#[test]
fn scheduling_examines_a_bounded_number_of_requests() {
    let reg = registry();
    let mut world = air_world(1, 1);
    let mut engine = LightEngine::new();
    let cfg = RuntimeConfig {
        max_cluster_attempts_per_tick: 1,
        ..RuntimeConfig::default()
    };
    let mut init = ColumnInitializer::new(&cfg);
    // Nothing resident out there
    init.request_column_initialization(ColumnCoord::new(5, 5));
    init.request_column_initialization(ColumnCoord::new(0, 0));
    assert_eq!(init.poll_column_job(&mut world, &mut engine, &reg), ColumnPoll::Idle);
    assert_eq!(init.stats().blocked, 1);
    assert_eq!(init.pending(), 2);

    let mut wide = ColumnInitializer::new(&RuntimeConfig::default());
    wide.request_column_initialization(ColumnCoord::new(5, 5));
    wide.request_column_initialization(ColumnCoord::new(0, 0));
    assert_eq!(
        wide.poll_column_job(&mut world, &mut engine, &reg),
        ColumnPoll::Scheduled(ColumnCoord::new(0, 0))
    );
    assert_eq!(wide.pending(), 1);
    wide.wait_column_job(&mut world, &mut engine);
    assert!(!wide.is_idle());
}

#[test]
fn placing_and_breaking_a_torch() {
    let mut world = air_world(1, 2);
    let mut rt = LightingRuntime::new(registry(), &RuntimeConfig::default());
    let at = VoxelCoord::new(8, 8, 8);
    assert!(rt.set_block(&mut world, at, TORCH));
    assert!(!rt.set_block(&mut world, at, TORCH));
    rt.tick(&mut world);

    for d in 0..=13 {
        let p = at.offset(d, 0, 0);
        let red = if d <= 12 { 14 - d as u8 } else { 0 };
        let green = if d <= 10 { 12 - d as u8 } else { 0 };
        let blue = if d <= 6 { 8 - d as u8 } else { 0 };
        assert_eq!(light(&world, p, LightChannel::Red), red, "red at {d}");
        assert_eq!(light(&world, p, LightChannel::Green), green, "green at {d}");
        assert_eq!(light(&world, p, LightChannel::Blue), blue, "blue at {d}");
    }
    assert!(world.dirty_count() > 0);

    assert!(rt.set_block(&mut world, at, AIR));
    rt.tick(&mut world);
    for ch in [LightChannel::Red, LightChannel::Green, LightChannel::Blue] {
        assert!(
            field(&world, ch)
                .iter()
                .all(|(_, levels)| levels.iter().all(|&l| l == 0)),
            "{ch:?} left behind"
        );
    }
    assert!(rt.is_idle());
}

#[test]
fn wall_placed_then_broken_restores_the_field() {
    let mut world = air_world(1, 2);
    let mut rt = LightingRuntime::new(registry(), &RuntimeConfig::default());
    let torch = VoxelCoord::new(8, 8, 8);
    rt.set_block(&mut world, torch, TORCH);
    rt.tick(&mut world);
    let before: Vec<_> = LightChannel::ALL.iter().map(|&ch| field(&world, ch)).collect();

    let wall = torch.offset(2, 0, 0);
    assert!(rt.set_block(&mut world, wall, STONE));
    rt.tick(&mut world);
    assert_eq!(light(&world, wall, LightChannel::Red), 0);
    // Around the wall: five steps instead of three
    assert_eq!(light(&world, torch.offset(3, 0, 0), LightChannel::Red), 9);
    assert_eq!(light(&world, torch.offset(1, 0, 0), LightChannel::Red), 13);

    assert!(rt.set_block(&mut world, wall, AIR));
    rt.tick(&mut world);
    let after: Vec<_> = LightChannel::ALL.iter().map(|&ch| field(&world, ch)).collect();
    assert_eq!(after, before);
}

#[test]
fn capping_the_sky_shades_the_column_below() {
    let reg = registry();
    let mut world = air_world(2, 2);
    let mut rt = LightingRuntime::new(reg, &RuntimeConfig::default());
    rt.request_column_initialization(ColumnCoord::new(0, 0));
    rt.tick(&mut world);
    rt.wait_column_job(&mut world);
    rt.tick(&mut world);
    let before = field(&world, LightChannel::Sun);

    let top = 2 * CHUNK_SIZE - 1;
    let cap = VoxelCoord::new(5, top, 5);
    assert!(rt.set_block(&mut world, cap, STONE));
    rt.tick(&mut world);
    assert_eq!(light(&world, cap, LightChannel::Sun), 0);
    for y in [0, 10, 20, top - 1] {
        assert_eq!(light(&world, VoxelCoord::new(5, y, 5), LightChannel::Sun), 14, "y={y}");
    }
    assert_eq!(light(&world, VoxelCoord::new(4, 20, 5), LightChannel::Sun), 15);

    assert!(rt.set_block(&mut world, cap, AIR));
    rt.tick(&mut world);
    assert_eq!(field(&world, LightChannel::Sun), before);
}

#[test]
fn edits_outside_lightable_chunks() {
    let mut world = air_world(0, 1);
    world.insert(Chunk::raw(ChunkCoord::new(1, 0, 0)));
    world.insert(Chunk::placeholder(ChunkCoord::new(-1, 0, 0)));
    let mut rt = LightingRuntime::new(registry(), &RuntimeConfig::default());

    assert!(!rt.set_block(&mut world, VoxelCoord::new(40, 3, 3), TORCH));
    assert!(!rt.set_block(&mut world, VoxelCoord::new(-3, 3, 3), TORCH));
    // Raw chunks take the block but no light
    assert!(rt.set_block(&mut world, VoxelCoord::new(19, 3, 3), TORCH));
    assert!(rt.engine().is_idle());
    rt.tick(&mut world);
    assert_eq!(light(&world, VoxelCoord::new(19, 3, 3), LightChannel::Red), 0);
}

#[test]
fn reseed_after_generation_lets_light_in() {
    let mut world = air_world(0, 1);
    world.insert(Chunk::raw(ChunkCoord::new(1, 0, 0)));
    let mut rt = LightingRuntime::new(registry(), &RuntimeConfig::default());
    rt.set_block(&mut world, VoxelCoord::new(14, 3, 3), TORCH);
    rt.tick(&mut world);
    assert_eq!(light(&world, VoxelCoord::new(16, 3, 3), LightChannel::Red), 0);

    let coord = ChunkCoord::new(1, 0, 0);
    world
        .chunk_mut(coord)
        .unwrap()
        .finish_generation(vec![AIR; geist_world::CHUNK_VOLUME]);
    rt.reseed_chunk(&world, coord);
    rt.tick(&mut world);
    assert_eq!(light(&world, VoxelCoord::new(16, 3, 3), LightChannel::Red), 12);
    assert_eq!(light(&world, VoxelCoord::new(18, 3, 3), LightChannel::Red), 10);
}

#[test]
fn water_on_the_top_layer_shades_like_generated_water() {
    const WATER: u16 = 6;
    let top = 2 * CHUNK_SIZE - 1;
    let pool = VoxelCoord::new(5, top, 5);
    let below = pool.offset(0, -1, 0);

    let mut generated = air_world(2, 2);
    generated
        .chunk_mut(pool.chunk())
        .unwrap()
        .set_block(pool.local(), WATER);
    let mut rt = LightingRuntime::new(registry(), &RuntimeConfig::default());
    rt.request_column_initialization(ColumnCoord::new(0, 0));
    rt.tick(&mut generated);
    rt.wait_column_job(&mut generated);
    rt.tick(&mut generated);

    let mut edited = air_world(2, 2);
    let mut rt = LightingRuntime::new(registry(), &RuntimeConfig::default());
    rt.request_column_initialization(ColumnCoord::new(0, 0));
    rt.tick(&mut edited);
    rt.wait_column_job(&mut edited);
    rt.tick(&mut edited);
    assert!(rt.set_block(&mut edited, pool, WATER));
    rt.tick(&mut edited);

    let sun = |w: &ChunkMap, at| light(w, at, LightChannel::Sun);
    assert_eq!((sun(&generated, pool), sun(&generated, below)), (13, 14));
    assert_eq!((sun(&edited, pool), sun(&edited, below)), (13, 14));
    assert_eq!(field(&edited, LightChannel::Sun), field(&generated, LightChannel::Sun));
}
