use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use clap::Parser;
use geist_blocks::BlockRegistry;
use geist_chunk::{ChunkFlags, ChunkMap, LightChannel, generate_chunk};
use geist_runtime::{ColumnPoll, LightingRuntime};
use geist_world::{ChunkCoord, ColumnCoord, TerrainGen, VoxelCoord};

mod config;

use config::AppConfig;

/// Builds a terrain world, lights it, places torches, and reports what the lighting did.
#[derive(Debug, Parser)]
#[command(name = "geist-light")]
struct Args {
    /// Block definitions.
    #[arg(long, default_value = "assets/blocks.toml")]
    blocks: PathBuf,
    /// Runtime and terrain settings.
    #[arg(long, default_value = "assets/lighting.toml")]
    config: PathBuf,
    /// Columns generated on each side of the origin.
    #[arg(long, default_value_t = 2)]
    radius: i32,
    /// Give up on a phase after this many ticks.
    #[arg(long, default_value_t = 20_000)]
    max_ticks: u32,
    /// Torch position as `x,y,z`; repeatable.
    #[arg(long, value_parser = parse_voxel)]
    torch: Vec<VoxelCoord>,
}

fn parse_voxel(s: &str) -> Result<VoxelCoord, String> {
    let parts = s
        .split(',')
        .map(|p| p.trim().parse::<i32>().map_err(|e| format!("`{p}`: {e}")))
        .collect::<Result<Vec<_>, _>>()?;
    match parts[..] {
        [x, y, z] => Ok(VoxelCoord::new(x, y, z)),
        _ => Err(format!("expected x,y,z, got `{s}`")),
    }
}

#[derive(Debug, Default)]
struct PhaseReport {
    ticks: u32,
    remeshes: usize,
    settled: bool,
}

/// Ticks until the runtime is idle and every lit chunk is finalized, consuming dirty markers
/// the way a mesher would.
fn run_until_idle(rt: &mut LightingRuntime, world: &mut ChunkMap, max_ticks: u32) -> PhaseReport {
    let mut report = PhaseReport::default();
    while report.ticks < max_ticks {
        let tick = rt.tick(world);
        report.ticks += 1;
        report.remeshes += world.take_dirty().len();
        if rt.is_idle() && incomplete_chunks(world) == 0 {
            report.settled = true;
            break;
        }
        if let ColumnPoll::Running(_) = tick.column {
            thread::sleep(Duration::from_millis(1));
        }
    }
    let pending = incomplete_chunks(world);
    if pending > 0 {
        log::info!(target: "events", "{} chunks still waiting on neighbor sky light", pending);
    }
    report
}

fn incomplete_chunks(world: &ChunkMap) -> usize {
    world
        .iter()
        .filter(|c| c.flags.contains(ChunkFlags::INCOMPLETE_LIGHTING))
        .count()
}

fn lit_voxels(world: &ChunkMap, channel: LightChannel) -> usize {
    world
        .iter()
        .map(|c| c.voxels().iter().filter(|v| v.light.get(channel) > 0).count())
        .sum()
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let registry = if args.blocks.exists() {
        BlockRegistry::load_from_path(&args.blocks)?
    } else {
        log::warn!(target: "events", "{} not found; using built-in blocks", args.blocks.display());
        BlockRegistry::builtin()
    };
    let cfg = if args.config.exists() {
        AppConfig::load_from_path(&args.config)?
    } else {
        log::warn!(target: "events", "{} not found; using defaults", args.config.display());
        AppConfig::default()
    };
    let torch = registry
        .id_by_name("torch")
        .ok_or("block set has no `torch`")?;

    let registry = Arc::new(registry);
    let height = cfg.lighting.column_height;
    let terrain = TerrainGen::new(cfg.terrain.clone(), &registry);
    let mut world = ChunkMap::new(height);
    let r = args.radius.max(0);
    let t0 = Instant::now();
    for cz in -r..=r {
        for cx in -r..=r {
            for cy in 0..height {
                world.insert(generate_chunk(&terrain, ChunkCoord::new(cx, cy, cz)));
            }
        }
    }
    log::info!(
        target: "events",
        "generated {} chunks in {}ms",
        world.len(),
        t0.elapsed().as_millis()
    );

    let mut rt = LightingRuntime::new(Arc::clone(&registry), &cfg.lighting);
    // The outermost ring only provides neighbors for the columns inside it.
    let inner = r - 1;
    for cz in -inner..=inner {
        for cx in -inner..=inner {
            rt.request_column_initialization(ColumnCoord::new(cx, cz));
        }
    }

    let t0 = Instant::now();
    let sky = run_until_idle(&mut rt, &mut world, args.max_ticks);
    let stats = rt.columns().stats();
    log::info!(
        target: "events",
        "sky: {} ticks, {}ms, {} columns applied, {} chunks finalized ({} forced), {} remeshes",
        sky.ticks,
        t0.elapsed().as_millis(),
        stats.applied,
        stats.finalized,
        stats.forced,
        sky.remeshes
    );
    if !sky.settled {
        log::warn!(target: "events", "sky lighting did not settle within {} ticks", args.max_ticks);
    }

    if !args.torch.is_empty() {
        let t0 = Instant::now();
        let mut placed = 0;
        for &at in &args.torch {
            if rt.set_block(&mut world, at, torch) {
                placed += 1;
            } else {
                log::warn!(target: "events", "could not place torch at {:?}", at);
            }
        }
        let torches = run_until_idle(&mut rt, &mut world, args.max_ticks);
        log::info!(
            target: "events",
            "torches: {} placed, {} ticks, {}ms, {} remeshes",
            placed,
            torches.ticks,
            t0.elapsed().as_millis(),
            torches.remeshes
        );
    }

    let totals = rt.engine().stats();
    log::info!(
        target: "events",
        "engine totals: propagated={} retracted={} writes={}",
        totals.propagated,
        totals.retracted,
        totals.writes
    );
    for channel in LightChannel::ALL {
        log::info!(
            target: "events",
            "{}: {} lit voxels",
            channel.name(),
            lit_voxels(&world, channel)
        );
    }
    Ok(())
}
