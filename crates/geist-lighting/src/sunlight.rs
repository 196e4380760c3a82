//! Initial sky light for a freshly loaded column of chunks.
//!
//! The work is split in three so the expensive part can run off the tick thread:
//! [`snapshot_cluster`] grabs read-only voxel buffers for the column and its 8 neighbors,
//! [`compute_column_sunlight`] is a pure function over that snapshot, and
//! [`apply_column_sunlight`] merges the result back into live chunks.

use std::collections::VecDeque;
use std::sync::Arc;

use geist_blocks::BlockRegistry;
use geist_chunk::{ChunkFlags, ChunkStore, LIGHT_HORIZON, LIGHT_MAX, LightChannel, Voxel};
use geist_world::{CHUNK_SIZE, CHUNK_VOLUME, ChunkCoord, ColumnCoord, Face, LocalCoord};

use crate::engine::LightEngine;

const SIDE: usize = CHUNK_SIZE as usize;

/// Read-only voxel buffers for a 3×3 ring of columns, one chunk taller than the world at
/// both ends.
///
/// Slots are addressed by `(dx, cy, dz)` with `dx, dz ∈ -1..=1` and `cy ∈ -1..=height`.
/// Every slot strictly inside the world is present; the two vertical extremes may be
/// absent, meaning open sky above and nothing below.
#[derive(Clone, Debug)]
pub struct ColumnCluster {
    pub column: ColumnCoord,
    pub height: i32,
    slots: Vec<Option<Arc<Vec<Voxel>>>>,
}

impl ColumnCluster {
    fn slot_index(height: i32, dx: i32, cy: i32, dz: i32) -> Option<usize> {
        if !(-1..=1).contains(&dx) || !(-1..=1).contains(&dz) || cy < -1 || cy > height {
            return None;
        }
        Some((((cy + 1) * 3 + (dz + 1)) * 3 + (dx + 1)) as usize)
    }

    pub fn slot(&self, dx: i32, cy: i32, dz: i32) -> Option<&[Voxel]> {
        let i = Self::slot_index(self.height, dx, cy, dz)?;
        self.slots[i].as_deref().map(Vec::as_slice)
    }

    /// Number of snapshotted chunks.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn center_voxel(&self, x: usize, y: usize, z: usize) -> Voxel {
        let cy = (y / SIDE) as i32;
        self.slot(0, cy, 0)
            .map(|v| v[LocalCoord::new(x, y % SIDE, z).index()])
            .unwrap_or_default()
    }
}

/// Snapshots the cluster around `column`, or returns the first chunk that blocks it.
pub fn snapshot_cluster<S: ChunkStore + ?Sized>(
    store: &S,
    column: ColumnCoord,
) -> Result<ColumnCluster, ChunkCoord> {
    let height = store.column_height();
    let mut slots = Vec::with_capacity(((height + 2) * 9) as usize);
    for cy in -1..=height {
        for dz in -1..=1 {
            for dx in -1..=1 {
                let coord = column.offset(dx, dz).chunk(cy);
                let snap = store.lightable(coord).map(|c| c.voxels_shared());
                if snap.is_none() && cy >= 0 && cy < height {
                    return Err(coord);
                }
                slots.push(snap);
            }
        }
    }
    Ok(ColumnCluster {
        column,
        height,
        slots,
    })
}

/// Computed sky light for every voxel of a column, plus the snapshot it was computed from.
#[derive(Debug)]
pub struct ColumnSunlight {
    pub column: ColumnCoord,
    pub height: i32,
    levels: Vec<u8>,
    pub cluster: ColumnCluster,
}

impl ColumnSunlight {
    /// Levels for chunk `cy` of the column, in chunk index order.
    pub fn chunk_levels(&self, cy: i32) -> &[u8] {
        if cy < 0 || cy >= self.height {
            return &[];
        }
        let start = cy as usize * CHUNK_VOLUME;
        &self.levels[start..start + CHUNK_VOLUME]
    }

    /// Level at column-relative `(x, y, z)`, with `y` counted from the bottom of the world.
    pub fn level(&self, x: usize, y: usize, z: usize) -> u8 {
        self.levels
            .get(column_index(x, y, z))
            .copied()
            .unwrap_or(0)
    }
}

#[inline]
fn column_index(x: usize, y: usize, z: usize) -> usize {
    (y * SIDE + z) * SIDE + x
}

#[inline]
fn clamp_horizon(level: u8) -> u8 {
    if level > LIGHT_HORIZON { level } else { 0 }
}

/// Sky light for the center column of `cluster`.
///
/// Each voxel column is swept from the top, starting at full sky or at whatever the chunk
/// above holds. Light stored in the side neighbors and in the chunk below is then seeded
/// across the column's faces, and the result is flood-filled within the column.
pub fn compute_column_sunlight(cluster: ColumnCluster, registry: &BlockRegistry) -> ColumnSunlight {
    let height = cluster.height.max(0);
    let ys = height as usize * SIDE;
    let mut levels = vec![0u8; ys * SIDE * SIDE];
    let sun = LightChannel::Sun;
    let def = move |v: Voxel| registry.definition(v.block);

    let above = cluster.slot(0, height, 0);
    for z in 0..SIDE {
        for x in 0..SIDE {
            let mut level = above
                .map(|v| v[LocalCoord::new(x, 0, z).index()].light.get(sun))
                .unwrap_or(LIGHT_MAX);
            for y in (0..ys).rev() {
                let d = def(cluster.center_voxel(x, y, z));
                level = if d.transparent {
                    sun.attenuate(level, Face::NegY, d.absorption)
                } else {
                    0
                };
                levels[column_index(x, y, z)] = clamp_horizon(level);
            }
        }
    }

    let mut queue: VecDeque<(usize, usize, usize)> = VecDeque::new();
    for y in 0..ys {
        for z in 0..SIDE {
            for x in 0..SIDE {
                if levels[column_index(x, y, z)] > LIGHT_HORIZON {
                    queue.push_back((x, y, z));
                }
            }
        }
    }

    // Side and bottom seeds from neighbor slots
    let mut seed = |x: usize, y: usize, z: usize, from: u8, face: Face| {
        let d = def(cluster.center_voxel(x, y, z));
        if !d.transparent {
            return;
        }
        let new = sun.attenuate(from, face, d.absorption);
        let i = column_index(x, y, z);
        if new > LIGHT_HORIZON && new > levels[i] {
            levels[i] = new;
            queue.push_back((x, y, z));
        }
    };
    for cy in 0..height {
        let side = |dx: i32, dz: i32| cluster.slot(dx, cy, dz);
        for ly in 0..SIDE {
            let y = cy as usize * SIDE + ly;
            for t in 0..SIDE {
                if let Some(v) = side(-1, 0) {
                    seed(0, y, t, v[LocalCoord::new(SIDE - 1, ly, t).index()].light.get(sun), Face::PosX);
                }
                if let Some(v) = side(1, 0) {
                    seed(SIDE - 1, y, t, v[LocalCoord::new(0, ly, t).index()].light.get(sun), Face::NegX);
                }
                if let Some(v) = side(0, -1) {
                    seed(t, y, 0, v[LocalCoord::new(t, ly, SIDE - 1).index()].light.get(sun), Face::PosZ);
                }
                if let Some(v) = side(0, 1) {
                    seed(t, y, SIDE - 1, v[LocalCoord::new(t, ly, 0).index()].light.get(sun), Face::NegZ);
                }
            }
        }
    }
    if let Some(below) = cluster.slot(0, -1, 0) {
        if ys > 0 {
            for z in 0..SIDE {
                for x in 0..SIDE {
                    let from = below[LocalCoord::new(x, SIDE - 1, z).index()].light.get(sun);
                    seed(x, 0, z, from, Face::PosY);
                }
            }
        }
    }

    while let Some((x, y, z)) = queue.pop_front() {
        let level = levels[column_index(x, y, z)];
        if level <= LIGHT_HORIZON {
            continue;
        }
        for face in Face::ALL {
            let (dx, dy, dz) = face.delta();
            let (nx, ny, nz) = (x as i32 + dx, y as i32 + dy, z as i32 + dz);
            if nx < 0 || ny < 0 || nz < 0 || nx >= SIDE as i32 || ny >= ys as i32 || nz >= SIDE as i32 {
                continue;
            }
            let (nx, ny, nz) = (nx as usize, ny as usize, nz as usize);
            let d = def(cluster.center_voxel(nx, ny, nz));
            if !d.transparent {
                continue;
            }
            let new = sun.attenuate(level, face, d.absorption);
            let i = column_index(nx, ny, nz);
            if new > LIGHT_HORIZON && new > levels[i] {
                levels[i] = new;
                queue.push_back((nx, ny, nz));
            }
        }
    }

    ColumnSunlight {
        column: cluster.column,
        height,
        levels,
        cluster,
    }
}

/// Sky light on the face of `voxels` that touches the column, in chunk index order.
fn face_levels(voxels: &[Voxel], face: Face) -> impl Iterator<Item = u8> + '_ {
    voxels
        .iter()
        .enumerate()
        .filter(move |(i, _)| LocalCoord::from_index(*i).on_face(face))
        .map(|(_, v)| v.light.get(LightChannel::Sun))
}

/// True if sky light the job seeded from has since dropped anywhere around the column.
///
/// Light that only grew is harmless: the engine already spread it into the live column.
/// Light that dropped was retracted from the live column but is still baked into the
/// result, and nothing would retract it again once applied.
fn boundary_dimmed<S: ChunkStore + ?Sized>(store: &S, result: &ColumnSunlight) -> bool {
    let column = result.column;
    let height = result.height;
    let sides = [
        (-1, 0, Face::PosX),
        (1, 0, Face::NegX),
        (0, -1, Face::PosZ),
        (0, 1, Face::NegZ),
    ];
    let mut touching: Vec<(i32, i32, i32, Face)> = (0..height)
        .flat_map(|cy| sides.iter().map(move |&(dx, dz, face)| (dx, cy, dz, face)))
        .collect();
    touching.push((0, -1, 0, Face::PosY));
    touching.push((0, height, 0, Face::NegY));

    touching.into_iter().any(|(dx, cy, dz, face)| {
        let live = store.lightable(column.offset(dx, dz).chunk(cy));
        match (result.cluster.slot(dx, cy, dz), live) {
            (Some(then), Some(now)) => face_levels(then, face)
                .zip(face_levels(now.voxels(), face))
                .any(|(was, is)| is < was),
            (Some(_), None) => true,
            // Swept from open sky; a chunk has since appeared overhead.
            (None, Some(now)) if cy == height => {
                face_levels(now.voxels(), face).any(|l| l < LIGHT_MAX)
            }
            (None, _) => false,
        }
    })
}

/// Result of merging a finished column job into the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Sky light written into this many chunks, counted from the bottom.
    Applied { chunks: usize },
    /// Blocks in the column changed while the job ran; the result was discarded.
    Stale,
}

/// Writes `result` into the column and tags each chunk `SUNLIGHT | INCOMPLETE_LIGHTING`.
///
/// The result is `Stale` if the column's blocks changed since the snapshot or if sky light
/// around it has dropped.
///
/// Stops at the first chunk that is no longer lightable. Voxels only ever brighten. Lit
/// voxels on the column's outer faces are re-seeded into `engine` so the new light spills
/// into columns that were lit earlier.
pub fn apply_column_sunlight<S: ChunkStore + ?Sized>(
    store: &mut S,
    engine: &mut LightEngine,
    result: ColumnSunlight,
) -> ApplyOutcome {
    let column = result.column;
    for cy in 0..result.height {
        let (Some(chunk), Some(snap)) = (store.lightable(column.chunk(cy)), result.cluster.slot(0, cy, 0))
        else {
            break;
        };
        let edited = chunk
            .voxels()
            .iter()
            .zip(snap.iter())
            .any(|(now, then)| now.block != then.block);
        if edited {
            return ApplyOutcome::Stale;
        }
    }
    if boundary_dimmed(store, &result) {
        return ApplyOutcome::Stale;
    }

    let mut applied = 0;
    for cy in 0..result.height {
        let coord = column.chunk(cy);
        let levels = result.chunk_levels(cy);
        let Some(chunk) = store.lightable_mut(coord) else {
            break;
        };
        for (voxel, &level) in chunk.voxels_mut().iter_mut().zip(levels) {
            if level > voxel.light.get(LightChannel::Sun) {
                voxel.light.set(LightChannel::Sun, level);
            }
        }
        chunk
            .flags
            .insert(ChunkFlags::SUNLIGHT | ChunkFlags::INCOMPLETE_LIGHTING);
        applied += 1;

        for i in 0..CHUNK_VOLUME {
            let local = LocalCoord::from_index(i);
            let outer = local.x == 0
                || local.x == SIDE - 1
                || local.z == 0
                || local.z == SIDE - 1
                || (cy == 0 && local.y == 0)
                || (cy == result.height - 1 && local.y == SIDE - 1);
            if outer && levels[i] > LIGHT_HORIZON {
                engine.reseed_light(store, local.to_world(coord), LightChannel::Sun);
            }
        }
    }
    // `result` and its cluster snapshot are released here.
    ApplyOutcome::Applied { chunks: applied }
}
