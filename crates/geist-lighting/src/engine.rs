use std::ops::AddAssign;

use geist_blocks::BlockRegistry;
use geist_chunk::{ChunkStore, LIGHT_HORIZON, LIGHT_MAX, LightChannel};
use geist_world::{ChunkCoord, Face, LocalCoord, VoxelCoord};

use crate::queue::{ChannelQueues, LightingEntry};

/// Counters for one drain, or accumulated over the engine's lifetime.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DrainStats {
    /// Propagation entries popped.
    pub propagated: usize,
    /// Retraction entries popped.
    pub retracted: usize,
    /// Voxel light writes.
    pub writes: usize,
}

impl DrainStats {
    #[inline]
    pub fn pops(&self) -> usize {
        self.propagated + self.retracted
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pops() == 0 && self.writes == 0
    }
}

impl AddAssign for DrainStats {
    fn add_assign(&mut self, rhs: Self) {
        self.propagated += rhs.propagated;
        self.retracted += rhs.retracted;
        self.writes += rhs.writes;
    }
}

/// Raises dirty+immediate on the chunk owning `at`, and on every chunk sharing the face
/// `at` sits on so the neighbor remeshes its border.
pub fn mark_voxel_dirty<S: ChunkStore + ?Sized>(store: &mut S, at: VoxelCoord) {
    let chunk = at.chunk();
    store.mark_dirty(chunk, true);
    let local = at.local();
    if !local.on_any_face() {
        return;
    }
    for face in Face::ALL {
        if local.on_face(face) {
            let (dx, dy, dz) = face.delta();
            store.mark_dirty(chunk.offset(dx, dy, dz), true);
        }
    }
}

/// Bidirectional flood fill over every light channel.
///
/// Work is queued by [`add_light`](Self::add_light), [`remove_light`](Self::remove_light) and
/// [`reseed_light`](Self::reseed_light) and carried out by [`drain`](Self::drain), which
/// retracts before it propagates. Chunks that are missing, placeholders, or still `RAW` are
/// skipped; light reaches them once they are re-seeded.
#[derive(Debug, Default)]
pub struct LightEngine {
    queues: [ChannelQueues; LightChannel::COUNT],
    totals: DrainStats,
}

impl LightEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raises `at` to `level` and queues it for spreading.
    pub fn add_light<S: ChunkStore + ?Sized>(
        &mut self,
        store: &mut S,
        at: VoxelCoord,
        channel: LightChannel,
        level: u8,
    ) {
        debug_assert!(level <= LIGHT_MAX, "light level {level} out of range");
        let level = level.min(LIGHT_MAX);
        if level <= LIGHT_HORIZON {
            return;
        }
        let Some(chunk) = store.lightable_mut(at.chunk()) else {
            log::trace!(target: "lighting", "add_light {:?} at {:?}: chunk not lightable", channel, at);
            return;
        };
        // Already at least this bright; nothing new to spread.
        if chunk.light(at.local(), channel) >= level {
            return;
        }
        chunk.set_light(at.local(), channel, level);
        mark_voxel_dirty(store, at);
        self.totals.writes += 1;
        self.queues[channel.index()]
            .propagate
            .push_back(LightingEntry::new(at, level));
    }

    /// Queues whatever `at` already holds without touching storage.
    pub fn reseed_light<S: ChunkStore + ?Sized>(
        &mut self,
        store: &S,
        at: VoxelCoord,
        channel: LightChannel,
    ) {
        let Some(chunk) = store.lightable(at.chunk()) else {
            return;
        };
        let level = chunk.light(at.local(), channel);
        if level > LIGHT_HORIZON {
            self.queues[channel.index()]
                .propagate
                .push_back(LightingEntry::new(at, level));
        }
    }

    /// Darkens `at` and queues the retraction of everything it lit.
    pub fn remove_light<S: ChunkStore + ?Sized>(
        &mut self,
        store: &mut S,
        at: VoxelCoord,
        channel: LightChannel,
    ) {
        let Some(chunk) = store.lightable_mut(at.chunk()) else {
            log::trace!(target: "lighting", "remove_light {:?} at {:?}: chunk not lightable", channel, at);
            return;
        };
        let local = at.local();
        let old = chunk.light(local, channel);
        if old <= LIGHT_HORIZON {
            return;
        }
        chunk.set_light(local, channel, 0);
        mark_voxel_dirty(store, at);
        self.totals.writes += 1;
        self.queues[channel.index()]
            .retract
            .push_back(LightingEntry::new(at, old));
    }

    /// Re-queues the lit border voxels of `coord` and the lit voxels facing it in each
    /// adjacent chunk, so light crosses into a chunk that just became lightable.
    pub fn reseed_chunk<S: ChunkStore + ?Sized>(&mut self, store: &S, coord: ChunkCoord) {
        for face in Face::ALL {
            let (dx, dy, dz) = face.delta();
            let neighbor = coord.offset(dx, dy, dz);
            self.reseed_face(store, coord, face);
            self.reseed_face(store, neighbor, face.opposite());
        }
    }

    fn reseed_face<S: ChunkStore + ?Sized>(&mut self, store: &S, coord: ChunkCoord, face: Face) {
        let Some(chunk) = store.lightable(coord) else {
            return;
        };
        for (i, voxel) in chunk.voxels().iter().enumerate() {
            let local = LocalCoord::from_index(i);
            if !local.on_face(face) {
                continue;
            }
            for channel in LightChannel::ALL {
                let level = voxel.light.get(channel);
                if level > LIGHT_HORIZON {
                    self.queues[channel.index()]
                        .propagate
                        .push_back(LightingEntry::new(local.to_world(coord), level));
                }
            }
        }
    }

    /// Spreads queued light until the channel's propagation queue is empty.
    pub fn propagate<S: ChunkStore + ?Sized>(
        &mut self,
        store: &mut S,
        registry: &BlockRegistry,
        channel: LightChannel,
    ) -> DrainStats {
        let mut stats = DrainStats::default();
        let queue = &mut self.queues[channel.index()].propagate;
        while let Some(entry) = queue.pop_front() {
            stats.propagated += 1;
            if entry.level <= LIGHT_HORIZON {
                continue;
            }
            // Retracted after it was queued
            if let Some(chunk) = store.lightable(entry.coord.chunk()) {
                if chunk.light(entry.coord.local(), channel) < entry.level {
                    continue;
                }
            }
            for face in Face::ALL {
                let n = entry.coord.step(face);
                let Some(chunk) = store.lightable_mut(n.chunk()) else {
                    continue;
                };
                let local = n.local();
                let Some(voxel) = chunk.voxel(local) else {
                    continue;
                };
                let def = registry.definition(voxel.block);
                if !def.transparent {
                    continue;
                }
                let new = channel.attenuate(entry.level, face, def.absorption);
                if new <= LIGHT_HORIZON || voxel.light.get(channel) >= new {
                    continue;
                }
                chunk.set_light(local, channel, new);
                mark_voxel_dirty(store, n);
                stats.writes += 1;
                queue.push_back(LightingEntry::new(n, new));
            }
        }
        self.totals += stats;
        stats
    }

    /// Removes light that depended on retracted voxels until the retraction queue is empty.
    ///
    /// A neighbor holding exactly what the retracted voxel would have given it is darkened
    /// and retracted in turn. Any other lit neighbor is lit by something else and is queued
    /// to flood back in; in a uniform medium those are exactly the neighbors at least as
    /// bright as the retracted voxel, but behind an absorbing block a dimmer neighbor can
    /// still be the best remaining path.
    pub fn retract<S: ChunkStore + ?Sized>(
        &mut self,
        store: &mut S,
        registry: &BlockRegistry,
        channel: LightChannel,
    ) -> DrainStats {
        let mut stats = DrainStats::default();
        let ChannelQueues { propagate, retract } = &mut self.queues[channel.index()];
        while let Some(entry) = retract.pop_front() {
            stats.retracted += 1;
            for face in Face::ALL {
                let n = entry.coord.step(face);
                let Some(chunk) = store.lightable_mut(n.chunk()) else {
                    continue;
                };
                let local = n.local();
                let Some(voxel) = chunk.voxel(local) else {
                    continue;
                };
                let level = voxel.light.get(channel);
                if level == 0 {
                    continue;
                }
                let def = registry.definition(voxel.block);
                let emission = channel.emission(def);
                if level == channel.attenuate(entry.level, face, def.absorption)
                    && level > emission
                {
                    // Emitters fall back to their own level instead of going dark.
                    let floor = if emission > LIGHT_HORIZON { emission } else { 0 };
                    chunk.set_light(local, channel, floor);
                    mark_voxel_dirty(store, n);
                    stats.writes += 1;
                    retract.push_back(LightingEntry::new(n, level));
                    if floor > 0 {
                        propagate.push_back(LightingEntry::new(n, floor));
                    }
                } else {
                    // Lit independently of the retracted voxel; flood back from it.
                    propagate.push_back(LightingEntry::new(n, level));
                }
            }
        }
        self.totals += stats;
        stats
    }

    /// Retracts then propagates `channel` to quiescence.
    pub fn drain<S: ChunkStore + ?Sized>(
        &mut self,
        store: &mut S,
        registry: &BlockRegistry,
        channel: LightChannel,
    ) -> DrainStats {
        let mut stats = DrainStats::default();
        while !self.queues[channel.index()].is_empty() {
            stats += self.retract(store, registry, channel);
            stats += self.propagate(store, registry, channel);
        }
        stats
    }

    /// Drains every channel in turn.
    pub fn drain_all<S: ChunkStore + ?Sized>(
        &mut self,
        store: &mut S,
        registry: &BlockRegistry,
    ) -> DrainStats {
        let mut stats = DrainStats::default();
        for channel in LightChannel::ALL {
            let s = self.drain(store, registry, channel);
            if !s.is_empty() {
                log::debug!(
                    target: "lighting",
                    "drained {} (propagated={} retracted={} writes={})",
                    channel.name(),
                    s.propagated,
                    s.retracted,
                    s.writes
                );
            }
            stats += s;
        }
        stats
    }

    #[inline]
    pub fn pending(&self, channel: LightChannel) -> usize {
        self.queues[channel.index()].len()
    }

    #[inline]
    pub fn is_idle(&self) -> bool {
        self.queues.iter().all(ChannelQueues::is_empty)
    }

    /// Totals since the engine was created.
    #[inline]
    pub fn stats(&self) -> DrainStats {
        self.totals
    }

    pub fn queues(&self, channel: LightChannel) -> &ChannelQueues {
        &self.queues[channel.index()]
    }

    pub fn clear(&mut self) {
        for q in self.queues.iter_mut() {
            q.clear();
        }
    }
}
