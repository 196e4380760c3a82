use std::sync::Arc;

use geist_blocks::{BlockDefinition, BlockId};
use geist_world::{CHUNK_VOLUME, ChunkCoord, LocalCoord, TerrainGen};

use crate::light::{LightChannel, LightVector};

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Voxel {
    pub block: BlockId,
    pub light: LightVector,
}

impl Voxel {
    #[inline]
    pub const fn new(block: BlockId) -> Self {
        Self {
            block,
            light: LightVector::DARK,
        }
    }
}

bitflags::bitflags! {
    /// Lifecycle and invalidation state of a chunk.
    #[derive(Clone, Copy, Debug, Default, Hash, Eq, PartialEq)]
    pub struct ChunkFlags: u8 {
        /// Needs a mesh rebuild.
        const DIRTY = 1 << 0;
        /// The rebuild should happen this frame rather than in bulk.
        const IMMEDIATE = 1 << 1;
        /// Terrain generation has not finished; contents are meaningless.
        const RAW = 1 << 2;
        /// The column sunlight pass has been applied.
        const SUNLIGHT = 1 << 3;
        /// Sunlight applied but some neighbor is not yet ready.
        const INCOMPLETE_LIGHTING = 1 << 4;
    }
}

/// A 16³ block of voxels.
///
/// The voxel buffer is shared copy-on-write so a background job can hold a read-only
/// snapshot while the owner keeps editing. A chunk with no voxels is a placeholder for a
/// position the streamer knows about but has not allocated.
#[derive(Clone, Debug)]
pub struct Chunk {
    pub coord: ChunkCoord,
    pub flags: ChunkFlags,
    voxels: Arc<Vec<Voxel>>,
}

impl Chunk {
    /// Generated chunk with the given blocks in chunk index order; short input is padded
    /// with air.
    pub fn from_blocks(coord: ChunkCoord, blocks: Vec<BlockId>) -> Self {
        let mut voxels: Vec<Voxel> = blocks.into_iter().map(Voxel::new).collect();
        if voxels.len() != CHUNK_VOLUME {
            voxels.resize(CHUNK_VOLUME, Voxel::new(BlockDefinition::AIR));
        }
        Self {
            coord,
            flags: ChunkFlags::empty(),
            voxels: Arc::new(voxels),
        }
    }

    pub fn filled(coord: ChunkCoord, block: BlockId) -> Self {
        Self::from_blocks(coord, vec![block; CHUNK_VOLUME])
    }

    /// Allocated but still waiting on terrain generation.
    pub fn raw(coord: ChunkCoord) -> Self {
        let mut c = Self::filled(coord, BlockDefinition::AIR);
        c.flags.insert(ChunkFlags::RAW);
        c
    }

    pub fn placeholder(coord: ChunkCoord) -> Self {
        Self {
            coord,
            flags: ChunkFlags::empty(),
            voxels: Arc::new(Vec::new()),
        }
    }

    /// Replaces the contents with generated blocks and clears `RAW`.
    pub fn finish_generation(&mut self, blocks: Vec<BlockId>) {
        let generated = Self::from_blocks(self.coord, blocks);
        self.voxels = generated.voxels;
        self.flags.remove(ChunkFlags::RAW);
    }

    #[inline]
    pub fn has_voxels(&self) -> bool {
        !self.voxels.is_empty()
    }

    #[inline]
    pub fn is_raw(&self) -> bool {
        self.flags.contains(ChunkFlags::RAW)
    }

    /// Light may be read and written here.
    #[inline]
    pub fn is_lightable(&self) -> bool {
        self.has_voxels() && !self.is_raw()
    }

    #[inline]
    pub fn voxels(&self) -> &[Voxel] {
        &self.voxels
    }

    /// Cheap handle to the current voxel buffer; later edits to this chunk do not affect it.
    #[inline]
    pub fn voxels_shared(&self) -> Arc<Vec<Voxel>> {
        Arc::clone(&self.voxels)
    }

    #[inline]
    pub fn voxel(&self, at: LocalCoord) -> Option<Voxel> {
        self.voxels.get(at.index()).copied()
    }

    #[inline]
    pub fn block(&self, at: LocalCoord) -> Option<BlockId> {
        self.voxel(at).map(|v| v.block)
    }

    /// Stored level, or 0 for a placeholder.
    #[inline]
    pub fn light(&self, at: LocalCoord, channel: LightChannel) -> u8 {
        self.voxel(at).map_or(0, |v| v.light.get(channel))
    }

    pub fn set_light(&mut self, at: LocalCoord, channel: LightChannel, level: u8) {
        if let Some(v) = Arc::make_mut(&mut self.voxels).get_mut(at.index()) {
            v.light.set(channel, level);
        }
    }

    pub fn set_block(&mut self, at: LocalCoord, block: BlockId) {
        if let Some(v) = Arc::make_mut(&mut self.voxels).get_mut(at.index()) {
            v.block = block;
        }
    }

    /// Mutable access to every voxel, cloning the buffer if a snapshot still holds it.
    pub fn voxels_mut(&mut self) -> &mut [Voxel] {
        Arc::make_mut(&mut self.voxels).as_mut_slice()
    }
}

/// Runs terrain generation for `coord` and returns a finished, unlit chunk.
pub fn generate_chunk(terrain: &TerrainGen, coord: ChunkCoord) -> Chunk {
    Chunk::from_blocks(coord, terrain.generate(coord))
}
