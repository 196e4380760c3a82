use geist_world::ChunkCoord;
use hashbrown::HashMap;

use crate::chunk::{Chunk, ChunkFlags};

/// Chunk residency as seen by lighting.
///
/// Chunks live at `cy` in `0..column_height()`. Anything else the store does (streaming,
/// eviction, meshing) happens behind this interface; lighting only reads chunks, writes
/// voxel light, and raises dirty markers.
pub trait ChunkStore {
    fn chunk(&self, coord: ChunkCoord) -> Option<&Chunk>;

    fn chunk_mut(&mut self, coord: ChunkCoord) -> Option<&mut Chunk>;

    fn column_height(&self) -> i32;

    /// Every resident chunk position, placeholders included.
    fn chunk_coords(&self) -> Vec<ChunkCoord>;

    /// Asks for a mesh rebuild of `coord`; `immediate` requests it this frame.
    fn mark_dirty(&mut self, coord: ChunkCoord, immediate: bool) {
        if let Some(chunk) = self.chunk_mut(coord) {
            chunk.flags.insert(ChunkFlags::DIRTY);
            if immediate {
                chunk.flags.insert(ChunkFlags::IMMEDIATE);
            }
        }
    }

    #[inline]
    fn lightable(&self, coord: ChunkCoord) -> Option<&Chunk> {
        self.chunk(coord).filter(|c| c.is_lightable())
    }

    #[inline]
    fn lightable_mut(&mut self, coord: ChunkCoord) -> Option<&mut Chunk> {
        self.chunk_mut(coord).filter(|c| c.is_lightable())
    }
}

/// In-memory chunk store keyed by chunk coordinate.
#[derive(Clone, Debug)]
pub struct ChunkMap {
    chunks: HashMap<ChunkCoord, Chunk>,
    column_height: i32,
}

impl ChunkMap {
    pub fn new(column_height: i32) -> Self {
        Self {
            chunks: HashMap::new(),
            column_height: column_height.max(1),
        }
    }

    /// Stores `chunk`, returning whatever previously occupied its position.
    pub fn insert(&mut self, chunk: Chunk) -> Option<Chunk> {
        self.chunks.insert(chunk.coord, chunk)
    }

    pub fn remove(&mut self, coord: ChunkCoord) -> Option<Chunk> {
        self.chunks.remove(&coord)
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Chunk> {
        self.chunks.values()
    }

    pub fn dirty_count(&self) -> usize {
        self.chunks
            .values()
            .filter(|c| c.flags.contains(ChunkFlags::DIRTY))
            .count()
    }

    /// Clears every dirty marker, returning each dirty chunk and whether it was immediate.
    pub fn take_dirty(&mut self) -> Vec<(ChunkCoord, bool)> {
        let mut out = Vec::new();
        for (coord, chunk) in self.chunks.iter_mut() {
            if chunk.flags.contains(ChunkFlags::DIRTY) {
                out.push((*coord, chunk.flags.contains(ChunkFlags::IMMEDIATE)));
                chunk.flags.remove(ChunkFlags::DIRTY | ChunkFlags::IMMEDIATE);
            }
        }
        out
    }
}

impl ChunkStore for ChunkMap {
    #[inline]
    fn chunk(&self, coord: ChunkCoord) -> Option<&Chunk> {
        self.chunks.get(&coord)
    }

    #[inline]
    fn chunk_mut(&mut self, coord: ChunkCoord) -> Option<&mut Chunk> {
        self.chunks.get_mut(&coord)
    }

    fn column_height(&self) -> i32 {
        self.column_height
    }

    fn chunk_coords(&self) -> Vec<ChunkCoord> {
        self.chunks.keys().copied().collect()
    }
}
