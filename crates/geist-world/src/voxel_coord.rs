use serde::{Deserialize, Serialize};

use crate::chunk_coord::{CHUNK_SIZE, CHUNK_VOLUME, ChunkCoord};
use crate::face::Face;

/// World-space voxel position.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VoxelCoord {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl VoxelCoord {
    #[inline]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    #[inline]
    pub fn offset(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.z + dz)
    }

    #[inline]
    pub fn step(self, face: Face) -> Self {
        let (dx, dy, dz) = face.delta();
        self.offset(dx, dy, dz)
    }

    #[inline]
    pub fn chunk(self) -> ChunkCoord {
        ChunkCoord::new(
            self.x.div_euclid(CHUNK_SIZE),
            self.y.div_euclid(CHUNK_SIZE),
            self.z.div_euclid(CHUNK_SIZE),
        )
    }

    #[inline]
    pub fn local(self) -> LocalCoord {
        LocalCoord {
            x: self.x.rem_euclid(CHUNK_SIZE) as usize,
            y: self.y.rem_euclid(CHUNK_SIZE) as usize,
            z: self.z.rem_euclid(CHUNK_SIZE) as usize,
        }
    }

    #[inline]
    pub fn manhattan(self, other: VoxelCoord) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y) + self.z.abs_diff(other.z)
    }
}

impl From<(i32, i32, i32)> for VoxelCoord {
    fn from(value: (i32, i32, i32)) -> Self {
        Self::new(value.0, value.1, value.2)
    }
}

/// Position of a voxel inside its chunk; every component is in `0..CHUNK_SIZE`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct LocalCoord {
    pub x: usize,
    pub y: usize,
    pub z: usize,
}

impl LocalCoord {
    #[inline]
    pub fn new(x: usize, y: usize, z: usize) -> Self {
        debug_assert!(
            x < CHUNK_SIZE as usize && y < CHUNK_SIZE as usize && z < CHUNK_SIZE as usize,
            "local coordinate ({x},{y},{z}) outside chunk"
        );
        Self { x, y, z }
    }

    #[inline]
    pub fn index(self) -> usize {
        let s = CHUNK_SIZE as usize;
        (self.y * s + self.z) * s + self.x
    }

    #[inline]
    pub fn from_index(index: usize) -> Self {
        debug_assert!(index < CHUNK_VOLUME);
        let s = CHUNK_SIZE as usize;
        Self {
            x: index % s,
            z: (index / s) % s,
            y: index / (s * s),
        }
    }

    #[inline]
    pub fn to_world(self, chunk: ChunkCoord) -> VoxelCoord {
        chunk
            .origin()
            .offset(self.x as i32, self.y as i32, self.z as i32)
    }

    /// True when the voxel touches the chunk face in direction `face`.
    #[inline]
    pub fn on_face(self, face: Face) -> bool {
        let last = CHUNK_SIZE as usize - 1;
        match face {
            Face::PosY => self.y == last,
            Face::NegY => self.y == 0,
            Face::PosX => self.x == last,
            Face::NegX => self.x == 0,
            Face::PosZ => self.z == last,
            Face::NegZ => self.z == 0,
        }
    }

    #[inline]
    pub fn on_any_face(self) -> bool {
        Face::ALL.iter().any(|&f| self.on_face(f))
    }
}

/// Chunk owning the voxel at `at`.
#[inline]
pub fn to_chunk(at: VoxelCoord) -> ChunkCoord {
    at.chunk()
}

/// Local position of `at` relative to `chunk`. `at` must lie inside `chunk`.
#[inline]
pub fn to_local(chunk: ChunkCoord, at: VoxelCoord) -> LocalCoord {
    debug_assert_eq!(at.chunk(), chunk, "voxel {at:?} is not inside chunk {chunk:?}");
    at.local()
}
