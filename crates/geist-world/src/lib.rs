//! World coordinates, chunk addressing, and demo terrain.
#![forbid(unsafe_code)]

pub mod chunk_coord;
pub mod face;
pub mod terrain;
pub mod voxel_coord;

pub use chunk_coord::{CHUNK_SIZE, CHUNK_VOLUME, ChunkCoord, ColumnCoord};
pub use face::Face;
pub use terrain::{TerrainConfig, TerrainGen};
pub use voxel_coord::{LocalCoord, VoxelCoord};
