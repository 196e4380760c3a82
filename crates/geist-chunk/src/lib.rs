//! Voxel storage, packed light values, and the chunk store interface used by lighting.
#![forbid(unsafe_code)]

pub mod chunk;
pub mod light;
pub mod store;

pub use chunk::{Chunk, ChunkFlags, Voxel, generate_chunk};
pub use light::{LIGHT_HORIZON, LIGHT_MAX, LIGHT_MIN, LightChannel, LightVector};
pub use store::{ChunkMap, ChunkStore};
