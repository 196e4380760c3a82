use fastnoise_lite::{FastNoiseLite, NoiseType};
use geist_blocks::{BlockDefinition, BlockId, BlockRegistry};
use serde::Deserialize;

use crate::chunk_coord::{CHUNK_SIZE, CHUNK_VOLUME, ChunkCoord};
use crate::voxel_coord::LocalCoord;

#[derive(Clone, Debug, Deserialize)]
pub struct TerrainConfig {
    #[serde(default = "default_seed")]
    pub seed: i32,
    #[serde(default = "default_frequency")]
    pub frequency: f32,
    // Surface height range in voxels, measured from y = 0.
    #[serde(default = "default_min_height")]
    pub min_height: i32,
    #[serde(default = "default_max_height")]
    pub max_height: i32,
    // Voxels at or below this height that are above the surface are filled with water.
    #[serde(default)]
    pub water_level: Option<i32>,
}

fn default_seed() -> i32 {
    1337
}
fn default_frequency() -> f32 {
    0.02
}
fn default_min_height() -> i32 {
    12
}
fn default_max_height() -> i32 {
    40
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            frequency: default_frequency(),
            min_height: default_min_height(),
            max_height: default_max_height(),
            water_level: None,
        }
    }
}

/// Heightmap terrain used by the demo driver and tests; not part of the lighting core.
pub struct TerrainGen {
    noise: FastNoiseLite,
    cfg: TerrainConfig,
    air: BlockId,
    stone: BlockId,
    dirt: BlockId,
    grass: BlockId,
    water: BlockId,
}

impl TerrainGen {
    pub fn new(cfg: TerrainConfig, reg: &BlockRegistry) -> Self {
        let mut noise = FastNoiseLite::with_seed(cfg.seed);
        noise.set_noise_type(Some(NoiseType::OpenSimplex2));
        noise.set_frequency(Some(cfg.frequency));
        let id = |name: &str, fallback: BlockId| reg.id_by_name(name).unwrap_or(fallback);
        let stone = id("stone", 1);
        Self {
            noise,
            air: id("air", BlockDefinition::AIR),
            stone,
            dirt: id("dirt", stone),
            grass: id("grass", stone),
            water: id("water", BlockDefinition::AIR),
            cfg,
        }
    }

    pub fn surface_height(&self, wx: i32, wz: i32) -> i32 {
        let h = self.noise.get_noise_2d(wx as f32, wz as f32);
        let span = (self.cfg.max_height - self.cfg.min_height).max(0) as f32;
        // map [-1,1] -> [min_height, max_height]
        ((h + 1.0) * 0.5 * span) as i32 + self.cfg.min_height
    }

    /// Block ids for every voxel of `coord`, in chunk index order.
    pub fn generate(&self, coord: ChunkCoord) -> Vec<BlockId> {
        let mut blocks = vec![self.air; CHUNK_VOLUME];
        let base = coord.origin();
        let s = CHUNK_SIZE as usize;
        for z in 0..s {
            for x in 0..s {
                let height = self.surface_height(base.x + x as i32, base.z + z as i32);
                for y in 0..s {
                    let wy = base.y + y as i32;
                    let b = if wy < height - 3 {
                        self.stone
                    } else if wy < height - 1 {
                        self.dirt
                    } else if wy == height - 1 {
                        self.grass
                    } else if self.cfg.water_level.is_some_and(|w| wy <= w) {
                        self.water
                    } else {
                        continue;
                    };
                    blocks[LocalCoord::new(x, y, z).index()] = b;
                }
            }
        }
        blocks
    }
}
