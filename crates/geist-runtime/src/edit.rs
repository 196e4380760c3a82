use geist_blocks::{BlockId, BlockRegistry};
use geist_chunk::{ChunkStore, LIGHT_MAX, LightChannel};
use geist_lighting::{LightEngine, mark_voxel_dirty};
use geist_world::{CHUNK_SIZE, Face, VoxelCoord};

/// Replaces the block at `at` and queues the light changes it causes.
///
/// The voxel's old light is retracted on every channel, its neighbors are re-seeded so
/// light can flow back in when the new block lets it through, and the new block's own
/// emission is added. A top-layer voxel that lets light through takes sky light at full
/// strength less its absorption.
///
/// Returns false if the chunk has no voxels or the block is unchanged. Edits to a `RAW`
/// chunk only change the block.
pub fn set_block<S: ChunkStore + ?Sized>(
    store: &mut S,
    engine: &mut LightEngine,
    registry: &BlockRegistry,
    at: VoxelCoord,
    block: BlockId,
) -> bool {
    let top = store.column_height() * CHUNK_SIZE - 1;
    let Some(chunk) = store.chunk_mut(at.chunk()) else {
        return false;
    };
    if !chunk.has_voxels() || chunk.block(at.local()) == Some(block) {
        return false;
    }
    chunk.set_block(at.local(), block);
    let lightable = chunk.is_lightable();
    mark_voxel_dirty(store, at);
    if !lightable {
        return true;
    }

    let def = registry.definition(block);
    for channel in LightChannel::ALL {
        engine.remove_light(store, at, channel);
    }
    if def.transparent {
        for face in Face::ALL {
            let n = at.step(face);
            for channel in LightChannel::ALL {
                engine.reseed_light(store, n, channel);
            }
        }
        if at.y == top {
            // Same charge the column sweep makes for the top voxel
            let sky = LightChannel::Sun.attenuate(LIGHT_MAX, Face::NegY, def.absorption);
            engine.add_light(store, at, LightChannel::Sun, sky);
        }
    }
    for channel in LightChannel::ALL {
        engine.add_light(store, at, channel, channel.emission(def));
    }
    true
}
