//! Per-tick lighting driver: column sunlight jobs, boundary finalization, and edit glue.
#![forbid(unsafe_code)]

pub mod config;
mod edit;
mod initializer;

use std::sync::Arc;

use geist_blocks::{BlockId, BlockRegistry};
use geist_chunk::ChunkStore;
use geist_lighting::{DrainStats, LightEngine};
use geist_world::{ChunkCoord, ColumnCoord, VoxelCoord};

pub use config::RuntimeConfig;
pub use edit::set_block;
pub use initializer::{ColumnInitializer, ColumnPoll, InitializerStats};

/// Everything one [`LightingRuntime::tick`] did.
#[derive(Clone, Copy, Debug)]
pub struct TickReport {
    pub column: ColumnPoll,
    pub finalized: usize,
    pub drained: DrainStats,
}

/// Owns the light engine and the column initializer and drives both from the tick thread.
pub struct LightingRuntime {
    registry: Arc<BlockRegistry>,
    engine: LightEngine,
    columns: ColumnInitializer,
}

impl LightingRuntime {
    pub fn new(registry: Arc<BlockRegistry>, cfg: &RuntimeConfig) -> Self {
        Self {
            registry,
            engine: LightEngine::new(),
            columns: ColumnInitializer::new(cfg),
        }
    }

    pub fn registry(&self) -> &BlockRegistry {
        &self.registry
    }

    pub fn engine(&self) -> &LightEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut LightEngine {
        &mut self.engine
    }

    pub fn columns(&self) -> &ColumnInitializer {
        &self.columns
    }

    pub fn request_column_initialization(&mut self, column: ColumnCoord) {
        self.columns.request_column_initialization(column);
    }

    /// Column job first, then finalization, then every light queue to quiescence.
    pub fn tick<S: ChunkStore + ?Sized>(&mut self, store: &mut S) -> TickReport {
        let column = self
            .columns
            .poll_column_job(store, &mut self.engine, &self.registry);
        let finalized = self.columns.finalize_ready_columns(store);
        let drained = self.engine.drain_all(store, &self.registry);
        TickReport {
            column,
            finalized,
            drained,
        }
    }

    /// Blocks on the in-flight column job and applies it.
    pub fn wait_column_job<S: ChunkStore + ?Sized>(&mut self, store: &mut S) -> Option<ColumnCoord> {
        self.columns.wait_column_job(store, &mut self.engine)
    }

    /// See [`set_block`]. Light changes are queued, not drained.
    pub fn set_block<S: ChunkStore + ?Sized>(
        &mut self,
        store: &mut S,
        at: VoxelCoord,
        block: BlockId,
    ) -> bool {
        set_block(store, &mut self.engine, &self.registry, at, block)
    }

    /// Call when `coord` becomes lightable so light already around it flows in.
    pub fn reseed_chunk<S: ChunkStore + ?Sized>(&mut self, store: &S, coord: ChunkCoord) {
        self.engine.reseed_chunk(store, coord);
    }

    /// No queued light, no pending or running column job.
    pub fn is_idle(&self) -> bool {
        self.engine.is_idle() && self.columns.is_idle()
    }
}

#[cfg(test)]
mod tests;
