//! Incremental voxel light propagation and retraction, plus the column sunlight pass.
#![forbid(unsafe_code)]

mod engine;
mod queue;
pub mod sunlight;

pub use engine::{DrainStats, LightEngine, mark_voxel_dirty};
pub use queue::{ChannelQueues, LightingEntry};
pub use sunlight::{
    ApplyOutcome, ColumnCluster, ColumnSunlight, apply_column_sunlight, compute_column_sunlight,
    snapshot_cluster,
};
