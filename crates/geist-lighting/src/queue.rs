use std::collections::VecDeque;

use geist_world::VoxelCoord;

/// A voxel and the level it held when queued.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct LightingEntry {
    pub coord: VoxelCoord,
    pub level: u8,
}

impl LightingEntry {
    #[inline]
    pub fn new(coord: VoxelCoord, level: u8) -> Self {
        Self { coord, level }
    }
}

/// Pending work for one light channel.
#[derive(Clone, Debug, Default)]
pub struct ChannelQueues {
    pub propagate: VecDeque<LightingEntry>,
    pub retract: VecDeque<LightingEntry>,
}

impl ChannelQueues {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.propagate.is_empty() && self.retract.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.propagate.len() + self.retract.len()
    }

    pub fn clear(&mut self) {
        self.propagate.clear();
        self.retract.clear();
    }
}
