pub type BlockId = u16;

/// Highest light level any channel can hold.
pub const LIGHT_LEVEL_MAX: u8 = 15;

/// Lighting-relevant properties of a block type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockDefinition {
    pub id: BlockId,
    pub name: String,
    /// Light may enter voxels of this block.
    pub transparent: bool,
    /// Extra levels lost by light crossing one voxel of this block, on top of the unit step.
    pub absorption: u8,
    /// Red/green/blue emission levels applied when the block is placed.
    pub emission: [u8; 3],
}

impl BlockDefinition {
    pub const AIR: BlockId = 0;

    pub(crate) fn placeholder(id: BlockId) -> Self {
        Self {
            id,
            name: String::new(),
            transparent: false,
            absorption: LIGHT_LEVEL_MAX,
            emission: [0; 3],
        }
    }

    #[inline]
    pub fn is_opaque(&self) -> bool {
        !self.transparent
    }

    #[inline]
    pub fn emits(&self) -> bool {
        self.emission.iter().any(|&e| e > 0)
    }
}
