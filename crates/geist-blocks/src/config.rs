use serde::Deserialize;

// Top-level blocks config file
#[derive(Deserialize, Debug, Default)]
pub struct BlocksConfig {
    pub blocks: Vec<BlockDef>,
    // Optional name of a block to use when a voxel references an id that was never
    // registered. If absent, unknown ids behave as an opaque, non-emitting block.
    #[serde(default)]
    pub unknown_block: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct BlockDef {
    pub name: String,
    #[serde(default)]
    pub id: Option<u16>,
    #[serde(default)]
    pub transparent: Option<bool>,
    // Defaults to 0 for transparent blocks and 15 for opaque ones.
    #[serde(default)]
    pub absorption: Option<u8>,
    // [red, green, blue]
    #[serde(default)]
    pub emission: Option<[u8; 3]>,
}

impl BlockDef {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.into(),
            id: None,
            transparent: None,
            absorption: None,
            emission: None,
        }
    }
}
