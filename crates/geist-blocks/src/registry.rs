use std::collections::HashMap;
use std::error::Error;
use std::fs;
use std::path::Path;

use super::config::{BlockDef, BlocksConfig};
use super::types::{BlockDefinition, BlockId, LIGHT_LEVEL_MAX};

#[derive(Clone, Debug)]
pub struct BlockRegistry {
    pub blocks: Vec<BlockDefinition>,
    pub by_name: HashMap<String, BlockId>,
    pub unknown_block_id: Option<BlockId>,
    fallback: BlockDefinition,
}

impl Default for BlockRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockRegistry {
    pub fn new() -> Self {
        Self {
            blocks: Vec::new(),
            by_name: HashMap::new(),
            unknown_block_id: None,
            fallback: BlockDefinition::placeholder(BlockId::MAX),
        }
    }

    /// Registry with the stock block set shipped in `assets/blocks.toml`.
    pub fn builtin() -> Self {
        let def = |name: &str, transparent: bool, absorption: u8, emission: [u8; 3]| BlockDef {
            transparent: Some(transparent),
            absorption: Some(absorption),
            emission: Some(emission),
            ..BlockDef::new(name)
        };
        let cfg = BlocksConfig {
            blocks: vec![
                def("air", true, 0, [0, 0, 0]),
                def("stone", false, 15, [0, 0, 0]),
                def("dirt", false, 15, [0, 0, 0]),
                def("grass", false, 15, [0, 0, 0]),
                def("glass", true, 0, [0, 0, 0]),
                def("leaves", true, 1, [0, 0, 0]),
                def("water", true, 2, [0, 0, 0]),
                def("torch", true, 0, [14, 12, 8]),
                def("lamp", false, 15, [15, 15, 15]),
            ],
            unknown_block: None,
        };
        // The stock set is static and always valid.
        Self::from_configs(cfg).unwrap_or_default()
    }

    #[inline]
    pub fn get(&self, id: BlockId) -> Option<&BlockDefinition> {
        self.blocks.get(id as usize).filter(|d| !d.name.is_empty())
    }

    /// Definition for `id`, falling back to the unknown block (or an opaque placeholder).
    #[inline]
    pub fn definition(&self, id: BlockId) -> &BlockDefinition {
        self.get(id)
            .or_else(|| self.unknown_block_id.and_then(|u| self.get(u)))
            .unwrap_or(&self.fallback)
    }

    pub fn id_by_name(&self, name: &str) -> Option<BlockId> {
        self.by_name.get(name).copied()
    }

    pub fn load_from_path(blocks_path: impl AsRef<Path>) -> Result<Self, Box<dyn Error>> {
        let blocks_toml = fs::read_to_string(blocks_path)?;
        Self::from_toml_str(&blocks_toml)
    }

    pub fn from_toml_str(toml_str: &str) -> Result<Self, Box<dyn Error>> {
        let cfg: BlocksConfig = toml::from_str(toml_str)?;
        Self::from_configs(cfg)
    }

    pub fn from_configs(cfg: BlocksConfig) -> Result<Self, Box<dyn Error>> {
        let mut reg = BlockRegistry::new();
        for def in cfg.blocks.into_iter() {
            let id = def.id.unwrap_or(reg.blocks.len() as u16);
            if reg.get(id).is_some() {
                return Err(format!("block `{}` reuses id {}", def.name, id).into());
            }
            if def.name.is_empty() {
                return Err(format!("block with id {id} has an empty name").into());
            }
            if reg.by_name.contains_key(&def.name) {
                return Err(format!("block name `{}` defined twice", def.name).into());
            }
            let transparent = def.transparent.unwrap_or(false);
            let absorption = def
                .absorption
                .unwrap_or(if transparent { 0 } else { LIGHT_LEVEL_MAX });
            if absorption > LIGHT_LEVEL_MAX {
                return Err(format!(
                    "block `{}`: absorption {} exceeds {}",
                    def.name, absorption, LIGHT_LEVEL_MAX
                )
                .into());
            }
            let emission = def.emission.unwrap_or([0; 3]);
            if emission.iter().any(|&e| e > LIGHT_LEVEL_MAX) {
                return Err(format!(
                    "block `{}`: emission {:?} exceeds {}",
                    def.name, emission, LIGHT_LEVEL_MAX
                )
                .into());
            }
            if reg.blocks.len() <= id as usize {
                reg.blocks
                    .resize_with(id as usize + 1, || BlockDefinition::placeholder(id));
            }
            reg.by_name.insert(def.name.clone(), id);
            reg.blocks[id as usize] = BlockDefinition {
                id,
                name: def.name,
                transparent,
                absorption,
                emission,
            };
        }
        // Gap fillers carry the id of the block that caused the resize; fix them up.
        for (i, b) in reg.blocks.iter_mut().enumerate() {
            if b.name.is_empty() {
                b.id = i as BlockId;
            }
        }
        if let Some(name) = cfg.unknown_block {
            reg.unknown_block_id = Some(
                reg.id_by_name(&name)
                    .ok_or_else(|| format!("unknown_block `{name}` is not defined"))?,
            );
        }
        Ok(reg)
    }
}
