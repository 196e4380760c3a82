use std::error::Error;
use std::fs;
use std::path::Path;

use geist_runtime::RuntimeConfig;
use geist_world::TerrainConfig;
use serde::Deserialize;

/// Top-level `lighting.toml`.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub lighting: RuntimeConfig,
    #[serde(default)]
    pub terrain: TerrainConfig,
}

impl AppConfig {
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, Box<dyn Error>> {
        let s = fs::read_to_string(path)?;
        Self::from_toml_str(&s)
    }

    pub fn from_toml_str(toml_str: &str) -> Result<Self, Box<dyn Error>> {
        let cfg: AppConfig = toml::from_str(toml_str)?;
        cfg.lighting.validate()?;
        if cfg.terrain.min_height > cfg.terrain.max_height {
            return Err(format!(
                "terrain.min_height {} is above terrain.max_height {}",
                cfg.terrain.min_height, cfg.terrain.max_height
            )
            .into());
        }
        Ok(cfg)
    }
}
