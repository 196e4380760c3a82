use std::error::Error;
use std::fs;
use std::path::Path;

use serde::Deserialize;

/// Tunables for the lighting runtime, read from the `[lighting]` table of `lighting.toml`.
#[derive(Clone, Debug, Deserialize)]
pub struct RuntimeConfig {
    // Chunks per vertical column.
    #[serde(default = "default_column_height")]
    pub column_height: i32,
    #[serde(default = "default_sunlight_threads")]
    pub sunlight_threads: usize,
    // Pending column requests examined per tick when looking for a complete cluster.
    #[serde(default = "default_max_cluster_attempts")]
    pub max_cluster_attempts_per_tick: usize,
    // Failed finalize checks before a chunk is finalized anyway.
    #[serde(default = "default_finalize_settle_limit")]
    pub finalize_settle_limit: u32,
}

fn default_column_height() -> i32 {
    8
}
fn default_sunlight_threads() -> usize {
    1
}
fn default_max_cluster_attempts() -> usize {
    16
}
fn default_finalize_settle_limit() -> u32 {
    600
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            column_height: default_column_height(),
            sunlight_threads: default_sunlight_threads(),
            max_cluster_attempts_per_tick: default_max_cluster_attempts(),
            finalize_settle_limit: default_finalize_settle_limit(),
        }
    }
}

impl RuntimeConfig {
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, Box<dyn Error>> {
        let s = fs::read_to_string(path)?;
        Self::from_toml_str(&s)
    }

    pub fn from_toml_str(toml_str: &str) -> Result<Self, Box<dyn Error>> {
        let cfg: RuntimeConfig = toml::from_str(toml_str)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), Box<dyn Error>> {
        if self.column_height < 1 {
            return Err(format!("column_height must be at least 1, got {}", self.column_height).into());
        }
        if self.sunlight_threads == 0 {
            return Err("sunlight_threads must be at least 1".into());
        }
        if self.max_cluster_attempts_per_tick == 0 {
            return Err("max_cluster_attempts_per_tick must be at least 1".into());
        }
        Ok(())
    }
}
