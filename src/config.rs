//! Translator settings, optionally loaded from a JSON file.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Emit `SP = stack_base; call Sys.init 0` before the first unit.
    pub bootstrap: bool,
    pub stack_base: u16,
    /// Precede each lowered command with a `// command` line.
    pub annotate: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bootstrap: true,
            stack_base: 256,
            annotate: true,
        }
    }
}

pub fn load_from_json(json: &str) -> Result<Config> {
    let config: Config = serde_json::from_str(json)?;
    Ok(config)
}

/// Read and parse a config file.
pub fn load(path: &Path) -> Result<Config> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Reading config {}", path.display()))?;
    load_from_json(&json).with_context(|| format!("Parsing config {}", path.display()))
}
