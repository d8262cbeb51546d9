use anyhow::Context;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
pub struct Config {
    pub version: u32,
    pub database: Database,
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Config> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.to_string_lossy()))?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> anyhow::Result<Config> {
        toml::from_str(contents).with_context(|| "Failed to parse config TOML")
    }
}

/// Where the track library is persisted
#[derive(Debug, Deserialize, Clone, PartialEq, Eq, Default)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Database {
    #[default]
    InMemory,
    OnDisk { path: PathBuf },
}
