//! Loads the TOML file named by `Arguments::config` into the two domain
//! config structs the `configs` crate already defines (C10).

use {
    configs::{database::DatabasePoolConfig, CoordinatorConfig},
    serde::Deserialize,
};

#[derive(Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Settings {
    pub auction: CoordinatorConfig,
    #[serde(default)]
    pub database: DatabasePoolConfig,
}

impl Settings {
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|err| anyhow::anyhow!("reading config file {}: {err}", path.display()))?;
        toml::from_str(&raw).map_err(|err| anyhow::anyhow!("parsing config file {}: {err}", path.display()))
    }
}
