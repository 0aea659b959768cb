use crate::config::Config;
use color_eyre::eyre::{Context, Result};
use log::info;
use std::fs::File;
use std::path::Path;

/// Load, parse and validate configuration from a YAML file
pub fn load_config(config_path: &Path) -> Result<Config> {
    info!("Loading configuration from: {:?}", config_path);

    let file = File::open(config_path)
        .with_context(|| format!("Failed to open config file {:?}", config_path))?;

    let config: Config = serde_yaml::from_reader(file)
        .with_context(|| format!("Failed to parse config file {:?}", config_path))?;

    config.validate()?;

    info!(
        "Loaded {} of {} bytes over {} dimension(s), {} NPUs",
        config.collective.com_type,
        config.collective.data_size,
        config.network.dims.len(),
        config.npus_count()
    );

    Ok(config)
}
