//! `storyloom config`: Configuration inspection.

use anyhow::Context as _;
use storyloom_config::EngineConfig;

pub fn run(default: bool, path: bool) -> anyhow::Result<()> {
    if path {
        println!("{}", EngineConfig::config_dir().join("config.toml").display());
        return Ok(());
    }
    if default {
        println!("{}", EngineConfig::default_toml());
        return Ok(());
    }

    let config = EngineConfig::load().context("failed to load configuration")?;
    println!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}
