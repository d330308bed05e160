//! Loading of episode settings from TOML files.

use std::{fs, path::Path};

use anyhow::{Context, Result};
use pushbox_system_episode::EpisodeConfig;

/// Reads the configuration at `path`, or the defaults when no path is given.
///
/// Keys missing from the file keep their default values.
pub(crate) fn load(path: Option<&Path>) -> Result<EpisodeConfig> {
    let config = match path {
        Some(path) => {
            let contents = fs::read_to_string(path).with_context(|| {
                format!("failed to read episode config at {}", path.display())
            })?;
            parse(&contents)?
        }
        None => EpisodeConfig::default(),
    };
    config.validate().context("episode config is invalid")?;
    Ok(config)
}

fn parse(contents: &str) -> Result<EpisodeConfig> {
    toml::from_str(contents).context("failed to parse episode config toml contents")
}
