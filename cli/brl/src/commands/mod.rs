//! CLI command implementations.

pub mod doctor;
pub mod init;
pub mod tables;
pub mod translate;
pub mod unicode;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use braille_bridge::BridgeConfig;

/// Find `braille.toml` above `cwd`, falling back to defaults rooted at `cwd`.
pub fn load_config(cwd: &Path) -> Result<(BridgeConfig, PathBuf)> {
    let found = BridgeConfig::find_and_load(cwd).context("loading braille.toml")?;
    Ok(found.unwrap_or_else(|| (BridgeConfig::default(), cwd.to_path_buf())))
}

/// Table asset directory, with an explicit `--from` taking precedence.
pub fn table_source(project_dir: &Path, config: &BridgeConfig, from: Option<&str>) -> PathBuf {
    match from {
        Some(dir) => project_dir.join(dir),
        None => config.table_source(project_dir),
    }
}

#[cfg(not(feature = "liblouis"))]
pub(crate) fn engine_unavailable() -> anyhow::Error {
    anyhow::anyhow!("liblouis support not compiled (rebuild with --features liblouis)")
}
