//! `brl init`: write a starter configuration.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use braille_bridge::config::CONFIG_FILE;
use braille_bridge::BridgeConfig;

/// Create `braille.toml` in `dir`.
pub fn run(dir: &Path) -> Result<()> {
    let path = dir.join(CONFIG_FILE);
    if path.exists() {
        bail!("{} already exists", path.display());
    }
    fs::write(&path, BridgeConfig::template()).with_context(|| format!("writing {}", path.display()))?;
    println!("Created {}", path.display());
    Ok(())
}
