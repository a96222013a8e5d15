//! `brl tables`: inspect and provision the table assets.

use std::path::{Path, PathBuf};

use anyhow::Result;
use braille_bridge::tables::{TABLES_BUNDLED, TABLE_FILES};
use braille_bridge::BridgeConfig;

/// Presence of each table asset in `source`.
pub fn scan(source: &Path) -> Vec<(&'static str, bool)> {
    TABLE_FILES
        .into_iter()
        .map(|name| (name, source.join(name).is_file()))
        .collect()
}

/// Print which of the nine assets the source directory provides.
pub fn list(project_dir: &Path, config: &BridgeConfig, from: Option<&str>) -> Result<()> {
    let source = super::table_source(project_dir, config, from);
    if TABLES_BUNDLED {
        println!("Bundled tables: compiled in");
    }
    println!("Table source:   {}", source.display());
    println!("Engine storage: {}", installed_dir(config, project_dir).display());
    let entries = scan(&source);
    for (name, present) in &entries {
        println!("  {name:<26} {}", if *present { "found" } else { "missing" });
    }
    let missing = entries.iter().filter(|(_, present)| !present).count();
    if missing > 0 {
        println!("{missing} of {} table assets missing", TABLE_FILES.len());
    }
    Ok(())
}

/// Write the assets into engine storage under the configured data directory.
#[cfg(feature = "liblouis")]
pub fn install(project_dir: &Path, config: &BridgeConfig, from: Option<&str>) -> Result<()> {
    use anyhow::Context;
    use braille_bridge::engine::liblouis::LibLouis;
    use braille_bridge::{TableBundle, Translator};

    let bundle = match from {
        Some(dir) => {
            let source = project_dir.join(dir);
            TableBundle::load_dir(&source)
                .with_context(|| format!("loading tables from {}", source.display()))?
        }
        None => config.table_bundle(project_dir).context("loading tables")?,
    };
    let engine = LibLouis::new(&config.data_dir(project_dir))?;
    let translator = Translator::new(engine, bundle);
    translator.ensure_tables_loaded()?;

    let data_dir = translator.engine().data_dir();
    println!(
        "Installed {} tables into {}",
        TABLE_FILES.len(),
        data_dir.join("liblouis").join("tables").display()
    );
    Ok(())
}

#[cfg(not(feature = "liblouis"))]
pub fn install(_project_dir: &Path, _config: &BridgeConfig, _from: Option<&str>) -> Result<()> {
    Err(super::engine_unavailable())
}

/// Where the engine resolves tables for this configuration.
pub fn installed_dir(config: &BridgeConfig, project_dir: &Path) -> PathBuf {
    config.data_dir(project_dir).join("liblouis").join("tables")
}
