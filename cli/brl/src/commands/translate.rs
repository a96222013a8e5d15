//! `brl translate`: text to Braille and back.

use std::path::Path;

use anyhow::{anyhow, Result};
use braille_bridge::{BrailleMode, BrailleOptions, BridgeConfig, TableName};

/// Output options from `braille.toml`, overridden by command-line flags.
pub fn resolve_options(
    config: &BridgeConfig,
    mode: Option<&str>,
    uncontracted: bool,
) -> Result<BrailleOptions> {
    let mut options = config.output;
    if let Some(mode) = mode {
        options.mode = BrailleMode::parse(mode)
            .ok_or_else(|| anyhow!("unknown output mode '{mode}' (expected brf or unicode)"))?;
    }
    if uncontracted {
        options.contracted = false;
    }
    Ok(options)
}

/// Translate `text` and print the result.
pub fn run(
    project_dir: &Path,
    config: &BridgeConfig,
    text: &str,
    mode: Option<&str>,
    uncontracted: bool,
    back: bool,
) -> Result<()> {
    let options = resolve_options(config, mode, uncontracted)?;
    let table = TableName::for_contracted(options.contracted);
    let output = translate(project_dir, config, table, text, back, options.mode)?;
    println!("{output}");
    Ok(())
}

#[cfg(feature = "liblouis")]
fn translate(
    project_dir: &Path,
    config: &BridgeConfig,
    table: TableName,
    text: &str,
    back: bool,
    mode: BrailleMode,
) -> Result<String> {
    use anyhow::Context;
    use braille_bridge::{brf_to_unicode, unicode_to_brf};

    if text.is_empty() {
        return Ok(String::new());
    }
    let translator = braille_bridge::open_translator(config, project_dir)
        .context("opening the liblouis engine")?;
    let input = if back { unicode_to_brf(text) } else { text.to_string() };
    let output = translator
        .translate_string(table, &input, back)?
        .ok_or_else(|| anyhow!("liblouis could not translate the input with {table}"))?;
    Ok(match (back, mode) {
        (false, BrailleMode::Unicode) => brf_to_unicode(&output),
        _ => output,
    })
}

#[cfg(not(feature = "liblouis"))]
fn translate(
    _project_dir: &Path,
    _config: &BridgeConfig,
    _table: TableName,
    _text: &str,
    _back: bool,
    _mode: BrailleMode,
) -> Result<String> {
    Err(super::engine_unavailable())
}
