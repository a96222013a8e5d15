//! `brl doctor`: engine and configuration diagnostics.

use std::path::Path;

use anyhow::{bail, Result};
use braille_bridge::tables::{TABLES_BUNDLED, TABLE_FILES};
use braille_bridge::{BridgeConfig, LIBLOUIS_AVAILABLE};
use serde::Serialize;

/// Everything the doctor found.
#[derive(Debug, Serialize)]
pub struct DoctorReport {
    pub brl_version: String,
    pub liblouis_compiled: bool,
    pub tables_bundled: bool,
    pub config_file: Option<String>,
    pub config_error: Option<String>,
    pub table_source: String,
    pub tables_present: usize,
    pub tables_missing: Vec<String>,
    pub engine: Option<EngineReport>,
}

/// Live engine status, available with the `liblouis` feature.
#[derive(Debug, Serialize)]
pub struct EngineReport {
    pub version: String,
    pub char_size: usize,
    pub grade1_ok: bool,
    pub grade2_ok: bool,
    pub error: Option<String>,
}

/// Gather diagnostics starting from `cwd`.
pub fn collect(cwd: &Path) -> DoctorReport {
    let (config, base, config_file, config_error) = match BridgeConfig::find_and_load(cwd) {
        Ok(Some((config, dir))) => {
            let file = dir.join(braille_bridge::config::CONFIG_FILE).display().to_string();
            (config, dir, Some(file), None)
        }
        Ok(None) => (BridgeConfig::default(), cwd.to_path_buf(), None, None),
        Err(e) => (BridgeConfig::default(), cwd.to_path_buf(), None, Some(e.to_string())),
    };

    let source = config.table_source(&base);
    let scan = super::tables::scan(&source);
    let tables_missing: Vec<String> = scan
        .iter()
        .filter(|(_, present)| !present)
        .map(|(name, _)| name.to_string())
        .collect();
    let uses_bundle = TABLES_BUNDLED && config.table_override(&base).is_none();
    let engine = if tables_missing.is_empty() || uses_bundle {
        probe_engine(&config, &base)
    } else {
        None
    };

    DoctorReport {
        brl_version: env!("CARGO_PKG_VERSION").to_string(),
        liblouis_compiled: LIBLOUIS_AVAILABLE,
        tables_bundled: TABLES_BUNDLED,
        config_file,
        config_error,
        table_source: source.display().to_string(),
        tables_present: TABLE_FILES.len() - tables_missing.len(),
        tables_missing,
        engine,
    }
}

#[cfg(feature = "liblouis")]
fn probe_engine(config: &BridgeConfig, base: &Path) -> Option<EngineReport> {
    use braille_bridge::TableName;

    Some(match braille_bridge::open_translator(config, base) {
        Ok(translator) => EngineReport {
            version: translator.version(),
            char_size: translator.char_size(),
            grade1_ok: translator.check_table(TableName::Grade1).unwrap_or(false),
            grade2_ok: translator.check_table(TableName::Grade2).unwrap_or(false),
            error: None,
        },
        Err(e) => EngineReport {
            version: String::new(),
            char_size: 0,
            grade1_ok: false,
            grade2_ok: false,
            error: Some(e.to_string()),
        },
    })
}

#[cfg(not(feature = "liblouis"))]
fn probe_engine(_config: &BridgeConfig, _base: &Path) -> Option<EngineReport> {
    None
}

/// Print diagnostics as text or JSON.
pub fn run(cwd: &Path, format: Option<&str>) -> Result<()> {
    let report = collect(cwd);
    match format.unwrap_or("human") {
        "human" => print_human(&report),
        "json" => println!("{}", serde_json::to_string_pretty(&report)?),
        other => bail!("unknown format '{other}' (expected human or json)"),
    }
    Ok(())
}

fn print_human(report: &DoctorReport) {
    println!("=== Braille Doctor ===");
    println!();
    println!("brl version: {}", report.brl_version);
    println!();

    println!("--- Feature Support ---");
    println!(
        "  liblouis engine: {}",
        if report.liblouis_compiled {
            "available"
        } else {
            "not compiled (rebuild with --features liblouis)"
        }
    );
    println!(
        "  Bundled tables:  {}",
        if report.tables_bundled {
            "compiled in"
        } else {
            "not compiled (rebuild with --features bundled-tables)"
        }
    );
    println!();

    println!("--- Configuration ---");
    match (&report.config_file, &report.config_error) {
        (_, Some(e)) => println!("  braille.toml: error: {e}"),
        (Some(file), None) => println!("  braille.toml: found at {file}"),
        (None, None) => println!("  braille.toml: not found (using defaults)"),
    }
    println!();

    println!("--- Tables ---");
    println!("  Source:  {}", report.table_source);
    println!("  Present: {}/{}", report.tables_present, TABLE_FILES.len());
    for name in &report.tables_missing {
        println!("  Missing: {name}");
    }

    if let Some(engine) = &report.engine {
        println!();
        println!("--- Engine ---");
        match &engine.error {
            Some(e) => println!("  error: {e}"),
            None => {
                println!("  liblouis:  {}", engine.version);
                println!("  char size: {} bytes", engine.char_size);
                println!("  grade-1:   {}", if engine.grade1_ok { "ok" } else { "failed" });
                println!("  grade-2:   {}", if engine.grade2_ok { "ok" } else { "failed" });
            }
        }
    }
}
