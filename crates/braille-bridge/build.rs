//! Stage the nine table assets in `OUT_DIR` for `include_bytes!` when the
//! `bundled-tables` feature is enabled.
//!
//! Assets are taken from `BRAILLE_TABLES`, then the crate's `tables/`
//! directory, then the system liblouis installation.

use std::env;
use std::fs;
use std::io;
use std::path::PathBuf;

const TABLE_FILES: [&str; 9] = [
    "en-ueb-g1.ctb",
    "en-ueb-g2.ctb",
    "en-ueb-chardefs.uti",
    "en-ueb-math.ctb",
    "text_nabcc.dis",
    "spaces.uti",
    "latinLetterDef6Dots.uti",
    "latinUppercaseComp6.uti",
    "braille-patterns.cti",
];

const SOURCE_ENV: &str = "BRAILLE_TABLES";
const SYSTEM_SOURCE: &str = "/usr/share/liblouis/tables";

fn env_path(key: &str) -> io::Result<PathBuf> {
    env::var_os(key)
        .map(PathBuf::from)
        .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("{key} is not set")))
}

fn main() -> io::Result<()> {
    println!("cargo:rerun-if-env-changed={SOURCE_ENV}");
    println!("cargo:rerun-if-changed=tables");
    if env::var_os("CARGO_FEATURE_BUNDLED_TABLES").is_none() {
        return Ok(());
    }

    let vendored = env_path("CARGO_MANIFEST_DIR")?.join("tables");
    let source = env::var_os(SOURCE_ENV)
        .map(PathBuf::from)
        .or_else(|| vendored.join(TABLE_FILES[0]).is_file().then_some(vendored))
        .unwrap_or_else(|| PathBuf::from(SYSTEM_SOURCE));

    let out = env_path("OUT_DIR")?.join("tables");
    fs::create_dir_all(&out)?;
    for name in TABLE_FILES {
        let from = source.join(name);
        println!("cargo:rerun-if-changed={}", from.display());
        fs::copy(&from, out.join(name)).map_err(|e| {
            io::Error::new(
                e.kind(),
                format!("bundled-tables: cannot read {}: {e}", from.display()),
            )
        })?;
    }
    Ok(())
}
