//! `braille.toml` configuration.
//!
//! Every section is optional. Relative paths are resolved against the
//! directory the file was found in.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, Result};
use crate::log_bridge::LogSeverity;
use crate::tables::TableBundle;
use crate::translate::BrailleOptions;

/// Name of the configuration file.
pub const CONFIG_FILE: &str = "braille.toml";

/// Environment variable overriding the table asset directory.
pub const TABLES_ENV: &str = "BRAILLE_TABLES";

/// Where a system liblouis installation keeps its tables. Used when no
/// directory is configured and the tables are not compiled in.
pub const DEFAULT_TABLE_SOURCE: &str = "/usr/share/liblouis/tables";

/// Default engine storage root, relative to the project directory.
pub const DEFAULT_DATA_DIR: &str = ".braille";

/// The top-level configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Table asset locations.
    #[serde(default)]
    pub tables: TablesConfig,
    /// Engine settings.
    #[serde(default)]
    pub engine: EngineConfig,
    /// Default output options.
    #[serde(default)]
    pub output: BrailleOptions,
}

/// Table locations section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TablesConfig {
    /// Directory holding the nine table assets.
    #[serde(default)]
    pub source: Option<PathBuf>,
    /// Engine storage root; tables land in `<data_dir>/liblouis/tables`.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

/// Engine settings section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Engine log threshold.
    #[serde(default)]
    pub log_level: Option<LogSeverity>,
    /// File the engine logs to, in addition to the callback.
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

impl BridgeConfig {
    /// Search upward from `start_dir` for a `braille.toml` file, parse and
    /// return it along with the directory it was found in.
    pub fn find_and_load(start_dir: &Path) -> Result<Option<(Self, PathBuf)>> {
        let mut dir = start_dir.to_path_buf();
        loop {
            let candidate = dir.join(CONFIG_FILE);
            if candidate.is_file() {
                return Ok(Some((Self::load(&candidate)?, dir)));
            }
            if !dir.pop() {
                break;
            }
        }
        Ok(None)
    }

    /// Load a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        content.parse()
    }

    /// Explicit table asset directory: `BRAILLE_TABLES`, then the config.
    pub fn table_override(&self, base: &Path) -> Option<PathBuf> {
        self.table_override_with(base, env_override())
    }

    fn table_override_with(&self, base: &Path, env_override: Option<PathBuf>) -> Option<PathBuf> {
        env_override.or_else(|| self.tables.source.as_ref().map(|p| base.join(p)))
    }

    /// Table asset directory, falling back to the system liblouis location.
    pub fn table_source(&self, base: &Path) -> PathBuf {
        self.table_source_with(base, env_override())
    }

    fn table_source_with(&self, base: &Path, env_override: Option<PathBuf>) -> PathBuf {
        self.table_override_with(base, env_override)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_TABLE_SOURCE))
    }

    /// The tables to provision: an explicit directory when one is
    /// configured, otherwise the compiled-in assets (or, without the
    /// `bundled-tables` feature, the system liblouis tables).
    pub fn table_bundle(&self, base: &Path) -> Result<TableBundle> {
        self.table_bundle_with(base, env_override())
    }

    fn table_bundle_with(&self, base: &Path, env_override: Option<PathBuf>) -> Result<TableBundle> {
        match self.table_override_with(base, env_override) {
            Some(dir) => TableBundle::load_dir(&dir),
            None => default_bundle(),
        }
    }

    /// Engine storage root.
    pub fn data_dir(&self, base: &Path) -> PathBuf {
        base.join(
            self.tables
                .data_dir
                .as_deref()
                .unwrap_or(Path::new(DEFAULT_DATA_DIR)),
        )
    }

    /// Engine settings with the log file resolved against `base`.
    pub fn engine_settings(&self, base: &Path) -> EngineConfig {
        EngineConfig {
            log_level: self.engine.log_level,
            log_file: self.engine.log_file.as_ref().map(|p| base.join(p)),
        }
    }

    /// Generate a commented starting configuration.
    pub fn template() -> String {
        format!(
            r#"[tables]
source = "{DEFAULT_TABLE_SOURCE}"
data_dir = "{DEFAULT_DATA_DIR}"

[engine]
log_level = "warn"

[output]
mode = "brf"
contracted = true
"#
        )
    }
}

fn env_override() -> Option<PathBuf> {
    std::env::var_os(TABLES_ENV).map(PathBuf::from)
}

#[cfg(feature = "bundled-tables")]
fn default_bundle() -> Result<TableBundle> {
    TableBundle::bundled()
}

#[cfg(not(feature = "bundled-tables"))]
fn default_bundle() -> Result<TableBundle> {
    TableBundle::load_dir(Path::new(DEFAULT_TABLE_SOURCE))
}

impl std::str::FromStr for BridgeConfig {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }
}
