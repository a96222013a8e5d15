//! Table provisioning.
//!
//! The engine resolves table names against files in its own storage. The
//! nine English UEB tables (the two grade tables and everything they
//! include) are written there once per process and never touched again.

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::engine::Engine;
use crate::error::{BridgeError, Result};

/// Canonical file names of the bundled tables, in provisioning order.
pub const TABLE_FILES: [&str; 9] = [
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

/// Whether the table assets are compiled into this build.
pub const TABLES_BUNDLED: bool = cfg!(feature = "bundled-tables");

#[cfg(feature = "bundled-tables")]
macro_rules! bundled_assets {
    ($($name:literal),* $(,)?) => {
        [$(($name, include_bytes!(concat!(env!("OUT_DIR"), "/tables/", $name)) as &[u8])),*]
    };
}

#[cfg(feature = "bundled-tables")]
static BUNDLED: [(&str, &[u8]); 9] = bundled_assets!(
    "en-ueb-g1.ctb",
    "en-ueb-g2.ctb",
    "en-ueb-chardefs.uti",
    "en-ueb-math.ctb",
    "text_nabcc.dis",
    "spaces.uti",
    "latinLetterDef6Dots.uti",
    "latinUppercaseComp6.uti",
    "braille-patterns.cti",
);

/// A single table asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub name: String,
    pub bytes: Cow<'static, [u8]>,
}

impl Table {
    pub fn new(name: impl Into<String>, bytes: impl Into<Cow<'static, [u8]>>) -> Self {
        Table {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    /// Where this table lives inside `table_dir`.
    pub fn mount_path(&self, table_dir: &Path) -> PathBuf {
        table_dir.join(&self.name)
    }
}

/// The complete set of table assets the engine needs.
#[derive(Debug, Clone)]
pub struct TableBundle {
    tables: Vec<Table>,
}

impl TableBundle {
    /// Build a bundle, checking that every canonical table is present.
    pub fn new(tables: Vec<Table>) -> Result<Self> {
        for name in TABLE_FILES {
            if !tables.iter().any(|t| t.name == name) {
                return Err(BridgeError::Provisioning {
                    path: PathBuf::from(name),
                    detail: "missing table asset".to_string(),
                });
            }
        }
        if let Some(extra) = tables.iter().find(|t| !TABLE_FILES.contains(&t.name.as_str())) {
            return Err(BridgeError::Provisioning {
                path: PathBuf::from(&extra.name),
                detail: "not a bundled table".to_string(),
            });
        }
        Ok(TableBundle { tables })
    }

    /// Build a bundle from compiled-in assets, e.g. `include_bytes!` output.
    pub fn from_static(assets: &[(&'static str, &'static [u8])]) -> Result<Self> {
        Self::new(
            assets
                .iter()
                .map(|&(name, bytes)| Table::new(name, bytes))
                .collect(),
        )
    }

    /// The assets compiled into this build.
    #[cfg(feature = "bundled-tables")]
    pub fn bundled() -> Result<Self> {
        Self::from_static(&BUNDLED)
    }

    /// Load the nine canonical files from an asset directory.
    pub fn load_dir(dir: &Path) -> Result<Self> {
        let mut tables = Vec::with_capacity(TABLE_FILES.len());
        for name in TABLE_FILES {
            let path = dir.join(name);
            let bytes = std::fs::read(&path).map_err(|e| BridgeError::Provisioning {
                path: path.clone(),
                detail: format!("reading table asset: {e}"),
            })?;
            tables.push(Table::new(name, bytes));
        }
        Self::new(tables)
    }

    pub fn tables(&self) -> &[Table] {
        &self.tables
    }
}

/// Writes a [`TableBundle`] into engine storage exactly once.
///
/// The initialized flag sits behind a mutex held for the whole first
/// provisioning, so racing first calls cannot write twice. Once set it is
/// never cleared. A failed provisioning leaves the flag unset.
#[derive(Debug)]
pub struct TableProvisioner {
    bundle: TableBundle,
    initialized: Mutex<bool>,
}

impl TableProvisioner {
    pub fn new(bundle: TableBundle) -> Self {
        TableProvisioner {
            bundle,
            initialized: Mutex::new(false),
        }
    }

    pub fn is_initialized(&self) -> bool {
        *self.initialized.lock()
    }

    /// Materialize every table in the engine's table directory.
    ///
    /// No-op after the first successful call.
    pub fn ensure_tables_loaded<E: Engine + ?Sized>(&self, engine: &E) -> Result<()> {
        let mut initialized = self.initialized.lock();
        if *initialized {
            return Ok(());
        }

        let table_dir = engine.table_dir();
        engine
            .make_dir_all(&table_dir)
            .map_err(|e| BridgeError::Provisioning {
                path: table_dir.clone(),
                detail: format!("creating table directory: {e}"),
            })?;

        for table in self.bundle.tables() {
            let path = table.mount_path(&table_dir);
            engine
                .write_file(&path, &table.bytes)
                .map_err(|e| BridgeError::Provisioning {
                    path: path.clone(),
                    detail: format!("writing table: {e}"),
                })?;
        }

        log::debug!(
            "provisioned {} tables into {}",
            self.bundle.tables().len(),
            table_dir.display()
        );
        *initialized = true;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) fn test_bundle() -> TableBundle {
    TableBundle::new(
        TABLE_FILES
            .iter()
            .map(|&name| Table::new(name, format!("# {name}\n").into_bytes()))
            .collect(),
    )
    .unwrap()
}
