//! Process-wide default translator over native liblouis.
//!
//! liblouis is a process singleton, so the free functions here share one
//! [`Translator`] behind a mutex. It is opened lazily from the
//! `braille.toml` found above the working directory (or the defaults).

use std::path::Path;

use once_cell::sync::Lazy;
use parking_lot::Mutex;

use crate::config::BridgeConfig;
use crate::engine::liblouis::LibLouis;
use crate::error::Result;
use crate::translate::{BrailleOptions, TableName, Translator};

static DEFAULT: Lazy<Mutex<Option<Translator<LibLouis>>>> = Lazy::new(|| Mutex::new(None));

/// Open a translator over liblouis using `config`, resolving paths
/// against `base`: pick the table assets, check the engine's character
/// width, provision the tables and apply the engine settings.
///
/// Fails with [`crate::BridgeError::AlreadyOpen`] while the default
/// translator (or any other liblouis handle) is alive; see
/// [`close_default`].
pub fn open_translator(config: &BridgeConfig, base: &Path) -> Result<Translator<LibLouis>> {
    let bundle = config.table_bundle(base)?;
    let engine = LibLouis::new(&config.data_dir(base))?;
    let translator = Translator::new(engine, bundle);
    translator.initialize()?;
    translator.configure(&config.engine_settings(base))?;
    Ok(translator)
}

fn open_default() -> Result<Translator<LibLouis>> {
    let cwd = std::env::current_dir()?;
    let (config, base) = BridgeConfig::find_and_load(&cwd)?.unwrap_or((BridgeConfig::default(), cwd));
    open_translator(&config, &base)
}

/// Run `f` against the default translator, opening it on first use.
///
/// The default translator's lock is held while `f` runs and is not
/// reentrant. Calling back into this module from `f`, or from a log
/// callback installed on the default translator, deadlocks.
pub fn with_default<T>(f: impl FnOnce(&Translator<LibLouis>) -> T) -> Result<T> {
    let mut slot = DEFAULT.lock();
    let translator = match &mut *slot {
        Some(translator) => translator,
        empty => empty.insert(open_default()?),
    };
    Ok(f(translator))
}

/// Drop the default translator, releasing liblouis for another owner.
/// The next call through this module opens a fresh one.
pub fn close_default() {
    DEFAULT.lock().take();
}

/// Translate `text` to Braille with the default translator.
///
/// Returns an empty string on empty input or any failure.
pub fn to_braille(text: &str, options: Option<BrailleOptions>) -> String {
    if text.is_empty() {
        return String::new();
    }
    with_default(|translator| translator.to_braille(text, options)).unwrap_or_else(|e| {
        log::error!("Braille translation error: {e}");
        String::new()
    })
}

/// Translate with an explicit table using the default translator.
pub fn translate_string(table: TableName, text: &str, backtranslate: bool) -> Result<Option<String>> {
    with_default(|translator| translator.translate_string(table, text, backtranslate))?
}
