//! The translation service.
//!
//! [`Translator`] owns an engine together with its table provisioner and
//! log registry, and runs each request as one blocking round-trip:
//! provision tables, marshal the input, call the engine, decode the output,
//! release every buffer.

use std::path::Path;

use braille_codec::{brf_to_unicode, BrailleMode};
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::engine::{Engine, LogFn, TranslateCall};
use crate::error::{BridgeError, Result};
use crate::log_bridge::{LogBridge, LogSeverity};
use crate::memory::{self, ForeignBuffer, CODE_UNIT_BYTES};
use crate::tables::{TableBundle, TableProvisioner};

/// Engine mode flags passed on every call (none).
const TRANSLATION_MODE: i32 = 0;

/// How many times a call is retried with a larger output buffer when the
/// engine fills the one it was given.
const MAX_OUTPUT_ATTEMPTS: u32 = 4;

/// The two bundled translation tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TableName {
    /// Uncontracted ("full") English UEB.
    #[serde(rename = "grade-1")]
    Grade1,
    /// Contracted English UEB.
    #[serde(rename = "grade-2")]
    Grade2,
}

impl TableName {
    /// Parse `grade-1` / `grade-2`, also accepting the table file names.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "grade-1" | "full" | "en-ueb-g1.ctb" => Some(Self::Grade1),
            "grade-2" | "contracted" | "en-ueb-g2.ctb" => Some(Self::Grade2),
            _ => None,
        }
    }

    /// Table for the requested contraction setting.
    pub fn for_contracted(contracted: bool) -> Self {
        if contracted {
            Self::Grade2
        } else {
            Self::Grade1
        }
    }

    /// File name the engine resolves.
    pub fn file_name(self) -> &'static str {
        match self {
            Self::Grade1 => "en-ueb-g1.ctb",
            Self::Grade2 => "en-ueb-g2.ctb",
        }
    }
}

impl std::fmt::Display for TableName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Grade1 => write!(f, "grade-1"),
            Self::Grade2 => write!(f, "grade-2"),
        }
    }
}

impl std::str::FromStr for TableName {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s).ok_or_else(|| BridgeError::UnknownTable { name: s.to_string() })
    }
}

/// Options for [`Translator::to_braille`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrailleOptions {
    /// Output representation.
    pub mode: BrailleMode,
    /// Use contracted (grade 2) Braille.
    pub contracted: bool,
}

impl Default for BrailleOptions {
    fn default() -> Self {
        BrailleOptions {
            mode: BrailleMode::Brf,
            contracted: true,
        }
    }
}

/// A single translation request.
#[derive(Debug, Clone, Copy)]
pub struct TranslationRequest<'a> {
    pub text: &'a str,
    pub table: TableName,
    pub backtranslate: bool,
}

/// Translation service bound to one engine instance.
pub struct Translator<E: Engine> {
    engine: E,
    provisioner: TableProvisioner,
    log: LogBridge,
}

impl<E: Engine> Translator<E> {
    /// Bind a translator to `engine`. Nothing touches the engine until the
    /// first request or an explicit [`Translator::initialize`].
    pub fn new(engine: E, bundle: TableBundle) -> Self {
        Translator {
            engine,
            provisioner: TableProvisioner::new(bundle),
            log: LogBridge::new(),
        }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Check the engine's character width and provision the tables.
    pub fn initialize(&self) -> Result<()> {
        let size = self.engine.char_size();
        if size != CODE_UNIT_BYTES {
            return Err(BridgeError::UnsupportedCharSize { size });
        }
        self.ensure_tables_loaded()
    }

    /// Apply engine settings: log threshold, log file and the log callback.
    pub fn configure(&self, config: &EngineConfig) -> Result<()> {
        if let Some(level) = config.log_level {
            self.set_log_level(level);
        }
        if let Some(path) = &config.log_file {
            self.log_file(path)?;
        }
        self.register_log_callback(None)
    }

    /// Write the bundled tables into engine storage, once.
    pub fn ensure_tables_loaded(&self) -> Result<()> {
        self.provisioner.ensure_tables_loaded(&self.engine)
    }

    pub fn tables_loaded(&self) -> bool {
        self.provisioner.is_initialized()
    }

    /// Translate (or back-translate) with an explicit table.
    ///
    /// Returns `Ok(None)` for empty input, without touching the engine, and
    /// when the engine rejects the request. Errors are reserved for
    /// provisioning and foreign-memory failures.
    pub fn translate(&self, request: &TranslationRequest<'_>) -> Result<Option<String>> {
        if request.text.is_empty() {
            return Ok(None);
        }
        self.ensure_tables_loaded()?;

        let engine = &self.engine;
        let input = memory::transfer(engine, request.text)?;
        let unit_count = i32::try_from(input.capacity_units() - 1)
            .map_err(|_| BridgeError::AllocationFailed { bytes: input.byte_len() })?;
        let input_len = ForeignBuffer::cell(engine, unit_count)?;

        // Same capacity as the input to begin with, doubled whenever the
        // engine fills the buffer completely.
        let mut output_bytes = input.byte_len();
        let mut attempt = 1;
        loop {
            let output = ForeignBuffer::alloc(engine, output_bytes)?;
            let output_len = ForeignBuffer::cell(engine, output.capacity_units() as i32)?;
            // The engine writes the consumed input length back into the cell.
            input_len.write_cell(unit_count)?;

            let call = TranslateCall {
                table: request.table.file_name(),
                input: input.ptr(),
                input_len: input_len.ptr(),
                output: output.ptr(),
                output_len: output_len.ptr(),
                mode: TRANSLATION_MODE,
            };
            let success = if request.backtranslate {
                engine.back_translate_string(&call)
            } else {
                engine.translate_string(&call)
            };
            if !success {
                return Ok(None);
            }

            let written = usize::try_from(output_len.read_cell()?).unwrap_or(0);
            if written >= output.capacity_units() {
                if attempt < MAX_OUTPUT_ATTEMPTS {
                    log::debug!(
                        "output filled {written} code units on attempt {attempt}, retrying with a larger buffer"
                    );
                    output_bytes *= 2;
                    attempt += 1;
                    continue;
                }
                log::warn!(
                    "Braille output may be truncated: buffer of {written} code units still full after {attempt} attempts"
                );
            }

            let units = memory::read(engine, output.ptr(), Some(output_len.ptr()))?;
            return Ok(Some(memory::decode_code_units(&units)));
        }
    }

    /// Translate `text` with the given table.
    pub fn translate_string(
        &self,
        table: TableName,
        text: &str,
        backtranslate: bool,
    ) -> Result<Option<String>> {
        self.translate(&TranslationRequest {
            text,
            table,
            backtranslate,
        })
    }

    /// Translate `text` to Braille, as BRF or Unicode.
    ///
    /// Never fails: an engine rejection or bridge error is logged and
    /// yields an empty string, which is what callers rendering live
    /// previews expect.
    pub fn to_braille(&self, text: &str, options: Option<BrailleOptions>) -> String {
        let options = options.unwrap_or_default();
        if text.is_empty() {
            return String::new();
        }

        let table = TableName::for_contracted(options.contracted);
        let result = self.translate_string(table, text, false).unwrap_or_else(|e| {
            log::error!("Braille translation error: {e}");
            None
        });

        match result {
            None => {
                log::warn!(
                    "Failed to translate text to braille: {text:?} (mode: {}, contracted: {})",
                    options.mode,
                    options.contracted
                );
                String::new()
            }
            Some(brf) => match options.mode {
                BrailleMode::Brf => brf,
                BrailleMode::Unicode => brf_to_unicode(&brf),
            },
        }
    }

    /// Install a log callback, or the default `log`-facade handler.
    ///
    /// The callback runs on the translating thread while the translator is
    /// in use. It must not call back into the translator, nor into
    /// the `global` module when installed on the default translator: the
    /// engine is not reentrant and the default translator's lock would
    /// deadlock.
    pub fn register_log_callback(&self, callback: Option<LogFn>) -> Result<()> {
        self.log.register(&self.engine, callback)
    }

    pub fn set_log_level(&self, level: LogSeverity) {
        self.engine.set_log_level(level.level());
    }

    /// Direct engine log output to `path`.
    pub fn log_file(&self, path: &Path) -> Result<()> {
        let path = path.to_str().ok_or_else(|| BridgeError::Config {
            detail: format!("log file path is not UTF-8: {}", path.display()),
        })?;
        self.engine.log_file(path);
        Ok(())
    }

    pub fn version(&self) -> String {
        self.engine.version()
    }

    pub fn char_size(&self) -> usize {
        self.engine.char_size()
    }

    /// Whether `table` compiles cleanly.
    pub fn check_table(&self, table: TableName) -> Result<bool> {
        self.ensure_tables_loaded()?;
        Ok(self.engine.check_table(table.file_name()))
    }

    /// Compile `table` into the engine's cache.
    pub fn get_table(&self, table: TableName) -> Result<bool> {
        self.ensure_tables_loaded()?;
        Ok(self.engine.get_table(table.file_name()))
    }

    /// Add a rule to a compiled table for the rest of the process.
    pub fn compile_string(&self, table: TableName, rule: &str) -> Result<bool> {
        self.ensure_tables_loaded()?;
        Ok(self.engine.compile_string(table.file_name(), rule))
    }

    /// Drop the engine's compiled tables. They recompile on next use; the
    /// files stay provisioned.
    pub fn free_tables(&self) {
        self.engine.free();
    }
}

impl<E: Engine> Drop for Translator<E> {
    fn drop(&mut self) {
        if let Err(e) = self.log.unregister(&self.engine) {
            log::warn!("failed to unregister engine log callback: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use braille_codec::is_braille_pattern;

    use super::*;
    use crate::engine::fake::FakeEngine;
    use crate::tables::{test_bundle, TABLE_FILES};

    const GREETING: &str = "Hello, World!";

    fn translator() -> Translator<FakeEngine> {
        Translator::new(FakeEngine::new(), test_bundle())
    }

    fn options(contracted: bool, mode: BrailleMode) -> Option<BrailleOptions> {
        Some(BrailleOptions { mode, contracted })
    }

    #[test]
    fn contracted_brf() {
        let t = translator();
        assert_eq!(t.to_braille(GREETING, options(true, BrailleMode::Brf)), ",hello1 ,_w6");
    }

    #[test]
    fn contracted_unicode() {
        let t = translator();
        assert_eq!(
            t.to_braille(GREETING, options(true, BrailleMode::Unicode)),
            "⠠⠓⠑⠇⠇⠕⠂⠀⠠⠸⠺⠖"
        );
    }

    #[test]
    fn uncontracted_brf() {
        let t = translator();
        assert_eq!(
            t.to_braille(GREETING, options(false, BrailleMode::Brf)),
            ",hello1 ,world6"
        );
    }

    #[test]
    fn uncontracted_unicode() {
        let t = translator();
        assert_eq!(
            t.to_braille(GREETING, options(false, BrailleMode::Unicode)),
            "⠠⠓⠑⠇⠇⠕⠂⠀⠠⠺⠕⠗⠇⠙⠖"
        );
    }

    #[test]
    fn defaults_are_contracted_brf() {
        let t = translator();
        assert_eq!(t.to_braille(GREETING, None), ",hello1 ,_w6");
    }

    #[test]
    fn uncontracted_brf_has_no_pattern_glyphs() {
        let t = translator();
        for text in [GREETING, "and the world", "Quiet. Please?", "x"] {
            let brf = t.to_braille(text, options(false, BrailleMode::Brf));
            assert!(!brf.is_empty());
            assert!(!brf.chars().any(is_braille_pattern), "{brf:?}");
        }
    }

    #[test]
    fn unicode_output_is_deterministic() {
        let t = translator();
        for contracted in [true, false] {
            let a = t.to_braille(GREETING, options(contracted, BrailleMode::Unicode));
            let b = t.to_braille(GREETING, options(contracted, BrailleMode::Unicode));
            assert_eq!(a, b);
        }
    }

    #[test]
    fn empty_input_never_reaches_the_engine() {
        let t = translator();
        assert_eq!(t.to_braille("", None), "");
        assert_eq!(t.translate_string(TableName::Grade2, "", false).unwrap(), None);
        assert_eq!(t.engine().translate_calls(), 0);
        assert_eq!(t.engine().total_allocations(), 0);
        assert!(!t.tables_loaded());
    }

    #[test]
    fn engine_failure_degrades_to_empty_string() {
        let t = translator();
        t.engine().fail_translations(true);
        assert_eq!(t.to_braille(GREETING, None), "");
        assert_eq!(t.translate_string(TableName::Grade1, GREETING, false).unwrap(), None);
        assert_eq!(t.engine().live_allocations(), 0);
    }

    #[test]
    fn allocation_failure_is_an_error() {
        let t = translator();
        t.engine().fail_allocations(true);
        assert!(t.translate_string(TableName::Grade1, GREETING, false).is_err());
        assert!(t.tables_loaded());
        assert_eq!(t.to_braille(GREETING, None), "");
    }

    #[test]
    fn provisioning_failure_is_fatal() {
        let t = translator();
        t.engine().fail_file_writes(true);
        assert!(matches!(t.initialize(), Err(BridgeError::Provisioning { .. })));
        assert!(!t.tables_loaded());
        assert_eq!(t.to_braille(GREETING, None), "");
        assert_eq!(t.engine().translate_calls(), 0);
    }

    #[test]
    fn back_translation() {
        let t = translator();
        let text = t
            .translate_string(TableName::Grade2, ",hello1 ,_w6", true)
            .unwrap();
        assert_eq!(text.as_deref(), Some(GREETING));
    }

    #[test]
    fn repeated_translations_do_not_leak() {
        let t = translator();
        for i in 0..500 {
            let out = t.to_braille(&format!("Hello {i}, World!"), None);
            assert!(!out.is_empty());
            assert_eq!(t.engine().live_allocations(), 0);
        }
    }

    #[test]
    fn tables_are_written_once_across_calls() {
        let t = translator();
        t.to_braille(GREETING, None);
        t.to_braille(GREETING, options(false, BrailleMode::Unicode));
        t.initialize().unwrap();
        assert_eq!(t.engine().file_writes(), TABLE_FILES.len());
    }

    #[test]
    fn release_failure_still_returns_result() {
        let t = translator();
        t.engine().fail_releases(true);
        assert_eq!(t.to_braille(GREETING, None), ",hello1 ,_w6");
        assert!(t.engine().live_allocations() > 0);
    }

    #[test]
    fn output_longer_than_input_is_not_truncated() {
        let t = translator();
        let text = "A B C D E F G H";
        let brf = t.to_braille(text, options(false, BrailleMode::Brf));
        assert_eq!(brf, ",a ,b ,c ,d ,e ,f ,g ,h");
        assert_eq!(t.engine().live_allocations(), 0);
    }

    #[test]
    fn output_stops_growing_after_last_attempt() {
        let t = translator();
        t.engine().set_expansion(20);
        // 5 code units of input capacity, doubled three times.
        let out = t.translate_string(TableName::Grade1, "abcd", false).unwrap().unwrap();
        assert_eq!(out.chars().count(), 40);
        assert_eq!(out, "a".repeat(20) + &"b".repeat(20));
        assert_eq!(t.engine().translate_calls(), MAX_OUTPUT_ATTEMPTS as usize);
        assert_eq!(t.engine().live_allocations(), 0);
    }

    #[test]
    fn one_request_makes_four_allocations() {
        let t = translator();
        t.to_braille(GREETING, None);
        let before = t.engine().total_allocations();
        t.to_braille("and", None);
        // Input, input length, output, output length.
        assert_eq!(t.engine().total_allocations() - before, 4);
        assert_eq!(t.engine().live_allocations(), 0);
    }

    #[test]
    fn rejects_narrow_engines() {
        let t = translator();
        t.engine().set_char_size(2);
        assert!(matches!(
            t.initialize(),
            Err(BridgeError::UnsupportedCharSize { size: 2 })
        ));
    }

    #[test]
    fn configure_applies_engine_settings() {
        let t = translator();
        let config = EngineConfig {
            log_level: Some(LogSeverity::Warn),
            log_file: Some("louis.log".into()),
        };
        t.configure(&config).unwrap();
        t.configure(&config).unwrap();
        assert_eq!(t.engine().log_level(), Some(30000));
        assert_eq!(t.engine().logged_to().as_deref(), Some("louis.log"));
        assert_eq!(t.engine().live_functions(), 1);
    }

    #[test]
    fn table_pass_throughs() {
        let t = translator();
        assert!(t.check_table(TableName::Grade1).unwrap());
        assert!(t.get_table(TableName::Grade2).unwrap());
        assert!(t.compile_string(TableName::Grade2, "always teh the").unwrap());
        assert!(!t.compile_string(TableName::Grade2, "  ").unwrap());
        assert_eq!(t.engine().compiled_rules(), vec!["always teh the".to_string()]);
        t.free_tables();
        assert_eq!(t.engine().frees(), 1);
        assert_eq!(t.char_size(), 4);
        assert!(t.version().contains("3.29"));
    }

    #[test]
    fn table_names() {
        assert_eq!("grade-1".parse::<TableName>().unwrap(), TableName::Grade1);
        assert_eq!(TableName::parse("en-ueb-g2.ctb"), Some(TableName::Grade2));
        assert!("grade-3".parse::<TableName>().is_err());
        assert_eq!(TableName::for_contracted(true).file_name(), "en-ueb-g2.ctb");
        assert_eq!(TableName::Grade1.to_string(), "grade-1");
    }
}
