//! The foreign translation engine contract.
//!
//! [`Engine`] mirrors the liblouis C API one call at a time, plus the raw
//! memory, function-slot and storage primitives a host needs to drive it.
//! Everything above this trait (memory marshaling, provisioning, the
//! translation service) is engine-agnostic.

#[cfg(test)]
pub mod fake;
pub mod heap;
#[cfg(feature = "liblouis")]
pub mod liblouis;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::Result;

/// An address in the engine's memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ForeignPtr(usize);

impl ForeignPtr {
    /// The null pointer.
    pub const NULL: ForeignPtr = ForeignPtr(0);

    /// Wrap a raw address.
    pub fn new(address: usize) -> Self {
        ForeignPtr(address)
    }

    /// The raw address.
    pub fn address(self) -> usize {
        self.0
    }

    pub fn is_null(self) -> bool {
        self.0 == 0
    }

    /// The address `bytes` past this one.
    pub fn offset(self, bytes: usize) -> Self {
        ForeignPtr(self.0 + bytes)
    }
}

impl std::fmt::Display for ForeignPtr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Handle to a host function installed in an engine function slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FunctionHandle(u32);

impl FunctionHandle {
    pub fn new(slot: u32) -> Self {
        FunctionHandle(slot)
    }

    pub fn slot(self) -> u32 {
        self.0
    }
}

/// A log sink the engine calls with `(level, message)`.
pub type LogFn = Arc<dyn Fn(i32, &str) + Send + Sync>;

/// Arguments of a `lou_translateString` / `lou_backTranslateString` call.
///
/// `input_len` and `output_len` point at 4-byte integer cells. The engine
/// reads the output capacity from `output_len` and overwrites it with the
/// number of code units actually written.
#[derive(Debug, Clone, Copy)]
pub struct TranslateCall<'a> {
    /// Table list, e.g. `en-ueb-g2.ctb`.
    pub table: &'a str,
    pub input: ForeignPtr,
    pub input_len: ForeignPtr,
    pub output: ForeignPtr,
    pub output_len: ForeignPtr,
    /// Engine mode flags. The bridge always passes 0.
    pub mode: i32,
}

/// A Braille translation engine reached through foreign memory.
///
/// Methods take `&self`: an engine is a single global resource and the
/// translation service holds several buffers into it at once. Engines are
/// not reentrant; callers serialize access.
pub trait Engine {
    /// Engine version string.
    fn version(&self) -> String;

    /// Set the engine's log threshold.
    fn set_log_level(&self, level: i32);

    /// Compile and cache a table list. Returns whether it resolved.
    fn get_table(&self, table: &str) -> bool;

    /// Whether a table list compiles without errors.
    fn check_table(&self, table: &str) -> bool;

    /// Drop every compiled table held by the engine.
    fn free(&self);

    /// Width in bytes of one engine character.
    fn char_size(&self) -> usize;

    /// Direct engine log output to a file.
    fn log_file(&self, path: &str);

    /// Install (or with `None`, clear) the engine's log callback.
    fn register_log_callback(&self, handle: Option<FunctionHandle>);

    /// Add a single rule to a compiled table.
    fn compile_string(&self, table: &str, rule: &str) -> bool;

    /// Forward translation. Returns `false` when the engine reports failure.
    fn translate_string(&self, call: &TranslateCall<'_>) -> bool;

    /// Back-translation. Returns `false` when the engine reports failure.
    fn back_translate_string(&self, call: &TranslateCall<'_>) -> bool;

    // --- memory ---

    /// Allocate `bytes` of zeroed engine memory.
    fn alloc(&self, bytes: usize) -> Result<ForeignPtr>;

    /// Release an allocation returned by [`Engine::alloc`].
    fn release(&self, ptr: ForeignPtr) -> Result<()>;

    /// Store 4-byte code units starting at `ptr`.
    fn write_units(&self, ptr: ForeignPtr, units: &[u32]) -> Result<()>;

    /// Load `count` 4-byte code units starting at `ptr`.
    fn read_units(&self, ptr: ForeignPtr, count: usize) -> Result<Vec<u32>>;

    /// Load a 4-byte integer cell.
    fn read_cell(&self, ptr: ForeignPtr) -> Result<i32>;

    /// Store a 4-byte integer cell.
    fn write_cell(&self, ptr: ForeignPtr, value: i32) -> Result<()>;

    // --- function slots ---

    /// Install a host function in a fresh slot.
    fn add_function(&self, function: LogFn) -> Result<FunctionHandle>;

    /// Release a slot returned by [`Engine::add_function`].
    fn remove_function(&self, handle: FunctionHandle) -> Result<()>;

    // --- storage ---

    /// Directory the engine resolves table names against.
    fn table_dir(&self) -> PathBuf;

    /// Create a directory and its parents in engine storage.
    fn make_dir_all(&self, path: &Path) -> Result<()>;

    /// Write a file in engine storage.
    fn write_file(&self, path: &Path, bytes: &[u8]) -> Result<()>;
}
