//! Bridge error types.

use std::path::PathBuf;

/// Errors that can occur while driving the translation engine.
///
/// A translation the engine itself rejects is not an error: it surfaces as
/// `Ok(None)` from [`crate::Translator::translate`].
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// The engine could not satisfy a foreign allocation.
    #[error("foreign allocation of {bytes} bytes failed")]
    AllocationFailed { bytes: usize },

    /// Releasing a foreign allocation failed. Callers log this and move on.
    #[error("failed to release foreign allocation at {address:#x}: {detail}")]
    ReleaseFailed { address: usize, detail: String },

    /// A pointer did not refer to a live allocation of sufficient size.
    #[error("invalid foreign pointer {address:#x}")]
    InvalidPointer { address: usize },

    /// A length cell held a negative count.
    #[error("invalid length {value} in cell at {address:#x}")]
    InvalidLength { address: usize, value: i32 },

    /// The native engine is a process singleton and already has an owner.
    #[error("liblouis is already open in this process")]
    AlreadyOpen,

    /// Writing table assets into engine storage failed.
    #[error("table provisioning failed at {path}: {detail}")]
    Provisioning { path: PathBuf, detail: String },

    /// The linked engine does not use 4-byte code units.
    #[error("engine uses {size}-byte characters; 4-byte characters are required")]
    UnsupportedCharSize { size: usize },

    /// A table name that is not one of the bundled grades.
    #[error("unknown table: {name}")]
    UnknownTable { name: String },

    /// Adding or removing an engine function slot failed.
    #[error("function slot error: {detail}")]
    FunctionSlot { detail: String },

    /// Invalid configuration value.
    #[error("invalid configuration: {detail}")]
    Config { detail: String },

    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for bridge operations.
pub type Result<T> = std::result::Result<T, BridgeError>;
