//! Braille translation over the liblouis engine.
//!
//! The bridge drives a foreign translation engine through raw memory:
//! text is marshaled into engine-owned buffers as 4-byte code units, the
//! engine translates with one of two bundled English UEB tables, and the
//! result is decoded and every buffer released before returning.
//!
//! - [`Translator`] binds the service to any [`engine::Engine`].
//! - With the `liblouis` feature, [`to_braille`] and [`translate_string`]
//!   use a process-wide translator over the native library.
//! - [`brf_to_unicode`] converts Braille ASCII to Unicode Braille and needs
//!   no engine at all.

pub mod config;
pub mod engine;
pub mod error;
#[cfg(feature = "liblouis")]
pub mod global;
pub mod log_bridge;
pub mod memory;
pub mod tables;
pub mod translate;

pub use braille_codec::{brf_to_unicode, unicode_to_brf, BrailleMode};
pub use config::BridgeConfig;
pub use error::{BridgeError, Result};
#[cfg(feature = "liblouis")]
pub use global::{open_translator, to_braille, translate_string};
pub use log_bridge::LogSeverity;
pub use tables::TableBundle;
pub use translate::{BrailleOptions, TableName, TranslationRequest, Translator};

/// Whether native liblouis support was compiled in.
pub const LIBLOUIS_AVAILABLE: bool = cfg!(feature = "liblouis");
