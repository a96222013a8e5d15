//! Marshaling strings across the foreign-memory boundary.
//!
//! The engine works on fixed-width 4-byte code units (one Unicode scalar
//! per unit, NUL-terminated). This module encodes host strings into engine
//! allocations and decodes engine output back into `String`s.
//!
//! Every allocation is owned by a [`ForeignBuffer`] guard that releases it
//! on drop, so no exit path can forget a `release`.

use crate::engine::{Engine, ForeignPtr};
use crate::error::{BridgeError, Result};

/// Width of one engine code unit in bytes.
pub const CODE_UNIT_BYTES: usize = 4;

/// An owned allocation in engine memory.
///
/// Dropping the guard releases the allocation. A failed release is logged
/// as a warning and the allocation is leaked; it never aborts the caller.
pub struct ForeignBuffer<'e, E: Engine + ?Sized> {
    engine: &'e E,
    ptr: ForeignPtr,
    bytes: usize,
}

impl<'e, E: Engine + ?Sized> ForeignBuffer<'e, E> {
    /// Allocate `bytes` of engine memory.
    pub fn alloc(engine: &'e E, bytes: usize) -> Result<Self> {
        let ptr = engine.alloc(bytes)?;
        Ok(ForeignBuffer { engine, ptr, bytes })
    }

    /// Allocate a single 4-byte integer cell holding `value`.
    pub fn cell(engine: &'e E, value: i32) -> Result<Self> {
        let buffer = Self::alloc(engine, CODE_UNIT_BYTES)?;
        buffer.write_cell(value)?;
        Ok(buffer)
    }

    pub fn ptr(&self) -> ForeignPtr {
        self.ptr
    }

    /// Capacity in bytes.
    pub fn byte_len(&self) -> usize {
        self.bytes
    }

    /// Capacity in 4-byte code units.
    pub fn capacity_units(&self) -> usize {
        self.bytes / CODE_UNIT_BYTES
    }

    /// Read this buffer as an integer cell.
    pub fn read_cell(&self) -> Result<i32> {
        self.engine.read_cell(self.ptr)
    }

    /// Overwrite this buffer as an integer cell.
    pub fn write_cell(&self, value: i32) -> Result<()> {
        self.engine.write_cell(self.ptr, value)
    }
}

impl<E: Engine + ?Sized> Drop for ForeignBuffer<'_, E> {
    fn drop(&mut self) {
        if let Err(e) = self.engine.release(self.ptr) {
            log::warn!("failed to free memory during Braille translation: {e}");
        }
    }
}

impl<E: Engine + ?Sized> std::fmt::Debug for ForeignBuffer<'_, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ForeignBuffer")
            .field("ptr", &self.ptr)
            .field("bytes", &self.bytes)
            .finish()
    }
}

/// Byte length needed to hold `text` plus its NUL terminator.
pub fn buffer_len(text: &str) -> usize {
    (text.chars().count() + 1) * CODE_UNIT_BYTES
}

/// Encode `text` as NUL-terminated 4-byte code units.
pub fn encode_units(text: &str) -> Vec<u32> {
    text.chars().map(u32::from).chain(std::iter::once(0)).collect()
}

/// Copy `text` into a fresh engine allocation.
pub fn transfer<'e, E: Engine + ?Sized>(engine: &'e E, text: &str) -> Result<ForeignBuffer<'e, E>> {
    let buffer = ForeignBuffer::alloc(engine, buffer_len(text))?;
    engine.write_units(buffer.ptr(), &encode_units(text))?;
    Ok(buffer)
}

/// Read code units out of engine memory.
///
/// With a length cell, exactly as many units as the cell holds are read;
/// the engine may have written back fewer units than the buffer's capacity.
/// Without one, `ptr` is read as a NUL-terminated string.
pub fn read<E: Engine + ?Sized>(
    engine: &E,
    ptr: ForeignPtr,
    len_ptr: Option<ForeignPtr>,
) -> Result<Vec<u32>> {
    match len_ptr.filter(|p| !p.is_null()) {
        Some(len_ptr) => {
            let count = engine.read_cell(len_ptr)?;
            let count = usize::try_from(count)
                .map_err(|_| BridgeError::InvalidPointer { address: len_ptr.address() })?;
            engine.read_units(ptr, count)
        }
        None => {
            let mut units = Vec::new();
            loop {
                let offset = units.len() * CODE_UNIT_BYTES;
                let unit = engine.read_units(ptr.offset(offset), 1)?[0];
                if unit == 0 {
                    break;
                }
                units.push(unit);
            }
            Ok(units)
        }
    }
}

/// Reassemble 32-bit code points into a `String`.
///
/// Code points at or above U+10000 are split into a UTF-16 surrogate pair,
/// lower ones map one-to-one. Lone surrogates and out-of-range values
/// decode to U+FFFD.
pub fn decode_code_units(units: &[u32]) -> String {
    let mut utf16 = Vec::with_capacity(units.len());
    for &unit in units {
        if unit > 0x10FFFF {
            utf16.push(0xFFFD);
        } else if unit >= 0x10000 {
            let ch = unit - 0x10000;
            utf16.push((0xD800 | (ch >> 10)) as u16);
            utf16.push((0xDC00 | (ch & 0x3FF)) as u16);
        } else {
            utf16.push(unit as u16);
        }
    }
    String::from_utf16_lossy(&utf16)
}
