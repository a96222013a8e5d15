//! Host-allocated foreign memory for native engines.
//!
//! Native liblouis reads and writes plain process memory, so its "foreign"
//! buffers come from the global allocator. [`HostHeap`] tracks every live
//! block and bounds-checks each access, including the spans a translate
//! call hands to the engine.

use std::alloc::{alloc_zeroed, dealloc, Layout};
use std::collections::HashMap;

use parking_lot::Mutex;

use super::{ForeignPtr, TranslateCall};
use crate::error::{BridgeError, Result};

const UNIT: usize = 4;

/// Live allocations by base address.
#[derive(Debug, Default)]
pub struct HostHeap {
    blocks: Mutex<HashMap<usize, Layout>>,
}

impl HostHeap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn live_blocks(&self) -> usize {
        self.blocks.lock().len()
    }

    /// Check that `[ptr, ptr + bytes)` is 4-byte aligned and lies within
    /// one live allocation.
    pub fn check_range(&self, ptr: ForeignPtr, bytes: usize) -> Result<()> {
        let address = ptr.address();
        let invalid = BridgeError::InvalidPointer { address };
        if address % UNIT != 0 {
            return Err(invalid);
        }
        let end = address.checked_add(bytes).ok_or(BridgeError::InvalidPointer { address })?;
        let inside = self
            .blocks
            .lock()
            .iter()
            .any(|(&base, layout)| address >= base && end <= base + layout.size());
        if inside {
            Ok(())
        } else {
            Err(invalid)
        }
    }

    /// Validate every span the engine will touch during `call`: both
    /// length cells, `input_len` units of input and `output_len` units of
    /// output.
    pub fn check_call(&self, call: &TranslateCall<'_>) -> Result<()> {
        let input_units = self.read_length(call.input_len)?;
        let output_units = self.read_length(call.output_len)?;
        self.check_range(call.input, span(call.input, input_units)?)?;
        self.check_range(call.output, span(call.output, output_units)?)?;
        Ok(())
    }

    fn read_length(&self, cell: ForeignPtr) -> Result<usize> {
        let value = self.read_cell(cell)?;
        usize::try_from(value).map_err(|_| BridgeError::InvalidLength {
            address: cell.address(),
            value,
        })
    }

    pub fn alloc(&self, bytes: usize) -> Result<ForeignPtr> {
        let layout = Layout::from_size_align(bytes.max(UNIT), UNIT)
            .map_err(|_| BridgeError::AllocationFailed { bytes })?;
        // SAFETY: layout has non-zero size.
        let ptr = unsafe { alloc_zeroed(layout) };
        if ptr.is_null() {
            return Err(BridgeError::AllocationFailed { bytes });
        }
        self.blocks.lock().insert(ptr as usize, layout);
        Ok(ForeignPtr::new(ptr as usize))
    }

    pub fn release(&self, ptr: ForeignPtr) -> Result<()> {
        let layout = self
            .blocks
            .lock()
            .remove(&ptr.address())
            .ok_or_else(|| BridgeError::ReleaseFailed {
                address: ptr.address(),
                detail: "not a live allocation".to_string(),
            })?;
        // SAFETY: the pointer was produced by `alloc` with this layout.
        unsafe { dealloc(ptr.address() as *mut u8, layout) };
        Ok(())
    }

    pub fn write_units(&self, ptr: ForeignPtr, units: &[u32]) -> Result<()> {
        self.check_range(ptr, span(ptr, units.len())?)?;
        // SAFETY: range and alignment checked above.
        unsafe {
            std::ptr::copy_nonoverlapping(units.as_ptr(), ptr.address() as *mut u32, units.len());
        }
        Ok(())
    }

    pub fn read_units(&self, ptr: ForeignPtr, count: usize) -> Result<Vec<u32>> {
        self.check_range(ptr, span(ptr, count)?)?;
        // SAFETY: range and alignment checked above.
        let units = unsafe { std::slice::from_raw_parts(ptr.address() as *const u32, count) };
        Ok(units.to_vec())
    }

    pub fn read_cell(&self, ptr: ForeignPtr) -> Result<i32> {
        self.check_range(ptr, UNIT)?;
        // SAFETY: range and alignment checked above.
        Ok(unsafe { std::ptr::read(ptr.address() as *const i32) })
    }

    pub fn write_cell(&self, ptr: ForeignPtr, value: i32) -> Result<()> {
        self.check_range(ptr, UNIT)?;
        // SAFETY: range and alignment checked above.
        unsafe { std::ptr::write(ptr.address() as *mut i32, value) };
        Ok(())
    }
}

impl Drop for HostHeap {
    fn drop(&mut self) {
        for (address, layout) in self.blocks.get_mut().drain() {
            // SAFETY: address/layout pairs come from `alloc` and were not released.
            unsafe { dealloc(address as *mut u8, layout) };
        }
    }
}

/// Byte length of `units` code units at `ptr`.
fn span(ptr: ForeignPtr, units: usize) -> Result<usize> {
    units.checked_mul(UNIT).ok_or(BridgeError::InvalidPointer {
        address: ptr.address(),
    })
}
