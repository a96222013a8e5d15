//! Native liblouis backend (feature-gated).
//!
//! All code in this module requires the `liblouis` feature flag and a
//! liblouis build with 4-byte `widechar` (`--enable-ucs4`).
//!
//! liblouis keeps its state in process globals: the compiled table cache,
//! the data path and the log callback, so only one [`LibLouis`] handle may
//! exist at a time.

use std::cell::Cell;
use std::collections::HashMap;
use std::ffi::{CStr, CString};
use std::marker::PhantomData;
use std::os::raw::{c_char, c_int};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use once_cell::sync::Lazy;
use parking_lot::Mutex;

use super::heap::HostHeap;
use super::{Engine, ForeignPtr, FunctionHandle, LogFn, TranslateCall};
use crate::error::{BridgeError, Result};

mod sys {
    use std::os::raw::{c_char, c_int, c_void};

    pub type LogCallback = unsafe extern "C" fn(level: c_int, message: *const c_char);

    #[link(name = "louis")]
    extern "C" {
        pub fn lou_version() -> *const c_char;
        pub fn lou_setLogLevel(level: c_int);
        pub fn lou_getTable(table_list: *const c_char) -> *const c_void;
        pub fn lou_checkTable(table_list: *const c_char) -> c_int;
        pub fn lou_free();
        pub fn lou_charSize() -> c_int;
        pub fn lou_logFile(file_name: *const c_char);
        pub fn lou_registerLogCallback(callback: Option<LogCallback>);
        pub fn lou_compileString(table_list: *const c_char, in_string: *const c_char) -> c_int;
        pub fn lou_setDataPath(path: *const c_char) -> *mut c_char;
        pub fn lou_translateString(
            table_list: *const c_char,
            inbuf: *const u32,
            inlen: *mut c_int,
            outbuf: *mut u32,
            outlen: *mut c_int,
            typeform: *mut u16,
            spacing: *mut c_char,
            mode: c_int,
        ) -> c_int;
        pub fn lou_backTranslateString(
            table_list: *const c_char,
            inbuf: *const u32,
            inlen: *mut c_int,
            outbuf: *mut u32,
            outlen: *mut c_int,
            typeform: *mut u16,
            spacing: *mut c_char,
            mode: c_int,
        ) -> c_int;
    }
}

/// Host functions installed for liblouis to call.
///
/// liblouis' callback carries no user data, so the trampoline dispatches
/// to whichever slot is currently active.
#[derive(Default)]
struct FunctionSlots {
    next: u32,
    functions: HashMap<u32, LogFn>,
    active: Option<u32>,
}

static SLOTS: Lazy<Mutex<FunctionSlots>> = Lazy::new(|| Mutex::new(FunctionSlots::default()));

unsafe extern "C" fn log_trampoline(level: c_int, message: *const c_char) {
    let function = {
        let slots = SLOTS.lock();
        slots.active.and_then(|slot| slots.functions.get(&slot).cloned())
    };
    let Some(function) = function else {
        return;
    };
    let message = if message.is_null() {
        String::new()
    } else {
        // SAFETY: liblouis passes a NUL-terminated string valid for the call.
        CStr::from_ptr(message).to_string_lossy().into_owned()
    };
    // Unwinding into C is undefined behavior.
    let _ = catch_unwind(AssertUnwindSafe(|| function(level, &message)));
}

fn c_string(s: &str) -> Option<CString> {
    CString::new(s).ok()
}

/// Set while a [`LibLouis`] handle exists.
static OPEN: AtomicBool = AtomicBool::new(false);

/// Handle to the process-wide liblouis instance.
///
/// At most one handle exists at a time. It is `Send` but not `Sync`:
/// liblouis is not reentrant, so calls go through a single owner.
pub struct LibLouis {
    data_dir: PathBuf,
    heap: HostHeap,
    _not_sync: PhantomData<Cell<()>>,
}

impl LibLouis {
    /// Point liblouis at `data_dir`. Tables are resolved from
    /// `<data_dir>/liblouis/tables`.
    ///
    /// Fails with [`BridgeError::AlreadyOpen`] while another handle is alive.
    pub fn new(data_dir: &Path) -> Result<Self> {
        let path = data_dir.to_str().ok_or_else(|| BridgeError::Config {
            detail: format!("data directory is not UTF-8: {}", data_dir.display()),
        })?;
        let path = c_string(path).ok_or_else(|| BridgeError::Config {
            detail: format!("data directory contains NUL: {}", data_dir.display()),
        })?;
        OPEN.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| BridgeError::AlreadyOpen)?;
        // SAFETY: liblouis copies the path into its own buffer.
        unsafe { sys::lou_setDataPath(path.as_ptr()) };
        Ok(LibLouis {
            data_dir: data_dir.to_path_buf(),
            heap: HostHeap::new(),
            _not_sync: PhantomData,
        })
    }

    /// Engine storage root.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn run(&self, call: &TranslateCall<'_>, backward: bool) -> bool {
        let Some(table) = c_string(call.table) else {
            return false;
        };
        if let Err(e) = self.heap.check_call(call) {
            log::error!("rejected liblouis call on {}: {e}", call.table);
            return false;
        }
        let entry = if backward {
            sys::lou_backTranslateString
        } else {
            sys::lou_translateString
        };
        // SAFETY: `check_call` verified that both length cells are live and
        // non-negative and that the input and output buffers hold at least
        // as many code units as their cells state.
        let status = unsafe {
            entry(
                table.as_ptr(),
                call.input.address() as *const u32,
                call.input_len.address() as *mut c_int,
                call.output.address() as *mut u32,
                call.output_len.address() as *mut c_int,
                std::ptr::null_mut(),
                std::ptr::null_mut(),
                call.mode,
            )
        };
        status != 0
    }
}

impl Drop for LibLouis {
    fn drop(&mut self) {
        SLOTS.lock().active = None;
        // SAFETY: no other handle exists, so nothing else is inside liblouis.
        unsafe {
            sys::lou_registerLogCallback(None);
            sys::lou_free();
        }
        OPEN.store(false, Ordering::Release);
    }
}

impl Engine for LibLouis {
    fn version(&self) -> String {
        // SAFETY: returns a pointer to a static NUL-terminated string.
        let version = unsafe { sys::lou_version() };
        if version.is_null() {
            return String::new();
        }
        unsafe { CStr::from_ptr(version) }.to_string_lossy().into_owned()
    }

    fn set_log_level(&self, level: i32) {
        unsafe { sys::lou_setLogLevel(level) };
    }

    fn get_table(&self, table: &str) -> bool {
        match c_string(table) {
            Some(table) => !unsafe { sys::lou_getTable(table.as_ptr()) }.is_null(),
            None => false,
        }
    }

    fn check_table(&self, table: &str) -> bool {
        match c_string(table) {
            Some(table) => unsafe { sys::lou_checkTable(table.as_ptr()) } != 0,
            None => false,
        }
    }

    fn free(&self) {
        unsafe { sys::lou_free() };
    }

    fn char_size(&self) -> usize {
        unsafe { sys::lou_charSize() }.max(0) as usize
    }

    fn log_file(&self, path: &str) {
        if let Some(path) = c_string(path) {
            unsafe { sys::lou_logFile(path.as_ptr()) };
        }
    }

    fn register_log_callback(&self, handle: Option<FunctionHandle>) {
        SLOTS.lock().active = handle.map(FunctionHandle::slot);
        let callback: Option<sys::LogCallback> = handle.map(|_| log_trampoline as sys::LogCallback);
        unsafe { sys::lou_registerLogCallback(callback) };
    }

    fn compile_string(&self, table: &str, rule: &str) -> bool {
        match (c_string(table), c_string(rule)) {
            (Some(table), Some(rule)) => {
                unsafe { sys::lou_compileString(table.as_ptr(), rule.as_ptr()) } != 0
            }
            _ => false,
        }
    }

    fn translate_string(&self, call: &TranslateCall<'_>) -> bool {
        self.run(call, false)
    }

    fn back_translate_string(&self, call: &TranslateCall<'_>) -> bool {
        self.run(call, true)
    }

    fn alloc(&self, bytes: usize) -> Result<ForeignPtr> {
        self.heap.alloc(bytes)
    }

    fn release(&self, ptr: ForeignPtr) -> Result<()> {
        self.heap.release(ptr)
    }

    fn write_units(&self, ptr: ForeignPtr, units: &[u32]) -> Result<()> {
        self.heap.write_units(ptr, units)
    }

    fn read_units(&self, ptr: ForeignPtr, count: usize) -> Result<Vec<u32>> {
        self.heap.read_units(ptr, count)
    }

    fn read_cell(&self, ptr: ForeignPtr) -> Result<i32> {
        self.heap.read_cell(ptr)
    }

    fn write_cell(&self, ptr: ForeignPtr, value: i32) -> Result<()> {
        self.heap.write_cell(ptr, value)
    }

    fn add_function(&self, function: LogFn) -> Result<FunctionHandle> {
        let mut slots = SLOTS.lock();
        slots.next = slots.next.checked_add(1).ok_or_else(|| BridgeError::FunctionSlot {
            detail: "function slots exhausted".to_string(),
        })?;
        let slot = slots.next;
        slots.functions.insert(slot, function);
        Ok(FunctionHandle::new(slot))
    }

    fn remove_function(&self, handle: FunctionHandle) -> Result<()> {
        let mut slots = SLOTS.lock();
        if slots.active == Some(handle.slot()) {
            slots.active = None;
        }
        slots
            .functions
            .remove(&handle.slot())
            .map(|_| ())
            .ok_or_else(|| BridgeError::FunctionSlot {
                detail: format!("slot {} is not in use", handle.slot()),
            })
    }

    fn table_dir(&self) -> PathBuf {
        self.data_dir.join("liblouis").join("tables")
    }

    fn make_dir_all(&self, path: &Path) -> Result<()> {
        Ok(std::fs::create_dir_all(path)?)
    }

    fn write_file(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        Ok(std::fs::write(path, bytes)?)
    }
}

/// Serializes tests that open the engine.
#[cfg(test)]
pub(crate) static ENGINE_TEST_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));
