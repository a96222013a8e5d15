//! In-process stand-in for the native engine, used by the unit tests.
//!
//! Simulates a byte-addressed heap, function slots and a virtual
//! filesystem, and implements a toy English grade-1/grade-2 translation
//! that only succeeds once its table file has been provisioned.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use super::{Engine, ForeignPtr, FunctionHandle, LogFn, TranslateCall};
use crate::error::{BridgeError, Result};

const HEAP_BASE: usize = 0x1000;
const TABLE_DIR: &str = "/usr/local/share/liblouis/tables";

/// Whole-word contractions understood by the grade-2 table.
const CONTRACTIONS: &[(&str, &str)] = &[("world", "_w"), ("and", "&")];

#[derive(Default)]
struct State {
    heap: BTreeMap<usize, Vec<u8>>,
    next_address: usize,
    allocs: usize,
    releases: usize,
    fail_alloc: bool,
    fail_release: bool,
    fail_translate: bool,
    fail_write: bool,

    slots: HashMap<u32, LogFn>,
    next_slot: u32,
    active_callback: Option<FunctionHandle>,

    dirs: BTreeSet<PathBuf>,
    files: BTreeMap<PathBuf, Vec<u8>>,
    file_writes: usize,

    translate_calls: usize,
    log_level: Option<i32>,
    log_file: Option<String>,
    compiled_rules: Vec<String>,
    frees: usize,
    char_size: usize,
    expansion: usize,
}

/// Test double for [`Engine`].
pub struct FakeEngine {
    state: Mutex<State>,
}

impl Default for FakeEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeEngine {
    pub fn new() -> Self {
        FakeEngine {
            state: Mutex::new(State {
                next_address: HEAP_BASE,
                next_slot: 1,
                char_size: 4,
                expansion: 1,
                ..Default::default()
            }),
        }
    }

    pub fn live_allocations(&self) -> usize {
        self.state.lock().heap.len()
    }

    pub fn total_allocations(&self) -> usize {
        self.state.lock().allocs
    }

    pub fn live_functions(&self) -> usize {
        self.state.lock().slots.len()
    }

    pub fn active_callback(&self) -> Option<FunctionHandle> {
        self.state.lock().active_callback
    }

    pub fn file_writes(&self) -> usize {
        self.state.lock().file_writes
    }

    pub fn file(&self, path: &Path) -> Option<Vec<u8>> {
        self.state.lock().files.get(path).cloned()
    }

    pub fn has_dir(&self, path: &Path) -> bool {
        self.state.lock().dirs.contains(path)
    }

    pub fn translate_calls(&self) -> usize {
        self.state.lock().translate_calls
    }

    pub fn log_level(&self) -> Option<i32> {
        self.state.lock().log_level
    }

    pub fn logged_to(&self) -> Option<String> {
        self.state.lock().log_file.clone()
    }

    pub fn compiled_rules(&self) -> Vec<String> {
        self.state.lock().compiled_rules.clone()
    }

    pub fn frees(&self) -> usize {
        self.state.lock().frees
    }

    pub fn fail_allocations(&self, fail: bool) {
        self.state.lock().fail_alloc = fail;
    }

    pub fn fail_releases(&self, fail: bool) {
        self.state.lock().fail_release = fail;
    }

    pub fn fail_translations(&self, fail: bool) {
        self.state.lock().fail_translate = fail;
    }

    pub fn fail_file_writes(&self, fail: bool) {
        self.state.lock().fail_write = fail;
    }

    /// Repeat every output character `factor` times.
    pub fn set_expansion(&self, factor: usize) {
        self.state.lock().expansion = factor;
    }

    pub fn set_char_size(&self, size: usize) {
        self.state.lock().char_size = size;
    }

    /// Invoke the registered log callback, as the engine would.
    pub fn emit_log(&self, level: i32, message: &str) {
        let callback = {
            let state = self.state.lock();
            state
                .active_callback
                .and_then(|h| state.slots.get(&h.slot()).cloned())
        };
        if let Some(callback) = callback {
            callback(level, message);
        }
    }

    fn has_table(&self, table: &str) -> bool {
        let state = self.state.lock();
        table
            .split(',')
            .all(|name| state.files.contains_key(&Path::new(TABLE_DIR).join(name)))
    }

    fn run(&self, call: &TranslateCall<'_>, backward: bool) -> bool {
        let fail = {
            let mut state = self.state.lock();
            state.translate_calls += 1;
            state.fail_translate
        };
        if fail {
            return false;
        }
        if !self.has_table(call.table) {
            self.emit_log(40000, &format!("Cannot resolve table '{}'", call.table));
            return false;
        }
        let contracted = call.table.contains("g2");
        let expansion = self.state.lock().expansion;
        let outcome = (|| -> Result<()> {
            let in_len = usize::try_from(self.read_cell(call.input_len)?)
                .map_err(|_| BridgeError::InvalidPointer { address: call.input_len.address() })?;
            let units = self.read_units(call.input, in_len)?;
            let text: String = units.iter().filter_map(|&u| char::from_u32(u)).collect();
            let translated = if backward {
                back_translate(&text, contracted)
            } else {
                translate(&text, contracted)
            };
            let capacity = usize::try_from(self.read_cell(call.output_len)?).unwrap_or(0);
            let out: Vec<u32> = translated
                .chars()
                .flat_map(|c| std::iter::repeat(u32::from(c)).take(expansion))
                .take(capacity)
                .collect();
            self.write_units(call.output, &out)?;
            self.write_cell(call.output_len, out.len() as i32)?;
            Ok(())
        })();
        outcome.is_ok()
    }

    /// Locate the allocation holding `[address, address + len)`.
    fn locate(state: &State, ptr: ForeignPtr, len: usize) -> Result<(usize, usize)> {
        let address = ptr.address();
        let invalid = BridgeError::InvalidPointer { address };
        let (&base, block) = state.heap.range(..=address).next_back().ok_or(invalid)?;
        let start = address - base;
        if start + len > block.len() {
            return Err(BridgeError::InvalidPointer { address });
        }
        Ok((base, start))
    }
}

fn translate(text: &str, contracted: bool) -> String {
    let mut out = String::new();
    let mut word = String::new();
    for c in text.chars().chain(std::iter::once('\0')) {
        if c.is_ascii_alphabetic() {
            word.push(c);
            continue;
        }
        if !word.is_empty() {
            translate_word(&word, contracted, &mut out);
            word.clear();
        }
        match c {
            '\0' => {}
            ',' => out.push('1'),
            '!' => out.push('6'),
            '.' => out.push('4'),
            '?' => out.push('8'),
            other => out.push(other),
        }
    }
    out
}

fn translate_word(word: &str, contracted: bool, out: &mut String) {
    let lower = word.to_ascii_lowercase();
    let capital = word.starts_with(|c: char| c.is_ascii_uppercase());
    if capital {
        out.push(',');
    }
    if contracted {
        if let Some((_, cell)) = CONTRACTIONS.iter().find(|(w, _)| *w == lower) {
            out.push_str(cell);
            return;
        }
    }
    out.push_str(&lower);
}

fn back_translate(brf: &str, contracted: bool) -> String {
    let mut out = String::new();
    let mut capital = false;
    let mut rest = brf;
    while let Some(c) = rest.chars().next() {
        if contracted {
            if let Some((word, cell)) = CONTRACTIONS.iter().find(|(_, cell)| rest.starts_with(cell)) {
                push_word(&mut out, word, capital);
                capital = false;
                rest = &rest[cell.len()..];
                continue;
            }
        }
        rest = &rest[c.len_utf8()..];
        match c {
            ',' => capital = true,
            '1' => out.push(','),
            '6' => out.push('!'),
            '4' => out.push('.'),
            '8' => out.push('?'),
            letter if capital => {
                out.push(letter.to_ascii_uppercase());
                capital = false;
            }
            other => out.push(other),
        }
    }
    out
}

fn push_word(out: &mut String, word: &str, capital: bool) {
    let mut chars = word.chars();
    if let (true, Some(first)) = (capital, chars.next()) {
        out.push(first.to_ascii_uppercase());
        out.push_str(chars.as_str());
    } else {
        out.push_str(word);
    }
}

impl Engine for FakeEngine {
    fn version(&self) -> String {
        "fake-liblouis 3.29.0".to_string()
    }

    fn set_log_level(&self, level: i32) {
        self.state.lock().log_level = Some(level);
    }

    fn get_table(&self, table: &str) -> bool {
        self.has_table(table)
    }

    fn check_table(&self, table: &str) -> bool {
        self.has_table(table)
    }

    fn free(&self) {
        self.state.lock().frees += 1;
    }

    fn char_size(&self) -> usize {
        self.state.lock().char_size
    }

    fn log_file(&self, path: &str) {
        self.state.lock().log_file = Some(path.to_string());
    }

    fn register_log_callback(&self, handle: Option<FunctionHandle>) {
        self.state.lock().active_callback = handle;
    }

    fn compile_string(&self, table: &str, rule: &str) -> bool {
        if !self.has_table(table) || rule.trim().is_empty() {
            return false;
        }
        self.state.lock().compiled_rules.push(rule.to_string());
        true
    }

    fn translate_string(&self, call: &TranslateCall<'_>) -> bool {
        self.run(call, false)
    }

    fn back_translate_string(&self, call: &TranslateCall<'_>) -> bool {
        self.run(call, true)
    }

    fn alloc(&self, bytes: usize) -> Result<ForeignPtr> {
        let mut state = self.state.lock();
        if state.fail_alloc {
            return Err(BridgeError::AllocationFailed { bytes });
        }
        let address = state.next_address;
        // Leave a gap so overruns land outside every block.
        state.next_address += bytes.max(4).next_multiple_of(16) + 16;
        state.heap.insert(address, vec![0; bytes]);
        state.allocs += 1;
        Ok(ForeignPtr::new(address))
    }

    fn release(&self, ptr: ForeignPtr) -> Result<()> {
        let mut state = self.state.lock();
        if state.fail_release {
            return Err(BridgeError::ReleaseFailed {
                address: ptr.address(),
                detail: "simulated release failure".to_string(),
            });
        }
        match state.heap.remove(&ptr.address()) {
            Some(_) => {
                state.releases += 1;
                Ok(())
            }
            None => Err(BridgeError::ReleaseFailed {
                address: ptr.address(),
                detail: "not a live allocation".to_string(),
            }),
        }
    }

    fn write_units(&self, ptr: ForeignPtr, units: &[u32]) -> Result<()> {
        let mut state = self.state.lock();
        let (base, start) = Self::locate(&state, ptr, units.len() * 4)?;
        let block = state.heap.get_mut(&base).ok_or(BridgeError::InvalidPointer { address: base })?;
        for (i, unit) in units.iter().enumerate() {
            block[start + i * 4..start + i * 4 + 4].copy_from_slice(&unit.to_le_bytes());
        }
        Ok(())
    }

    fn read_units(&self, ptr: ForeignPtr, count: usize) -> Result<Vec<u32>> {
        let state = self.state.lock();
        let (base, start) = Self::locate(&state, ptr, count * 4)?;
        let block = &state.heap[&base];
        Ok(block[start..start + count * 4]
            .chunks_exact(4)
            .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect())
    }

    fn read_cell(&self, ptr: ForeignPtr) -> Result<i32> {
        Ok(self.read_units(ptr, 1)?[0] as i32)
    }

    fn write_cell(&self, ptr: ForeignPtr, value: i32) -> Result<()> {
        self.write_units(ptr, &[value as u32])
    }

    fn add_function(&self, function: LogFn) -> Result<FunctionHandle> {
        let mut state = self.state.lock();
        let slot = state.next_slot;
        state.next_slot += 1;
        state.slots.insert(slot, function);
        Ok(FunctionHandle::new(slot))
    }

    fn remove_function(&self, handle: FunctionHandle) -> Result<()> {
        let mut state = self.state.lock();
        state
            .slots
            .remove(&handle.slot())
            .map(|_| ())
            .ok_or_else(|| BridgeError::FunctionSlot {
                detail: format!("slot {} is not in use", handle.slot()),
            })
    }

    fn table_dir(&self) -> PathBuf {
        PathBuf::from(TABLE_DIR)
    }

    fn make_dir_all(&self, path: &Path) -> Result<()> {
        let mut state = self.state.lock();
        for ancestor in path.ancestors() {
            state.dirs.insert(ancestor.to_path_buf());
        }
        Ok(())
    }

    fn write_file(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        let mut state = self.state.lock();
        if state.fail_write {
            return Err(BridgeError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "simulated write failure",
            )));
        }
        let parent = path.parent().map(Path::to_path_buf).unwrap_or_default();
        if !state.dirs.contains(&parent) {
            return Err(BridgeError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no such directory: {}", parent.display()),
            )));
        }
        state.files.insert(path.to_path_buf(), bytes.to_vec());
        state.file_writes += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toy_tables_translate_greeting() {
        assert_eq!(translate("Hello, World!", true), ",hello1 ,_w6");
        assert_eq!(translate("Hello, World!", false), ",hello1 ,world6");
    }

    #[test]
    fn toy_tables_back_translate_greeting() {
        assert_eq!(back_translate(",hello1 ,_w6", true), "Hello, World!");
        assert_eq!(back_translate(",hello1 ,world6", false), "Hello, World!");
    }

    #[test]
    fn out_of_bounds_access_is_rejected() {
        let engine = FakeEngine::new();
        let ptr = engine.alloc(8).unwrap();
        assert!(engine.read_units(ptr, 2).is_ok());
        assert!(engine.read_units(ptr, 3).is_err());
        assert!(engine.read_units(ForeignPtr::new(0x10), 1).is_err());
    }

    #[test]
    fn double_release_fails() {
        let engine = FakeEngine::new();
        let ptr = engine.alloc(4).unwrap();
        engine.release(ptr).unwrap();
        assert!(engine.release(ptr).is_err());
    }
}
