//! Conversion between Braille ASCII (BRF) and Unicode Braille Patterns.
//!
//! BRF encodes one six-dot Braille cell per printable ASCII byte. The
//! translation engine emits BRF; display surfaces want the glyphs from the
//! Unicode Braille Patterns block (U+2800..U+283F). Everything here is pure
//! table lookup.
//!
//! ## Items
//!
//! - [`brf_to_unicode`] — BRF → Unicode glyphs
//! - [`unicode_to_brf`] — Unicode glyphs → canonical BRF cells
//! - [`BrailleMode`] — output representation selector

use serde::{Deserialize, Serialize};

/// Code point of the first printable ASCII character (space).
const FIRST_PRINTABLE: u32 = 32;

/// Unicode glyph for every ASCII code from 32 (space) through 127 (DEL).
///
/// Upper- and lowercase letters share a cell; BRF has no case.
const BRF_TO_UNICODE: [char; 96] = [
    '⠀', '⠮', '⠐', '⠼', '⠫', '⠩', '⠯', '⠄', //  !"#$%&'
    '⠷', '⠾', '⠡', '⠬', '⠠', '⠤', '⠨', '⠌', // ()*+,-./
    '⠴', '⠂', '⠆', '⠒', '⠲', '⠢', '⠖', '⠶', // 01234567
    '⠦', '⠔', '⠱', '⠰', '⠣', '⠿', '⠜', '⠹', // 89:;<=>?
    '⠈', '⠁', '⠃', '⠉', '⠙', '⠑', '⠋', '⠛', // @ABCDEFG
    '⠓', '⠊', '⠚', '⠅', '⠇', '⠍', '⠝', '⠕', // HIJKLMNO
    '⠏', '⠟', '⠗', '⠎', '⠞', '⠥', '⠧', '⠺', // PQRSTUVW
    '⠭', '⠽', '⠵', '⠪', '⠳', '⠻', '⠘', '⠸', // XYZ[\]^_
    '⠈', '⠁', '⠃', '⠉', '⠙', '⠑', '⠋', '⠛', // `abcdefg
    '⠓', '⠊', '⠚', '⠅', '⠇', '⠍', '⠝', '⠕', // hijklmno
    '⠏', '⠟', '⠗', '⠎', '⠞', '⠥', '⠧', '⠺', // pqrstuvw
    '⠭', '⠽', '⠵', '⠪', '⠳', '⠻', '⠘', '⠸', // xyz{|}~ DEL
];

/// Output representation for translated Braille.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrailleMode {
    /// Braille Ready Format: one ASCII character per cell.
    #[default]
    Brf,
    /// Unicode Braille Patterns glyphs.
    Unicode,
}

impl BrailleMode {
    /// Parse a mode name (`brf` or `unicode`), case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "brf" => Some(Self::Brf),
            "unicode" => Some(Self::Unicode),
            _ => None,
        }
    }
}

impl std::fmt::Display for BrailleMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Brf => write!(f, "brf"),
            Self::Unicode => write!(f, "unicode"),
        }
    }
}

/// Convert a BRF string to Unicode Braille.
///
/// Control characters (below ASCII 32) such as newlines and form feeds are
/// preserved. Characters outside the ASCII range have no cell and pass
/// through unchanged.
pub fn brf_to_unicode(brf: &str) -> String {
    brf.chars().map(brf_cell_to_unicode).collect()
}

/// Map a single BRF character to its Unicode glyph.
pub fn brf_cell_to_unicode(c: char) -> char {
    let code = c as u32;
    if code < FIRST_PRINTABLE {
        return c;
    }
    BRF_TO_UNICODE
        .get((code - FIRST_PRINTABLE) as usize)
        .copied()
        .unwrap_or(c)
}

/// Convert Unicode Braille glyphs back to BRF.
///
/// Each glyph maps to its canonical cell: letters come out lowercase, which
/// is what the engine itself emits. Glyphs with dots 7 or 8 and any
/// non-Braille character pass through unchanged.
pub fn unicode_to_brf(text: &str) -> String {
    text.chars().map(unicode_cell_to_brf).collect()
}

/// Map a single Unicode glyph to its canonical BRF character.
pub fn unicode_cell_to_brf(c: char) -> char {
    // The first 64 entries cover every six-dot cell exactly once.
    let Some(index) = BRF_TO_UNICODE[..64].iter().position(|&g| g == c) else {
        return c;
    };
    let ascii = index as u8 + FIRST_PRINTABLE as u8;
    if ascii.is_ascii_uppercase() {
        ascii.to_ascii_lowercase() as char
    } else {
        ascii as char
    }
}

/// Whether `c` lies in the Unicode Braille Patterns block.
pub fn is_braille_pattern(c: char) -> bool {
    ('\u{2800}'..='\u{28FF}').contains(&c)
}
