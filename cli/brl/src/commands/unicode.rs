//! `brl unicode`: BRF / Unicode Braille conversion.

use braille_codec::{brf_to_unicode, unicode_to_brf};

/// Convert BRF to Unicode Braille, or back when `reverse` is set.
pub fn convert(text: &str, reverse: bool) -> String {
    if reverse {
        unicode_to_brf(text)
    } else {
        brf_to_unicode(text)
    }
}
