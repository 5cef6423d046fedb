//! Shift_JIS character segmentation and the class-character table.
//!
//! Keys are raw Shift_JIS bytes. A lead byte in `0x81..=0x9F` or
//! `0xE0..=0xFC` starts a two-byte character; every other byte is a
//! character on its own. Trail bytes are never below `0x40`, so ASCII
//! separators (space, `/`, `;`, `>`) can be found bytewise.

use std::fmt;

/// First and last hiragana (ぁ, ん) in Shift_JIS.
const SJIS_HIRAGANA_FIRST: u16 = 0x829F;
const SJIS_HIRAGANA_LAST: u16 = 0x82F1;
const UNICODE_HIRAGANA_FIRST: u32 = 0x3041;

#[inline]
pub fn is_lead_byte(b: u8) -> bool {
    matches!(b, 0x81..=0x9F | 0xE0..=0xFC)
}

/// Iterator over the characters of a Shift_JIS byte string.
pub struct Chars<'a> {
    rest: &'a [u8],
}

impl<'a> Iterator for Chars<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<&'a [u8]> {
        let first = *self.rest.first()?;
        let width = if is_lead_byte(first) && self.rest.len() >= 2 {
            2
        } else {
            1
        };
        let (ch, rest) = self.rest.split_at(width);
        self.rest = rest;
        Some(ch)
    }
}

pub fn chars(key: &[u8]) -> Chars<'_> {
    Chars { rest: key }
}

pub fn char_len(key: &[u8]) -> usize {
    chars(key).count()
}

/// The first `n` characters of `key` (all of it if shorter).
pub fn truncate_chars(key: &[u8], n: usize) -> &[u8] {
    let len: usize = chars(key).take(n).map(<[u8]>::len).sum();
    &key[..len]
}

/// `key` without its last character.
pub fn drop_last_char(key: &[u8]) -> &[u8] {
    truncate_chars(key, char_len(key).saturating_sub(1))
}

pub fn first_char(key: &[u8]) -> &[u8] {
    truncate_chars(key, 1)
}

/// Encode a string of hiragana and ASCII into Shift_JIS bytes.
///
/// Returns `None` for any other character.
pub fn encode_hiragana(s: &str) -> Option<Vec<u8>> {
    let mut out = Vec::with_capacity(s.len());
    for ch in s.chars() {
        let cp = ch as u32;
        if ch.is_ascii() {
            out.push(cp as u8);
            continue;
        }
        let span = (SJIS_HIRAGANA_LAST - SJIS_HIRAGANA_FIRST) as u32;
        if !(UNICODE_HIRAGANA_FIRST..=UNICODE_HIRAGANA_FIRST + span).contains(&cp) {
            return None;
        }
        let code = SJIS_HIRAGANA_FIRST + (cp - UNICODE_HIRAGANA_FIRST) as u16;
        out.extend_from_slice(&code.to_be_bytes());
    }
    Some(out)
}

/// Human-readable rendering of a Shift_JIS key for logs and dumps.
///
/// Hiragana and printable ASCII are shown as text, everything else as
/// `\xNN` escapes, so the rendering is lossless and stable.
pub struct KeyDisplay<'a>(pub &'a [u8]);

impl fmt::Display for KeyDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for ch in chars(self.0) {
            match ch {
                &[b] if (0x20..=0x7E).contains(&b) && b != b'\\' => write!(f, "{}", b as char)?,
                &[hi, lo] if (SJIS_HIRAGANA_FIRST..=SJIS_HIRAGANA_LAST)
                    .contains(&u16::from_be_bytes([hi, lo])) =>
                {
                    let code = u16::from_be_bytes([hi, lo]);
                    let cp = UNICODE_HIRAGANA_FIRST + (code - SJIS_HIRAGANA_FIRST) as u32;
                    let c = char::from_u32(cp).ok_or(fmt::Error)?;
                    write!(f, "{c}")?;
                }
                _ => {
                    for b in ch {
                        write!(f, "\\x{b:02x}")?;
                    }
                }
            }
        }
        Ok(())
    }
}

/// Ordered alphabet of class characters used to bucket entries and index keys.
///
/// The canonical iteration order walks the table from its last character to
/// its first (ん … ぁ for the hiragana table); entries, index keys, and the
/// resolver all use that same order.
#[derive(Debug, Clone)]
pub struct ClassTable {
    classes: Vec<Vec<u8>>,
}

impl ClassTable {
    /// The 83 hiragana ぁ..ん in Shift_JIS code order.
    pub fn hiragana() -> Self {
        let classes = (SJIS_HIRAGANA_FIRST..=SJIS_HIRAGANA_LAST)
            .map(|code| code.to_be_bytes().to_vec())
            .collect();
        Self { classes }
    }

    /// Build a table from arbitrary one-character class strings.
    pub fn new(classes: Vec<Vec<u8>>) -> Self {
        Self { classes }
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Class characters in table order.
    pub fn classes(&self) -> impl Iterator<Item = &[u8]> {
        self.classes.iter().map(Vec::as_slice)
    }

    /// Position of `key`'s class in the table, if its first character is one.
    pub fn class_of(&self, key: &[u8]) -> Option<usize> {
        let head = first_char(key);
        self.classes.iter().position(|c| c.as_slice() == head)
    }

    /// Rank of `key`'s class in canonical iteration order (0 comes first).
    pub fn canonical_rank(&self, key: &[u8]) -> Option<usize> {
        self.class_of(key).map(|i| self.classes.len() - 1 - i)
    }
}

impl Default for ClassTable {
    fn default() -> Self {
        Self::hiragana()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sjis(s: &str) -> Vec<u8> {
        encode_hiragana(s).unwrap()
    }

    #[test]
    fn segments_mixed_width_keys() {
        let key = sjis("あいs");
        let parts: Vec<&[u8]> = chars(&key).collect();
        assert_eq!(parts, vec![&[0x82, 0xA0][..], &[0x82, 0xA2][..], &b"s"[..]]);
        assert_eq!(char_len(&key), 3);
        assert_eq!(truncate_chars(&key, 2), sjis("あい").as_slice());
        assert_eq!(drop_last_char(&key), sjis("あい").as_slice());
        assert_eq!(truncate_chars(&key, 10), key.as_slice());
    }

    #[test]
    fn dangling_lead_byte_is_one_char() {
        let key = [0x82, 0xA0, 0x82];
        assert_eq!(char_len(&key), 2);
        assert_eq!(drop_last_char(&key), &[0x82, 0xA0]);
    }

    #[test]
    fn hiragana_table_covers_small_a_to_n() {
        let table = ClassTable::hiragana();
        assert_eq!(table.len(), 83);
        assert_eq!(table.class_of(&sjis("ぁ")), Some(0));
        assert_eq!(table.class_of(&sjis("んご")), Some(82));
        assert_eq!(table.canonical_rank(&sjis("ん")), Some(0));
        assert_eq!(table.class_of(b"abc"), None);
    }

    #[test]
    fn display_renders_kana_and_escapes_the_rest() {
        let mut key = sjis("かな");
        key.extend_from_slice(&[0x8A, 0xBF]);
        key.push(b'>');
        assert_eq!(KeyDisplay(&key).to_string(), "かな\\x8a\\xbf>");
    }
}
