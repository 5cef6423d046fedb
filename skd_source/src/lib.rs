//! SKK text dictionary parser.
//!
//! Turns Shift_JIS SKK dictionary lines (`よみ /候補1/候補2;注釈/`) into
//! [`Entry`] values for the SKD builder. Parsing is byte-oriented: the
//! separators are ASCII and Shift_JIS trail bytes never collide with them.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::Context;
use skd_core::Entry;
use tracing::debug;

/// Why a source line produced no entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SkipReason {
    Blank,
    Comment,
    /// Key starts with a printable ASCII byte (`0x20..=0x7E`).
    AsciiKey,
    /// Key ends with `>`, reserved for prefix/suffix syntax.
    SpecialMarker,
    /// Nothing left after removing empty pieces and annotations.
    NoCandidates,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedLine {
    Entry(Entry),
    Skipped(SkipReason),
}

/// Parse one dictionary line (without its line terminator).
pub fn parse_line(line: &[u8]) -> anyhow::Result<ParsedLine> {
    let line = line.trim_ascii();
    if line.is_empty() {
        return Ok(ParsedLine::Skipped(SkipReason::Blank));
    }
    if line.starts_with(b";") {
        return Ok(ParsedLine::Skipped(SkipReason::Comment));
    }

    let space = line
        .iter()
        .position(|&b| b == b' ')
        .context("missing space between key and candidates")?;
    let (key, rest) = (&line[..space], &line[space + 1..]);

    if (0x20..=0x7E).contains(&key[0]) {
        return Ok(ParsedLine::Skipped(SkipReason::AsciiKey));
    }
    if key.ends_with(b">") {
        return Ok(ParsedLine::Skipped(SkipReason::SpecialMarker));
    }

    let candidates: Vec<Vec<u8>> = rest
        .split(|&b| b == b'/')
        .map(|piece| match piece.iter().position(|&b| b == b';') {
            Some(i) => &piece[..i],
            None => piece,
        })
        .filter(|c| !c.is_empty())
        .map(<[u8]>::to_vec)
        .collect();
    if candidates.is_empty() {
        return Ok(ParsedLine::Skipped(SkipReason::NoCandidates));
    }

    Ok(ParsedLine::Entry(Entry::new(key.to_vec(), candidates)?))
}

/// Entries of one source plus what was left out.
#[derive(Debug, Default)]
pub struct SourceSummary {
    pub entries: Vec<Entry>,
    pub skipped: BTreeMap<SkipReason, usize>,
    /// Longest accepted key, in bytes.
    pub max_key_len: usize,
}

impl SourceSummary {
    pub fn skipped_total(&self) -> usize {
        self.skipped.values().sum()
    }
}

/// Parse every line of `reader`.
pub fn read_entries<R: BufRead>(mut reader: R) -> anyhow::Result<SourceSummary> {
    let mut summary = SourceSummary::default();
    let mut line = Vec::new();
    let mut line_no = 0usize;

    loop {
        line.clear();
        let n = reader
            .read_until(b'\n', &mut line)
            .with_context(|| format!("reading line {}", line_no + 1))?;
        if n == 0 {
            break;
        }
        line_no += 1;
        match parse_line(&line).with_context(|| format!("line {line_no}"))? {
            ParsedLine::Entry(entry) => {
                summary.max_key_len = summary.max_key_len.max(entry.key().len());
                summary.entries.push(entry);
            }
            ParsedLine::Skipped(reason) => *summary.skipped.entry(reason).or_insert(0) += 1,
        }
    }

    debug!(
        lines = line_no,
        entries = summary.entries.len(),
        skipped = summary.skipped_total(),
        "parsed dictionary source"
    );
    Ok(summary)
}

/// Open `path` and parse it as a Shift_JIS SKK dictionary.
pub fn load_file(path: impl AsRef<Path>) -> anyhow::Result<SourceSummary> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("opening source {:?}", path))?;
    read_entries(BufReader::new(file)).with_context(|| format!("parsing source {:?}", path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use skd_core::charset::encode_hiragana;

    fn sjis(s: &str) -> Vec<u8> {
        encode_hiragana(s).unwrap()
    }

    fn line(key: &str, rest: &[u8]) -> Vec<u8> {
        let mut l = sjis(key);
        l.push(b' ');
        l.extend_from_slice(rest);
        l
    }

    #[test]
    fn strips_annotations_and_empty_pieces() {
        let parsed = parse_line(&line("あい", b"/\x88\xa4;love//\x8d\x87/\r\n")).unwrap();
        let entry = match parsed {
            ParsedLine::Entry(entry) => entry,
            other => panic!("expected an entry, got {other:?}"),
        };
        assert_eq!(entry.key(), sjis("あい").as_slice());
        assert_eq!(entry.candidates(), &[b"\x88\xa4".to_vec(), b"\x8d\x87".to_vec()]);
    }

    #[test]
    fn skips_excluded_lines() {
        let cases: Vec<(Vec<u8>, SkipReason)> = vec![
            (b"   \r\n".to_vec(), SkipReason::Blank),
            (b";; okuri-ari entries.".to_vec(), SkipReason::Comment),
            (b"abc /ABC/".to_vec(), SkipReason::AsciiKey),
            (b">ka /x/".to_vec(), SkipReason::AsciiKey),
            (line("あ>", b"/x/"), SkipReason::SpecialMarker),
            (line("あ", b"/;only-annotation/"), SkipReason::NoCandidates),
        ];
        for (input, reason) in cases {
            assert_eq!(
                parse_line(&input).unwrap(),
                ParsedLine::Skipped(reason),
                "{:?}",
                String::from_utf8_lossy(&input)
            );
        }
    }

    #[test]
    fn line_without_separator_is_an_error() {
        assert!(parse_line(&sjis("あいう")).is_err());
    }

    #[test]
    fn reads_a_whole_source() {
        let mut text = b";; header\n".to_vec();
        text.extend(line("かき", b"/\x8a\x60/\n"));
        text.extend(b"\n");
        text.extend(line("あ", b"/\x88\x9f/\x88\xa2/\n"));
        text.extend(b"sushi /x/\n");

        let summary = read_entries(text.as_slice()).unwrap();
        assert_eq!(summary.entries.len(), 2);
        assert_eq!(summary.max_key_len, 4);
        assert_eq!(summary.skipped_total(), 3);
        assert_eq!(summary.skipped[&SkipReason::Comment], 1);
        assert_eq!(summary.entries[1].candidates().len(), 2);
    }

    #[test]
    fn errors_name_the_line() {
        let text = b";; ok\nbroken-line-without-space\n";
        let err = read_entries(&text[..]).unwrap_err();
        assert!(format!("{err:#}").contains("line 2"), "{err:#}");
    }
}
