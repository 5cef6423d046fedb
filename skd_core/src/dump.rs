//! JSON side artifacts: entry dump, resolved index dump, index statistics.
//!
//! Byte strings are rendered through [`KeyDisplay`]. Only the prefix/address
//! pairs are meant to be compared between runs; the exact layout is not
//! part of any contract.

use std::io::Write;

use serde::Serialize;

use crate::charset::KeyDisplay;
use crate::entry::Entry;
use crate::index::IndexKey;
use crate::pipeline::BuildConfig;
use crate::resolver::Resolved;

#[derive(Debug, Serialize)]
struct EntryRecord {
    key: String,
    candidates: Vec<String>,
}

#[derive(Debug, Serialize)]
struct IndexStats<'a> {
    config: &'a BuildConfig,
    keys: Vec<(String, usize)>,
}

fn text(bytes: &[u8]) -> String {
    KeyDisplay(bytes).to_string()
}

/// Serialize `value` into `out` and flush, so buffered write errors surface
/// here instead of being dropped with the writer.
fn write_json<W: Write, T: Serialize>(mut out: W, value: &T) -> serde_json::Result<()> {
    serde_json::to_writer_pretty(&mut out, value)?;
    out.flush().map_err(serde_json::Error::io)
}

/// Entries in table order.
pub fn write_entries<W: Write>(out: W, entries: &[Entry]) -> serde_json::Result<()> {
    let records: Vec<EntryRecord> = entries
        .iter()
        .map(|e| EntryRecord {
            key: text(e.key()),
            candidates: e.candidates().iter().map(|c| text(c)).collect(),
        })
        .collect();
    write_json(out, &records)
}

/// `[prefix, address]` pairs of the resolved index records.
pub fn write_index<W: Write>(out: W, resolved: &[Resolved]) -> serde_json::Result<()> {
    let pairs: Vec<(String, u32)> = resolved
        .iter()
        .map(|r| (text(&r.prefix), r.address))
        .collect();
    write_json(out, &pairs)
}

/// Builder counts per index key, alongside the parameters that produced them.
pub fn write_index_stats<W: Write>(
    out: W,
    config: &BuildConfig,
    index: &[IndexKey],
) -> serde_json::Result<()> {
    let stats = IndexStats {
        config,
        keys: index.iter().map(|k| (text(k.prefix()), k.count())).collect(),
    };
    write_json(out, &stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charset::encode_hiragana;

    /// Accepts writes into its buffer but fails on flush, like a full disk
    /// behind a `BufWriter`.
    struct FailingFlush(Vec<u8>);

    impl Write for FailingFlush {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Err(std::io::Error::new(std::io::ErrorKind::Other, "no space left"))
        }
    }

    #[test]
    fn entry_dump_shape_and_escapes() {
        let entry = Entry::new(
            encode_hiragana("かん").unwrap(),
            vec![b"\x8a\xbf".to_vec(), b"kan".to_vec()],
        )
        .unwrap();
        let mut out = Vec::new();
        write_entries(&mut out, &[entry]).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(
            value,
            serde_json::json!([{ "key": "かん", "candidates": ["\\x8a\\xbf", "kan"] }])
        );
    }

    #[test]
    fn flush_failure_is_reported() {
        let index = vec![IndexKey::new(b"A".to_vec(), 1)];
        let err = write_index_stats(FailingFlush(Vec::new()), &BuildConfig::new(1, 1), &index)
            .unwrap_err();
        assert!(err.is_io());
        assert!(write_entries(FailingFlush(Vec::new()), &[]).is_err());
    }

    #[test]
    fn index_dump_is_prefix_address_pairs() {
        let resolved = vec![Resolved {
            prefix: encode_hiragana("あい").unwrap(),
            address: 42,
        }];
        let mut out = Vec::new();
        write_index(&mut out, &resolved).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value, serde_json::json!([["あい", 42]]));
    }

    #[test]
    fn stats_carry_the_config() {
        let config = BuildConfig::new(3, 2);
        let index = vec![IndexKey::new(b"A".to_vec(), 7)];
        let mut out = Vec::new();
        write_index_stats(&mut out, &config, &index).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["config"]["cap"], 3);
        assert_eq!(value["keys"], serde_json::json!([["A", 7]]));
    }
}
