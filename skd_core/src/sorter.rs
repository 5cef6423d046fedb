//! Canonical entry ordering.
//!
//! Both orderings compare raw Shift_JIS key bytes. [`sort_by_class`] prepares
//! the input of the index builder; [`arrange_by_index`] produces the final
//! table order, which is what the address resolver scans.

use std::collections::HashMap;

use crate::charset::{self, ClassTable, KeyDisplay};
use crate::diag::{Diagnostic, DiagnosticSink};
use crate::entry::Entry;
use crate::error::{Result, SkdError};
use crate::index::IndexKey;

/// Group entries by class character in canonical class order, each group
/// descending by key bytes.
///
/// Entries outside the class table are dropped and reported to `sink`.
pub fn sort_by_class(
    entries: Vec<Entry>,
    classes: &ClassTable,
    sink: &mut dyn DiagnosticSink,
) -> Vec<Entry> {
    let mut ranked: Vec<(usize, Entry)> = Vec::with_capacity(entries.len());
    for entry in entries {
        match classes.canonical_rank(entry.key()) {
            Some(rank) => ranked.push((rank, entry)),
            None => sink.record(Diagnostic::UnclassifiedEntry {
                key: entry.key().to_vec(),
            }),
        }
    }
    ranked.sort_by(|(ra, a), (rb, b)| ra.cmp(rb).then_with(|| b.key().cmp(a.key())));
    ranked.into_iter().map(|(_, e)| e).collect()
}

/// Order entries for the table region.
///
/// Each entry belongs to the first index key, in index order, that prefixes
/// it. Groups follow the index order; a group is descending unless its key is
/// a single character, in which case it is ascending.
pub fn arrange_by_index(entries: Vec<Entry>, index: &[IndexKey]) -> Result<Vec<Entry>> {
    let position: HashMap<&[u8], usize> = index
        .iter()
        .enumerate()
        .map(|(i, k)| (k.prefix(), i))
        .collect();

    let mut groups: Vec<Vec<Entry>> = vec![Vec::new(); index.len()];
    for entry in entries {
        let owner = (1..=charset::char_len(entry.key()))
            .rev()
            .filter_map(|n| position.get(charset::truncate_chars(entry.key(), n)))
            .min()
            .copied();
        match owner {
            Some(i) => groups[i].push(entry),
            None => {
                return Err(SkdError::Format(format!(
                    "entry {} is not covered by any index key",
                    KeyDisplay(entry.key())
                )))
            }
        }
    }

    let mut out = Vec::new();
    for (key, mut group) in index.iter().zip(groups) {
        if charset::char_len(key.prefix()) == 1 {
            group.sort_by(|a, b| a.key().cmp(b.key()));
        } else {
            group.sort_by(|a, b| b.key().cmp(a.key()));
        }
        out.extend(group);
    }
    Ok(out)
}
