//! Adaptive prefix-index construction.
//!
//! The builder condenses a histogram of per-entry key prefixes into a bounded
//! set of index keys so that no key (outside the exemptions below) stands for
//! more than `cap` table entries. It is a greedy bottom-up trie condensation:
//!
//! 1. seed one key per class character (count 0);
//! 2. count every entry under its key truncated to `max_char_len + 1` chars;
//! 3. shrink under-full keys one character at a time into their parent;
//! 4. fold each survivor into its nearest ancestor that still fits the cap;
//! 5. order the result the way the table region is grouped.
//!
//! Keys exempt from the cap: single characters (class seeds and the root used
//! as last-resort merge target) and depth-limit keys whose base count already
//! exceeded the cap.

use std::collections::{HashMap, VecDeque};

use crate::charset::{self, ClassTable};
use crate::diag::{Diagnostic, DiagnosticSink};
use crate::entry::Entry;

/// A prefix selected for the index and the number of entries it represents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexKey {
    prefix: Vec<u8>,
    count: usize,
}

impl IndexKey {
    pub fn new(prefix: Vec<u8>, count: usize) -> Self {
        Self { prefix, count }
    }

    pub fn prefix(&self) -> &[u8] {
        &self.prefix
    }

    pub fn count(&self) -> usize {
        self.count
    }
}

/// Condenses entry prefixes into index keys under a capacity cap.
#[derive(Debug, Clone)]
pub struct IndexBuilder<'a> {
    classes: &'a ClassTable,
    cap: usize,
    max_char_len: usize,
}

impl<'a> IndexBuilder<'a> {
    /// `cap` and `max_char_len` must be positive; the pipeline validates them
    /// through [`BuildConfig`](crate::pipeline::BuildConfig).
    pub fn new(classes: &'a ClassTable, cap: usize, max_char_len: usize) -> Self {
        Self {
            classes,
            cap,
            max_char_len,
        }
    }

    /// Build the ordered index for `entries` (already sorted by class).
    pub fn build(&self, entries: &[Entry], sink: &mut dyn DiagnosticSink) -> Vec<IndexKey> {
        let mut counts: HashMap<Vec<u8>, usize> = HashMap::new();

        for class in self.classes.classes() {
            counts.insert(class.to_vec(), 0);
        }
        for entry in entries {
            let prefix = charset::truncate_chars(entry.key(), self.max_char_len + 1);
            *counts.entry(prefix.to_vec()).or_insert(0) += 1;
        }
        sink.record(Diagnostic::IndexPhase {
            phase: "histogram",
            keys: counts.len(),
        });

        self.shrink(&mut counts);
        counts.retain(|_, count| *count > 0);
        sink.record(Diagnostic::IndexPhase {
            phase: "shrink",
            keys: counts.len(),
        });

        self.fold_into_ancestors(&mut counts, sink);
        counts.retain(|_, count| *count > 0);
        sink.record(Diagnostic::IndexPhase {
            phase: "fold",
            keys: counts.len(),
        });

        self.canonical_order(counts)
    }

    /// Move each under-full key into its parent (the key minus its last
    /// character), creating the parent when it does not exist yet. Keys
    /// created here are queued and revisited in the same pass.
    fn shrink(&self, counts: &mut HashMap<Vec<u8>, usize>) {
        let mut queue: VecDeque<Vec<u8>> = descending(counts.keys().cloned().collect()).into();

        while let Some(key) = queue.pop_front() {
            let Some(&count) = counts.get(&key) else {
                continue;
            };
            if count >= self.cap || charset::char_len(&key) < 2 {
                continue;
            }
            let parent = charset::drop_last_char(&key).to_vec();
            match counts.get_mut(&parent) {
                Some(parent_count) if *parent_count + count <= self.cap => {
                    *parent_count += count;
                    counts.remove(&key);
                }
                Some(_) => {}
                None => {
                    counts.remove(&key);
                    counts.insert(parent.clone(), count);
                    queue.push_back(parent);
                }
            }
        }
    }

    /// Merge each multi-character key into the longest existing ancestor
    /// whose count stays within the cap. When only the one-character root
    /// exists and the key is under-full, the root takes it regardless.
    fn fold_into_ancestors(
        &self,
        counts: &mut HashMap<Vec<u8>, usize>,
        sink: &mut dyn DiagnosticSink,
    ) {
        for key in descending(counts.keys().cloned().collect()) {
            let Some(&count) = counts.get(&key) else {
                continue;
            };
            let len = charset::char_len(&key);
            if len < 2 {
                continue;
            }

            let mut target = None;
            let mut existing = 0;
            for n in (1..len).rev() {
                let ancestor = charset::truncate_chars(&key, n);
                if let Some(&ancestor_count) = counts.get(ancestor) {
                    existing += 1;
                    if ancestor_count + count <= self.cap {
                        target = Some(ancestor.to_vec());
                        break;
                    }
                }
            }

            if target.is_none() && existing == 1 && count < self.cap {
                let root = charset::first_char(&key);
                if counts.contains_key(root) {
                    sink.record(Diagnostic::ForcedRootMerge {
                        key: key.clone(),
                        root: root.to_vec(),
                        count: counts[root] + count,
                    });
                    target = Some(root.to_vec());
                }
            }

            if let Some(target) = target {
                counts.remove(&key);
                if let Some(c) = counts.get_mut(&target) {
                    *c += count;
                }
            }
        }
    }

    /// Group by class in canonical class order, descending inside a class.
    fn canonical_order(&self, counts: HashMap<Vec<u8>, usize>) -> Vec<IndexKey> {
        let mut keys: Vec<(usize, IndexKey)> = counts
            .into_iter()
            .map(|(prefix, count)| {
                let rank = self.classes.canonical_rank(&prefix).unwrap_or(usize::MAX);
                (rank, IndexKey::new(prefix, count))
            })
            .collect();
        keys.sort_by(|(ra, a), (rb, b)| ra.cmp(rb).then_with(|| b.prefix.cmp(&a.prefix)));
        keys.into_iter().map(|(_, k)| k).collect()
    }
}

fn descending(mut keys: Vec<Vec<u8>>) -> Vec<Vec<u8>> {
    keys.sort_by(|a, b| b.cmp(a));
    keys
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charset::encode_hiragana;
    use crate::diag::{BuildLog, NullSink};

    fn entries(keys: &[&str]) -> Vec<Entry> {
        keys.iter()
            .map(|k| Entry::new(encode_hiragana(k).unwrap(), vec![b"x".to_vec()]).unwrap())
            .collect()
    }

    fn summary(index: &[IndexKey]) -> Vec<(Vec<u8>, usize)> {
        index.iter().map(|k| (k.prefix().to_vec(), k.count())).collect()
    }

    fn key(s: &str) -> Vec<u8> {
        encode_hiragana(s).unwrap()
    }

    #[test]
    fn under_full_children_fold_into_seed() {
        let classes = ClassTable::hiragana();
        let index =
            IndexBuilder::new(&classes, 10, 1).build(&entries(&["あ", "あい"]), &mut NullSink);
        assert_eq!(summary(&index), vec![(key("あ"), 2)]);
    }

    #[test]
    fn empty_seeds_are_pruned() {
        let classes = ClassTable::hiragana();
        let index =
            IndexBuilder::new(&classes, 5, 2).build(&entries(&["か", "かき"]), &mut NullSink);
        assert_eq!(summary(&index), vec![(key("か"), 2)]);
    }

    #[test]
    fn full_keys_stay_split() {
        let classes = ClassTable::new(vec![b"A".to_vec()]);
        let input: Vec<Entry> = ["AB", "AA", "A"]
            .iter()
            .map(|k| Entry::new(k.as_bytes().to_vec(), vec![b"x".to_vec()]).unwrap())
            .collect();
        let index = IndexBuilder::new(&classes, 1, 1).build(&input, &mut NullSink);
        assert_eq!(
            summary(&index),
            vec![(b"AB".to_vec(), 1), (b"AA".to_vec(), 1), (b"A".to_vec(), 1)]
        );
    }

    #[test]
    fn shrink_creates_missing_parents() {
        // max_char_len 2 puts "あいう*" under "あいう"; with a roomy cap every
        // level collapses into the seed.
        let classes = ClassTable::hiragana();
        let index = IndexBuilder::new(&classes, 10, 2)
            .build(&entries(&["あいうえ", "あいうお", "あいか"]), &mut NullSink);
        assert_eq!(summary(&index), vec![(key("あ"), 3)]);
    }

    #[test]
    fn fold_picks_the_nearest_ancestor_that_fits() {
        // The shrink pass fills "かき" up to the cap; the leftover "かきあ"
        // cannot join it, but the seed "か" still has room.
        let classes = ClassTable::hiragana();
        let mut keys = vec!["かきくけ"];
        keys.extend(["かきあ", "かきい", "かきう", "かきえ"]);
        keys.push("か");
        let index = IndexBuilder::new(&classes, 4, 2).build(&entries(&keys), &mut NullSink);
        let total: usize = index.iter().map(IndexKey::count).sum();
        assert_eq!(total, keys.len());
        for k in &index {
            assert!(k.count() <= 4, "{:?} exceeds the cap", k);
        }
    }

    #[test]
    fn forced_root_merge_is_reported() {
        // "かき" is full on its own, so the two-char under-full key "かく"
        // (count 1) has only the root left, which is already at the cap.
        let classes = ClassTable::hiragana();
        let input = entries(&["か", "か", "かきあ", "かきい", "かく"]);
        let mut log = BuildLog::new();
        let index = IndexBuilder::new(&classes, 2, 1).build(&input, &mut log);
        assert!(log
            .events()
            .iter()
            .any(|e| matches!(e, Diagnostic::ForcedRootMerge { .. })));
        assert_eq!(summary(&index), vec![(key("かき"), 2), (key("か"), 3)]);
    }

    #[test]
    fn classes_are_ordered_from_the_table_end() {
        let classes = ClassTable::hiragana();
        let index = IndexBuilder::new(&classes, 10, 1)
            .build(&entries(&["あ", "ん", "か"]), &mut NullSink);
        assert_eq!(
            index.iter().map(|k| k.prefix().to_vec()).collect::<Vec<_>>(),
            vec![key("ん"), key("か"), key("あ")]
        );
    }
}
