//! Per-run diagnostic sink.
//!
//! Components report noteworthy events through a [`DiagnosticSink`] they are
//! handed explicitly. [`BuildLog`] keeps every event for the end-of-run
//! summary and forwards each one to `tracing` as it arrives.

use tracing::{debug, info, warn};

use crate::charset::KeyDisplay;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// An entry whose first character is not a class character was dropped.
    UnclassifiedEntry { key: Vec<u8> },
    /// The index builder finished a phase with this many live keys.
    IndexPhase { phase: &'static str, keys: usize },
    /// A key was merged into an ancestor although the result exceeds the cap.
    ForcedRootMerge {
        key: Vec<u8>,
        root: Vec<u8>,
        count: usize,
    },
    /// No table entry matched an index record; its address is the sentinel.
    LookupMiss { record: usize, prefix: Vec<u8> },
}

pub trait DiagnosticSink {
    fn record(&mut self, event: Diagnostic);
}

/// Collects the diagnostics of one build run.
#[derive(Debug, Default)]
pub struct BuildLog {
    events: Vec<Diagnostic>,
}

impl BuildLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[Diagnostic] {
        &self.events
    }

    pub fn lookup_misses(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, Diagnostic::LookupMiss { .. }))
            .count()
    }

    pub fn unclassified(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, Diagnostic::UnclassifiedEntry { .. }))
            .count()
    }
}

impl DiagnosticSink for BuildLog {
    fn record(&mut self, event: Diagnostic) {
        match &event {
            Diagnostic::UnclassifiedEntry { key } => {
                debug!(key = %KeyDisplay(key), "dropping entry outside the class table")
            }
            Diagnostic::IndexPhase { phase, keys } => debug!(phase, keys, "index phase done"),
            Diagnostic::ForcedRootMerge { key, root, count } => info!(
                key = %KeyDisplay(key),
                root = %KeyDisplay(root),
                count,
                "merged into root past the cap"
            ),
            Diagnostic::LookupMiss { record, prefix } => warn!(
                record,
                prefix = %KeyDisplay(prefix),
                "no table entry for index key; address left unresolved"
            ),
        }
        self.events.push(event);
    }
}

/// Sink that drops everything, for callers that do not care.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl DiagnosticSink for NullSink {
    fn record(&mut self, _event: Diagnostic) {}
}
