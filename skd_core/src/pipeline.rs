use serde::Serialize;
use tracing::info;

use crate::charset::ClassTable;
use crate::diag::DiagnosticSink;
use crate::entry::Entry;
use crate::error::{Result, SkdError};
use crate::index::{IndexBuilder, IndexKey};
use crate::resolver::{self, ResolveReport};
use crate::sorter;
use crate::writer::{self, DictBuffer};

/// Parameters of one build run. `cap` and `max_char_len` have no defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildConfig {
    /// Maximum number of entries one index key may stand for.
    pub cap: usize,
    /// Maximum index key length in characters (keys may reach one more).
    pub max_char_len: usize,
    /// Free-form ASCII comment stored in the header.
    pub comment: String,
}

impl BuildConfig {
    pub fn new(cap: usize, max_char_len: usize) -> Self {
        Self {
            cap,
            max_char_len,
            comment: String::new(),
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.cap == 0 {
            return Err(SkdError::InvalidConfig("cap must be positive".into()));
        }
        if self.max_char_len == 0 {
            return Err(SkdError::InvalidConfig(
                "max_char_len must be positive".into(),
            ));
        }
        if !self.comment.is_ascii() {
            return Err(SkdError::InvalidConfig("comment must be ASCII".into()));
        }
        Ok(())
    }
}

/// Everything a build run produces.
#[derive(Debug)]
pub struct BuildOutput {
    /// The finished dictionary bytes.
    pub buffer: DictBuffer,
    /// Entries in table order.
    pub entries: Vec<Entry>,
    /// Index keys in index order, with their builder counts.
    pub index: Vec<IndexKey>,
    pub report: ResolveReport,
}

/// Run the whole build: class sort, index construction, table arrangement,
/// serialization, and address resolution.
pub fn build(
    entries: Vec<Entry>,
    classes: &ClassTable,
    config: &BuildConfig,
    sink: &mut dyn DiagnosticSink,
) -> Result<BuildOutput> {
    config.validate()?;

    let sorted = sorter::sort_by_class(entries, classes, sink);
    info!(entries = sorted.len(), "sorted entries by class");

    let index = IndexBuilder::new(classes, config.cap, config.max_char_len).build(&sorted, sink);
    info!(keys = index.len(), cap = config.cap, "built prefix index");

    let table = sorter::arrange_by_index(sorted, &index)?;
    let mut buffer = writer::serialize(config.comment.as_bytes(), &table, &index)?;
    let report = resolver::resolve(&mut buffer, sink)?;
    info!(
        bytes = buffer.len(),
        resolved = report.resolved.len(),
        misses = report.misses.len(),
        "dictionary ready"
    );

    Ok(BuildOutput {
        buffer,
        entries: table,
        index,
        report,
    })
}
