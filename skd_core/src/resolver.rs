//! Second pass: resolve index addresses against the serialized table.
//!
//! Index records are visited in file order with a table cursor that only
//! moves forward. For each record the scan starts just past the previous
//! match, skips entries that still begin with the previously matched prefix,
//! and stops at the first entry beginning with the record's prefix. A record
//! with no match gets [`UNRESOLVED_ADDRESS`] and is reported as a
//! [`LookupMiss`]; the run carries on.
//!
//! The buffer is read to compute a list of [`Patch`]es and only then
//! mutated, so no view into it is alive while addresses are written.

use crate::codec::U24_MAX;
use crate::diag::{Diagnostic, DiagnosticSink};
use crate::error::{Result, SkdError};
use crate::format::UNRESOLVED_ADDRESS;
use crate::reader::DictView;
use crate::writer::{DictBuffer, Patch};

/// An index record no table entry matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupMiss {
    /// Zero-based position of the record in the index region.
    pub record: usize,
    pub prefix: Vec<u8>,
}

/// A resolved `(prefix, address)` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub prefix: Vec<u8>,
    pub address: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolveReport {
    /// Successfully resolved records, in index order.
    pub resolved: Vec<Resolved>,
    pub misses: Vec<LookupMiss>,
}

impl ResolveReport {
    pub fn is_complete(&self) -> bool {
        self.misses.is_empty()
    }
}

/// Resolve every index address in `buffer` in place.
pub fn resolve(buffer: &mut DictBuffer, sink: &mut dyn DiagnosticSink) -> Result<ResolveReport> {
    let (patches, report) = plan(buffer.as_bytes(), sink)?;
    buffer.apply(&patches)?;
    Ok(report)
}

fn plan(bytes: &[u8], sink: &mut dyn DiagnosticSink) -> Result<(Vec<Patch>, ResolveReport)> {
    let view = DictView::parse(bytes)?;
    let records = view.index_records()?;

    let mut patches = Vec::with_capacity(records.len());
    let mut report = ResolveReport::default();
    let mut cursor = view.table_body().start;
    let mut previous: Option<&[u8]> = None;

    for (i, record) in records.iter().enumerate() {
        let mut found = None;
        for entry in view.table_from(cursor) {
            let entry = entry?;
            if previous.is_some_and(|p| entry.key.starts_with(p)) {
                continue;
            }
            if entry.key.starts_with(record.prefix) {
                found = Some((entry.offset, entry.end()));
                break;
            }
        }

        match found {
            Some((offset, end)) => {
                let address = u32::try_from(offset)
                    .ok()
                    .filter(|a| *a < U24_MAX)
                    .ok_or(SkdError::OutOfRange {
                        value: offset as u64,
                        bits: 24,
                    })?;
                patches.push(Patch {
                    offset: record.address_offset,
                    value: address,
                });
                report.resolved.push(Resolved {
                    prefix: record.prefix.to_vec(),
                    address,
                });
                cursor = end;
                previous = Some(record.prefix);
            }
            None => {
                patches.push(Patch {
                    offset: record.address_offset,
                    value: UNRESOLVED_ADDRESS,
                });
                sink.record(Diagnostic::LookupMiss {
                    record: i,
                    prefix: record.prefix.to_vec(),
                });
                report.misses.push(LookupMiss {
                    record: i,
                    prefix: record.prefix.to_vec(),
                });
            }
        }
    }

    Ok((patches, report))
}
