use std::fs::File;
use std::io::Read;
use std::ops::Range;
use std::path::Path;

use crate::charset::KeyDisplay;
use crate::codec;
use crate::error::{Result, SkdError};
use crate::format::{
    expect_magic, Header, IndexRecord, TableEntry, MAGIC_INDEX, MAGIC_TABLE, REGION_PREFIX_SIZE,
};

/// Read-only view over a serialized SKD dictionary.
///
/// # Parse sequence
/// 1. Decode the header (magic check, comment, max key length).
/// 2. Check the `"IDX"` tag right after it and read the index body length.
/// 3. Check the `"TBL"` tag right after the index body and read its length.
///
/// Both bodies must lie inside the buffer. The total-length field is not
/// trusted here (it is zero before patching); [`DictView::verify`] checks it.
pub struct DictView<'a> {
    bytes: &'a [u8],
    header: Header,
    index_body: Range<usize>,
    table_body: Range<usize>,
}

impl<'a> DictView<'a> {
    pub fn parse(bytes: &'a [u8]) -> Result<Self> {
        let header = Header::read_from(bytes)?;
        let index_start = header.encoded_len();
        let index_body = region(bytes, index_start, MAGIC_INDEX)?;
        let table_body = region(bytes, index_body.end, MAGIC_TABLE)?;
        Ok(Self {
            bytes,
            header,
            index_body,
            table_body,
        })
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn bytes(&self) -> &'a [u8] {
        self.bytes
    }

    pub fn index_body(&self) -> Range<usize> {
        self.index_body.clone()
    }

    pub fn table_body(&self) -> Range<usize> {
        self.table_body.clone()
    }

    /// Decode every index record in file order.
    pub fn index_records(&self) -> Result<Vec<IndexRecord<'a>>> {
        let mut records = Vec::new();
        let mut at = self.index_body.start;
        while at < self.index_body.end {
            let (record, next) = IndexRecord::read_at(self.bytes, at)?;
            if next > self.index_body.end {
                return Err(SkdError::Format(format!(
                    "index record at {} runs past the index region end {}",
                    at, self.index_body.end
                )));
            }
            records.push(record);
            at = next;
        }
        Ok(records)
    }

    /// Iterate table entries from `offset` (an entry boundary) to the end
    /// of the table region.
    pub fn table_from(&self, offset: usize) -> TableIter<'a> {
        TableIter {
            bytes: self.bytes,
            at: offset.max(self.table_body.start),
            end: self.table_body.end,
        }
    }

    pub fn table_entries(&self) -> TableIter<'a> {
        self.table_from(self.table_body.start)
    }

    /// Check the finished file for internal consistency.
    ///
    /// Fails on structural damage (bad tags, truncated records, wrong total
    /// length, an address that is not an entry boundary or whose entry does
    /// not start with the record's prefix). Unresolved records are counted,
    /// not rejected.
    pub fn verify(&self) -> Result<VerifyReport> {
        let total = self.header.total_len as usize;
        if total != self.bytes.len() {
            return Err(SkdError::Format(format!(
                "header total length {} does not match buffer length {}",
                total,
                self.bytes.len()
            )));
        }
        if self.table_body.end != self.bytes.len() {
            return Err(SkdError::Format(format!(
                "{} trailing bytes after the table region",
                self.bytes.len() - self.table_body.end
            )));
        }

        let mut boundaries = Vec::new();
        for entry in self.table_entries() {
            boundaries.push(entry?.offset);
        }

        let records = self.index_records()?;
        let mut unresolved = 0;
        for record in &records {
            if !record.is_resolved() {
                unresolved += 1;
                continue;
            }
            let address = record.address as usize;
            if boundaries.binary_search(&address).is_err() {
                return Err(SkdError::Format(format!(
                    "index key {} points at {} which is not a table entry",
                    KeyDisplay(record.prefix),
                    address
                )));
            }
            let entry = TableEntry::read_at(self.bytes, address)?;
            if !entry.key.starts_with(record.prefix) {
                return Err(SkdError::Format(format!(
                    "index key {} points at entry {}",
                    KeyDisplay(record.prefix),
                    KeyDisplay(entry.key)
                )));
            }
        }

        Ok(VerifyReport {
            total_len: total,
            index_records: records.len(),
            unresolved,
            table_entries: boundaries.len(),
        })
    }
}

fn region(bytes: &[u8], start: usize, tag: &[u8; 3]) -> Result<Range<usize>> {
    expect_magic(bytes, start, tag)?;
    let body_len = codec::decode_u24(bytes, start + 3)? as usize;
    let body_start = start + REGION_PREFIX_SIZE;
    codec::take(bytes, body_start, body_len)?;
    Ok(body_start..body_start + body_len)
}

/// Forward iterator over table entries.
pub struct TableIter<'a> {
    bytes: &'a [u8],
    at: usize,
    end: usize,
}

impl<'a> Iterator for TableIter<'a> {
    type Item = Result<TableEntry<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.at >= self.end {
            return None;
        }
        match TableEntry::read_at(self.bytes, self.at) {
            Ok(entry) if entry.end() <= self.end => {
                self.at = entry.end();
                Some(Ok(entry))
            }
            Ok(entry) => {
                self.at = self.end;
                Some(Err(SkdError::Format(format!(
                    "table entry at {} runs past the table region end {}",
                    entry.offset, self.end
                ))))
            }
            Err(e) => {
                self.at = self.end;
                Some(Err(e))
            }
        }
    }
}

/// Outcome of [`DictView::verify`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyReport {
    pub total_len: usize,
    pub index_records: usize,
    pub unresolved: usize,
    pub table_entries: usize,
}

/// A dictionary file loaded into memory.
pub struct DictFile {
    bytes: Vec<u8>,
}

impl DictFile {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut file = File::open(path).map_err(|e| SkdError::io(path, e))?;
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)
            .map_err(|e| SkdError::io(path, e))?;
        Ok(Self { bytes })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn view(&self) -> Result<DictView<'_>> {
        DictView::parse(&self.bytes)
    }
}
