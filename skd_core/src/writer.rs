use std::fs::File;
use std::io::Write;
use std::path::Path;

use tracing::debug;

use crate::codec;
use crate::entry::Entry;
use crate::error::{Result, SkdError};
use crate::format::{
    self, Header, MAGIC_INDEX, MAGIC_TABLE, REGION_PREFIX_SIZE, TOTAL_LEN_OFFSET,
};
use crate::index::IndexKey;

/// A fixed-width 24-bit overwrite at an absolute buffer offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Patch {
    pub offset: usize,
    pub value: u32,
}

/// Owned byte arena holding one SKD dictionary.
///
/// The buffer only grows while it is being serialized; afterwards it changes
/// only through [`DictBuffer::apply`], which performs fixed-size in-place
/// writes and never moves or resizes anything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DictBuffer {
    bytes: Vec<u8>,
}

impl DictBuffer {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Apply 24-bit patches in order.
    pub fn apply(&mut self, patches: &[Patch]) -> Result<()> {
        for patch in patches {
            codec::patch_u24(&mut self.bytes, patch.offset, patch.value as usize)?;
        }
        Ok(())
    }

    /// Write the buffer to `path`, replacing any existing file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let mut file = File::create(path).map_err(|e| SkdError::io(path, e))?;
        file.write_all(&self.bytes)
            .and_then(|_| file.flush())
            .map_err(|e| SkdError::io(path, e))
    }
}

/// Serializer for SKD dictionaries.
///
/// # Layout written
/// ```text
/// [HEADER: "SKD", total_len = 0 placeholder, comment, max_key_len]
/// [INDEX:  "IDX", body_len, records with address = 0 placeholder]
/// [TABLE:  "TBL", body_len, entries in table order]
/// ← patch body lengths as each region closes, total_len last
/// ```
///
/// Index records appear in `index` order and table entries in `entries`
/// order; both orders are the caller's responsibility (see
/// [`crate::sorter::arrange_by_index`]). Addresses stay zero until the
/// [`resolver`](crate::resolver) runs.
pub struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    pub fn new(comment: &[u8], max_key_len: usize) -> Result<Self> {
        let header = Header {
            total_len: 0,
            comment: comment.to_vec(),
            max_key_len: u16::try_from(max_key_len).map_err(|_| SkdError::OutOfRange {
                value: max_key_len as u64,
                bits: 16,
            })?,
        };
        let mut buf = Vec::with_capacity(header.encoded_len());
        header.write_to(&mut buf)?;
        Ok(Self { buf })
    }

    pub fn write_index(&mut self, index: &[IndexKey]) -> Result<()> {
        let start = self.open_region(MAGIC_INDEX);
        for key in index {
            format::write_index_record(&mut self.buf, key.prefix(), 0)?;
        }
        self.close_region(start)
    }

    pub fn write_table(&mut self, entries: &[Entry]) -> Result<()> {
        let start = self.open_region(MAGIC_TABLE);
        for entry in entries {
            format::write_table_entry(&mut self.buf, entry)?;
        }
        self.close_region(start)
    }

    /// Patch the header's total length and hand over the buffer.
    pub fn finish(mut self) -> Result<DictBuffer> {
        let total = self.buf.len();
        codec::patch_u24(&mut self.buf, TOTAL_LEN_OFFSET, total)?;
        debug!(bytes = total, "serialized dictionary");
        Ok(DictBuffer { bytes: self.buf })
    }

    fn open_region(&mut self, tag: &[u8; 3]) -> usize {
        let start = self.buf.len();
        self.buf.extend_from_slice(tag);
        self.buf.extend_from_slice(&[0, 0, 0]);
        start
    }

    fn close_region(&mut self, start: usize) -> Result<()> {
        let body_len = self.buf.len() - start - REGION_PREFIX_SIZE;
        codec::patch_u24(&mut self.buf, start + 3, body_len)
    }
}

/// Serialize header, index, and table in one go.
pub fn serialize(comment: &[u8], entries: &[Entry], index: &[IndexKey]) -> Result<DictBuffer> {
    let max_key_len = entries.iter().map(|e| e.key().len()).max().unwrap_or(0);
    let mut writer = Writer::new(comment, max_key_len)?;
    writer.write_index(index)?;
    writer.write_table(entries)?;
    writer.finish()
}
