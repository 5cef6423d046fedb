//! SKD binary layout.
//!
//! ```text
//! "SKD" total_len:u24 comment_len:u16 comment[..] max_key_len:u16
//! "IDX" body_len:u24 { key_len:u8 key[..] address:u24 }*
//! "TBL" body_len:u24 { key_len:u8 key[..] cand_count:u8 cand_block_len:u16
//!                      { cand_len:u8 cand[..] }* }*
//! ```
//!
//! All integers are little-endian. Regions are back-to-back with no padding.
//! Region body lengths exclude the 6-byte tag + length prefix. Index
//! addresses are absolute byte offsets of a table entry from the file start.

use crate::codec::{self, U24_MAX};
use crate::entry::Entry;
use crate::error::{Result, SkdError};

pub const MAGIC_HEADER: &[u8; 3] = b"SKD";
pub const MAGIC_INDEX: &[u8; 3] = b"IDX";
pub const MAGIC_TABLE: &[u8; 3] = b"TBL";

/// Offset of the header's 24-bit total length field.
pub const TOTAL_LEN_OFFSET: usize = 3;

/// Header bytes excluding the comment:
///   magic[3] + total_len:u24 + comment_len:u16 + max_key_len:u16 = 10
pub const HEADER_FIXED_SIZE: usize = 10;

/// Tag + 24-bit body length in front of each region.
pub const REGION_PREFIX_SIZE: usize = 6;

/// Address written for index records no table entry matched.
pub const UNRESOLVED_ADDRESS: u32 = U24_MAX;

// ── Header ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    /// Byte length of the whole file; zero until patched.
    pub total_len: u32,
    pub comment: Vec<u8>,
    /// Longest entry key, in bytes.
    pub max_key_len: u16,
}

impl Header {
    pub fn encoded_len(&self) -> usize {
        HEADER_FIXED_SIZE + self.comment.len()
    }

    pub fn write_to(&self, buf: &mut Vec<u8>) -> Result<()> {
        buf.extend_from_slice(MAGIC_HEADER);
        codec::put_u24(buf, self.total_len as usize)?;
        codec::put_u16(buf, self.comment.len())?;
        buf.extend_from_slice(&self.comment);
        codec::put_u16(buf, self.max_key_len as usize)?;
        Ok(())
    }

    /// Decode the header at the start of `buf`, checking the magic.
    pub fn read_from(buf: &[u8]) -> Result<Self> {
        expect_magic(buf, 0, MAGIC_HEADER)?;
        let total_len = codec::decode_u24(buf, TOTAL_LEN_OFFSET)?;
        let comment_len = codec::decode_u16(buf, 6)? as usize;
        let comment = codec::take(buf, 8, comment_len)?.to_vec();
        let max_key_len = codec::decode_u16(buf, 8 + comment_len)?;
        Ok(Self {
            total_len,
            comment,
            max_key_len,
        })
    }
}

pub fn expect_magic(buf: &[u8], offset: usize, magic: &[u8; 3]) -> Result<()> {
    let found = codec::take(buf, offset, magic.len())?;
    if found != magic {
        return Err(SkdError::Format(format!(
            "expected {:?} tag at offset {}, found {:?}",
            String::from_utf8_lossy(magic),
            offset,
            String::from_utf8_lossy(found)
        )));
    }
    Ok(())
}

// ── Index records ──────────────────────────────────────────────────────────

/// Append one index record and return the offset of its address field.
pub fn write_index_record(buf: &mut Vec<u8>, prefix: &[u8], address: u32) -> Result<usize> {
    codec::put_u8(buf, prefix.len())?;
    buf.extend_from_slice(prefix);
    let address_offset = buf.len();
    codec::put_u24(buf, address as usize)?;
    Ok(address_offset)
}

/// A decoded index record borrowing its prefix from the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexRecord<'a> {
    pub prefix: &'a [u8],
    pub address: u32,
    /// Offset of the 24-bit address field, for patching.
    pub address_offset: usize,
}

impl<'a> IndexRecord<'a> {
    /// Decode the record at `offset`; returns it with the offset just past it.
    pub fn read_at(buf: &'a [u8], offset: usize) -> Result<(Self, usize)> {
        let key_len = codec::decode_u8(buf, offset)? as usize;
        let prefix = codec::take(buf, offset + 1, key_len)?;
        let address_offset = offset + 1 + key_len;
        let address = codec::decode_u24(buf, address_offset)?;
        let record = Self {
            prefix,
            address,
            address_offset,
        };
        Ok((record, address_offset + 3))
    }

    pub fn is_resolved(&self) -> bool {
        self.address != UNRESOLVED_ADDRESS
    }
}

// ── Table entries ──────────────────────────────────────────────────────────

pub fn write_table_entry(buf: &mut Vec<u8>, entry: &Entry) -> Result<()> {
    codec::put_u8(buf, entry.key().len())?;
    buf.extend_from_slice(entry.key());
    codec::put_u8(buf, entry.candidates().len())?;
    codec::put_u16(buf, entry.candidate_block_len())?;
    for candidate in entry.candidates() {
        codec::put_u8(buf, candidate.len())?;
        buf.extend_from_slice(candidate);
    }
    Ok(())
}

/// A decoded table entry borrowing from the buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableEntry<'a> {
    /// Absolute offset of the entry's first byte.
    pub offset: usize,
    pub key: &'a [u8],
    pub candidates: Vec<&'a [u8]>,
    /// Encoded byte length of the whole entry.
    pub len: usize,
}

impl<'a> TableEntry<'a> {
    pub fn read_at(buf: &'a [u8], offset: usize) -> Result<Self> {
        let key_len = codec::decode_u8(buf, offset)? as usize;
        let key = codec::take(buf, offset + 1, key_len)?;
        let mut at = offset + 1 + key_len;
        let count = codec::decode_u8(buf, at)? as usize;
        let block_len = codec::decode_u16(buf, at + 1)? as usize;
        at += 3;
        let block_end = at + block_len;
        codec::take(buf, at, block_len)?;

        let mut candidates = Vec::with_capacity(count);
        for _ in 0..count {
            let cand_len = codec::decode_u8(buf, at)? as usize;
            candidates.push(codec::take(buf, at + 1, cand_len)?);
            at += 1 + cand_len;
        }
        if at != block_end {
            return Err(SkdError::Format(format!(
                "table entry at {}: candidate block is {} bytes but candidates span {}",
                offset,
                block_len,
                at + block_len - block_end
            )));
        }
        Ok(Self {
            offset,
            key,
            candidates,
            len: block_end - offset,
        })
    }

    pub fn end(&self) -> usize {
        self.offset + self.len
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_layout_is_ten_bytes_plus_comment() {
        let header = Header {
            total_len: 0x010203,
            comment: b"LICENSE:GPL2+".to_vec(),
            max_key_len: 18,
        };
        let mut buf = Vec::new();
        header.write_to(&mut buf).unwrap();
        assert_eq!(buf.len(), header.encoded_len());
        assert_eq!(buf.len(), HEADER_FIXED_SIZE + 13);
        assert_eq!(&buf[..6], b"SKD\x03\x02\x01");
        assert_eq!(Header::read_from(&buf).unwrap(), header);
    }

    #[test]
    fn bad_magic_is_a_format_error() {
        let err = Header::read_from(b"SKX\0\0\0\0\0\0\0").unwrap_err();
        assert!(matches!(err, SkdError::Format(_)));
    }

    #[test]
    fn table_entry_fields() {
        let entry = Entry::new(b"ab".to_vec(), vec![b"X".to_vec(), b"YZ".to_vec()]).unwrap();
        let mut buf = vec![0xEE];
        write_table_entry(&mut buf, &entry).unwrap();
        assert_eq!(&buf[1..], b"\x02ab\x02\x05\x00\x01X\x02YZ");

        let decoded = TableEntry::read_at(&buf, 1).unwrap();
        assert_eq!(decoded.key, b"ab");
        assert_eq!(decoded.candidates, vec![&b"X"[..], &b"YZ"[..]]);
        assert_eq!(decoded.end(), buf.len());
    }

    #[test]
    fn inconsistent_candidate_block_is_rejected() {
        // block length says 4, candidates span 5
        let buf = b"\x01a\x02\x04\x00\x01X\x02YZ";
        assert!(matches!(
            TableEntry::read_at(buf, 0),
            Err(SkdError::Format(_))
        ));
    }

    #[test]
    fn index_record_reports_its_address_slot() {
        let mut buf = b"IDX\0\0\0".to_vec();
        let slot = write_index_record(&mut buf, b"ka", 0).unwrap();
        assert_eq!(slot, 6 + 1 + 2);
        let (record, next) = IndexRecord::read_at(&buf, 6).unwrap();
        assert_eq!(record.prefix, b"ka");
        assert_eq!(record.address_offset, slot);
        assert_eq!(next, buf.len());
        assert!(record.is_resolved());
    }
}
