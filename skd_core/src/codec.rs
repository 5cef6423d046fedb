//! Fixed-width little-endian integer fields.
//!
//! Every SKD integer is an unsigned 8, 16, or 24-bit little-endian value.
//! Encoders refuse values that do not fit their width and decoders refuse to
//! read past the end of the slice; nothing wraps or truncates silently.

use crate::error::{Result, SkdError};

/// Largest value of an 8-bit field.
pub const U8_MAX: u32 = 0xFF;
/// Largest value of a 16-bit field.
pub const U16_MAX: u32 = 0xFFFF;
/// Largest value of a 24-bit field; also the unresolved-address sentinel.
pub const U24_MAX: u32 = 0xFF_FFFF;

fn check(value: usize, max: u32, bits: u8) -> Result<u32> {
    if value as u64 > max as u64 {
        return Err(SkdError::OutOfRange {
            value: value as u64,
            bits,
        });
    }
    Ok(value as u32)
}

/// Encode one byte; `OutOfRange` above [`U8_MAX`].
pub fn encode_u8(value: usize) -> Result<[u8; 1]> {
    let v = check(value, U8_MAX, 8)?;
    Ok([v as u8])
}

/// Encode a 16-bit LE field; `OutOfRange` above [`U16_MAX`].
pub fn encode_u16(value: usize) -> Result<[u8; 2]> {
    let v = check(value, U16_MAX, 16)?;
    Ok((v as u16).to_le_bytes())
}

/// Encode a 24-bit LE field; `OutOfRange` above [`U24_MAX`].
pub fn encode_u24(value: usize) -> Result<[u8; 3]> {
    let v = check(value, U24_MAX, 24)?;
    let b = v.to_le_bytes();
    Ok([b[0], b[1], b[2]])
}

/// Borrow `len` bytes at `offset`, or fail with [`SkdError::Truncated`].
pub fn take(buf: &[u8], offset: usize, len: usize) -> Result<&[u8]> {
    offset
        .checked_add(len)
        .and_then(|end| buf.get(offset..end))
        .ok_or(SkdError::Truncated {
            offset,
            needed: len,
            available: buf.len().saturating_sub(offset),
        })
}

/// Read the byte at `offset`; `Truncated` past the end.
pub fn decode_u8(buf: &[u8], offset: usize) -> Result<u8> {
    Ok(take(buf, offset, 1)?[0])
}

/// Read the 16-bit LE field at `offset`; `Truncated` if fewer than 2 bytes remain.
pub fn decode_u16(buf: &[u8], offset: usize) -> Result<u16> {
    let b = take(buf, offset, 2)?;
    Ok(u16::from_le_bytes([b[0], b[1]]))
}

/// Read the 24-bit LE field at `offset`; `Truncated` if fewer than 3 bytes remain.
pub fn decode_u24(buf: &[u8], offset: usize) -> Result<u32> {
    let b = take(buf, offset, 3)?;
    Ok(u32::from_le_bytes([b[0], b[1], b[2], 0]))
}

/// Append one byte; `OutOfRange` above [`U8_MAX`].
pub fn put_u8(buf: &mut Vec<u8>, value: usize) -> Result<()> {
    buf.extend_from_slice(&encode_u8(value)?);
    Ok(())
}

/// Append a 16-bit LE field; `OutOfRange` above [`U16_MAX`].
pub fn put_u16(buf: &mut Vec<u8>, value: usize) -> Result<()> {
    buf.extend_from_slice(&encode_u16(value)?);
    Ok(())
}

/// Append a 24-bit LE field; `OutOfRange` above [`U24_MAX`].
pub fn put_u24(buf: &mut Vec<u8>, value: usize) -> Result<()> {
    buf.extend_from_slice(&encode_u24(value)?);
    Ok(())
}

/// Overwrite the 24-bit field at `offset` in place.
pub fn patch_u24(buf: &mut [u8], offset: usize, value: usize) -> Result<()> {
    let bytes = encode_u24(value)?;
    let available = buf.len().saturating_sub(offset);
    if available < 3 {
        return Err(SkdError::Truncated {
            offset,
            needed: 3,
            available,
        });
    }
    buf[offset..offset + 3].copy_from_slice(&bytes);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundary_values_round_trip() {
        for v in [0usize, 255] {
            assert_eq!(decode_u8(&encode_u8(v).unwrap(), 0).unwrap() as usize, v);
        }
        for v in [0usize, 255, 256, 65535] {
            assert_eq!(decode_u16(&encode_u16(v).unwrap(), 0).unwrap() as usize, v);
        }
        for v in [0usize, 255, 256, 65535, 65536, 16_777_215] {
            assert_eq!(decode_u24(&encode_u24(v).unwrap(), 0).unwrap() as usize, v);
        }
    }

    #[test]
    fn out_of_range_is_rejected() {
        assert!(matches!(
            encode_u8(256),
            Err(SkdError::OutOfRange { value: 256, bits: 8 })
        ));
        assert!(matches!(
            encode_u16(65536),
            Err(SkdError::OutOfRange { value: 65536, bits: 16 })
        ));
        assert!(matches!(
            encode_u24(16_777_216),
            Err(SkdError::OutOfRange {
                value: 16_777_216,
                bits: 24
            })
        ));
    }

    #[test]
    fn little_endian_layout() {
        assert_eq!(encode_u16(0x1234).unwrap(), [0x34, 0x12]);
        assert_eq!(encode_u24(0x123456).unwrap(), [0x56, 0x34, 0x12]);
    }

    #[test]
    fn short_slices_are_truncated() {
        assert!(matches!(
            decode_u24(&[1, 2], 0),
            Err(SkdError::Truncated {
                offset: 0,
                needed: 3,
                available: 2
            })
        ));
        assert!(matches!(decode_u16(&[1, 2, 3], 2), Err(SkdError::Truncated { .. })));
        assert!(matches!(decode_u8(&[], 5), Err(SkdError::Truncated { .. })));
    }

    #[test]
    fn empty_read_past_the_end_is_truncated() {
        let buf = [1, 2, 3];
        assert_eq!(take(&buf, 3, 0).unwrap(), &[] as &[u8]);
        assert!(matches!(
            take(&buf, 5, 0),
            Err(SkdError::Truncated {
                offset: 5,
                needed: 0,
                available: 0
            })
        ));
        assert!(matches!(
            take(&buf, usize::MAX, 2),
            Err(SkdError::Truncated { .. })
        ));
    }

    #[test]
    fn patch_overwrites_in_place() {
        let mut buf = vec![0xAA; 6];
        patch_u24(&mut buf, 2, 0xFF_FFFF).unwrap();
        assert_eq!(buf, [0xAA, 0xAA, 0xFF, 0xFF, 0xFF, 0xAA]);
        assert!(patch_u24(&mut buf, 4, 1).is_err());
    }
}
