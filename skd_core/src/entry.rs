use crate::codec::U8_MAX;
use crate::error::{Result, SkdError};

/// One dictionary entry: a reading key and its ordered conversion candidates.
///
/// The first candidate is the default conversion. Shape is checked once in
/// [`Entry::new`]; the value is immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    key: Vec<u8>,
    candidates: Vec<Vec<u8>>,
}

impl Entry {
    pub fn new(key: Vec<u8>, candidates: Vec<Vec<u8>>) -> Result<Self> {
        if key.is_empty() {
            return Err(SkdError::InvalidEntry("empty key".into()));
        }
        if candidates.is_empty() {
            return Err(SkdError::InvalidEntry(format!(
                "key {} has no candidates",
                crate::KeyDisplay(&key)
            )));
        }
        fit_u8(key.len())?;
        fit_u8(candidates.len())?;
        for c in &candidates {
            fit_u8(c.len())?;
        }
        Ok(Self { key, candidates })
    }

    pub fn key(&self) -> &[u8] {
        &self.key
    }

    pub fn candidates(&self) -> &[Vec<u8>] {
        &self.candidates
    }

    /// Byte length of the candidate block: one length byte plus the bytes of
    /// each candidate.
    pub fn candidate_block_len(&self) -> usize {
        self.candidates.iter().map(|c| 1 + c.len()).sum()
    }
}

fn fit_u8(value: usize) -> Result<()> {
    if value as u64 > U8_MAX as u64 {
        return Err(SkdError::OutOfRange {
            value: value as u64,
            bits: 8,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_bad_shapes() {
        assert!(matches!(
            Entry::new(Vec::new(), vec![b"x".to_vec()]),
            Err(SkdError::InvalidEntry(_))
        ));
        assert!(matches!(
            Entry::new(b"k".to_vec(), Vec::new()),
            Err(SkdError::InvalidEntry(_))
        ));
        assert!(matches!(
            Entry::new(vec![b'k'; 256], vec![b"x".to_vec()]),
            Err(SkdError::OutOfRange { value: 256, bits: 8 })
        ));
        assert!(matches!(
            Entry::new(b"k".to_vec(), vec![b"x".to_vec(); 256]),
            Err(SkdError::OutOfRange { value: 256, bits: 8 })
        ));
    }

    #[test]
    fn candidate_block_counts_length_prefixes() {
        let e = Entry::new(b"k".to_vec(), vec![b"ab".to_vec(), b"cde".to_vec()]).unwrap();
        assert_eq!(e.candidate_block_len(), 3 + 4);
    }
}
