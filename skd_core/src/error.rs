use std::path::PathBuf;

/// Result type used throughout `skd_core`.
pub type Result<T, E = SkdError> = std::result::Result<T, E>;

/// Fatal errors raised while building or reading back an SKD dictionary.
///
/// Address resolution misses are not errors; they are collected in
/// [`ResolveReport`](crate::resolver::ResolveReport) instead.
#[derive(Debug, thiserror::Error)]
pub enum SkdError {
    /// A value does not fit its fixed-width field.
    #[error("value {value} does not fit in a {bits}-bit field")]
    OutOfRange { value: u64, bits: u8 },

    /// A decode ran past the end of the available bytes.
    #[error("truncated data: {needed} bytes needed at offset {offset}, {available} available")]
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
    },

    /// A magic tag or structural field does not match the SKD layout.
    #[error("format error: {0}")]
    Format(String),

    /// An entry violates the shape rules (empty key, no candidates).
    #[error("invalid entry: {0}")]
    InvalidEntry(String),

    /// A build parameter is out of its allowed domain.
    #[error("invalid build configuration: {0}")]
    InvalidConfig(String),

    /// Reading or writing a dictionary file failed.
    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SkdError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
