use thiserror::Error;

/// Errors produced by the dictionary, taxonomy, and segment layers.
///
/// Failures fall into two families the caller is expected to treat
/// differently: contract violations (bad input from the caller, fail fast,
/// never corrected silently) and corruption (bad stored data, unrecoverable
/// for the affected structure, never retried internally).
#[derive(Error, Debug)]
pub enum Error {
    /// A key arrived at a builder out of lexicographic order, or duplicated
    /// the previous key.
    #[error("key out of order or duplicate: {0:?}")]
    OutOfOrderKey(String),

    /// A constructor or method argument was rejected.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Stored bytes failed validation. Carries the offset of the offending
    /// data; the structure must be re-fetched from a trusted source.
    #[error("corrupt data at offset {offset}: {detail}")]
    Corrupt { offset: u64, detail: String },

    /// The parent entry expected for an ordinal was absent or malformed.
    #[error("missing or malformed parent entry for ordinal {0}")]
    MissingParent(u32),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("metadata error: {0}")]
    Meta(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn corrupt(offset: u64, detail: impl Into<String>) -> Self {
        Error::Corrupt {
            offset,
            detail: detail.into(),
        }
    }

    /// True when the failure was caused by bad stored data rather than a
    /// caller mistake.
    pub fn is_corruption(&self) -> bool {
        matches!(self, Error::Corrupt { .. } | Error::MissingParent(_))
    }
}

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
