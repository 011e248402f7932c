pub type ViewerResult<T> = Result<T, ViewerError>;

#[derive(Debug, thiserror::Error)]
pub enum ViewerError {
    #[error("invalid byte range {start}..={end} (file size {file_size})")]
    InvalidRange { start: u64, end: u64, file_size: u64 },

    #[error("address {addr:#012X} ({addr}) outside block {block_start:#012X}..={block_end:#012X}")]
    AddressOutOfRange {
        addr: u64,
        block_start: u64,
        block_end: u64,
    },

    #[error("char index {index} out of range (len={len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error(transparent)]
    Io(io::errors::ReadError),

    #[error("file is not recognised as text")]
    NotATextFile,

    /// Decoding produced more bytes than the block holds. Recovered inside
    /// [`crate::text_block::TextBlock::build`] by truncation.
    #[error("decoded characters account for {decoded} of {available} bytes")]
    EncodingMismatch { decoded: u64, available: u64 },

    #[error("no text block is loaded")]
    NoBlockLoaded,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl From<io::errors::ReadError> for ViewerError {
    fn from(value: io::errors::ReadError) -> Self {
        match value {
            io::errors::ReadError::InvalidRange {
                start,
                end,
                file_size,
            } => ViewerError::InvalidRange {
                start,
                end,
                file_size,
            },
            other => ViewerError::Io(other),
        }
    }
}

impl ViewerError {
    /// Whether the error leaves the viewer usable (the failed navigation is
    /// simply not applied).
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ViewerError::Io(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_errors_convert() {
        let invalid: ViewerError = io::errors::ReadError::InvalidRange {
            start: 9,
            end: 3,
            file_size: 10,
        }
        .into();

        assert!(matches!(
            invalid,
            ViewerError::InvalidRange {
                start: 9,
                end: 3,
                file_size: 10
            }
        ));
        assert!(!invalid.is_recoverable());

        let failed: ViewerError = io::errors::ReadError::Io {
            path: std::path::PathBuf::from("gone.log"),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        }
        .into();

        assert!(matches!(failed, ViewerError::Io(_)));
        assert!(failed.is_recoverable());
        assert!(!ViewerError::NoBlockLoaded.is_recoverable());
    }
}
