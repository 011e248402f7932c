pub type ReadResult<T> = Result<T, ReadError>;

#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    /// `start..=end` is empty, reversed, or reaches past the end of the file.
    #[error("invalid byte range {start}..={end} (file size {file_size})")]
    InvalidRange { start: u64, end: u64, file_size: u64 },

    /// The underlying read failed, or the file shrank under us.
    #[error("failed to read {path}: {source}")]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ReadError {
    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        ReadError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}
