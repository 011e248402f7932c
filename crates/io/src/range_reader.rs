use std::io::{Read, Seek};

/// How [`RangeReader::read`] pulls bytes off disk.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReadStrategy {
    /// Map the requested region read-only and copy out of the mapping,
    /// falling back to [`ReadStrategy::Buffered`] if the platform refuses.
    #[default]
    Mapped,
    /// Seek and `read_exact` through an ordinary file handle.
    Buffered,
}

/// Reads inclusive `[start, end]` byte ranges out of one file.
///
/// Holds no file handle and no cached bytes: every call reopens the file,
/// so a reader can be shared freely and called re-entrantly. Caching is
/// the caller's job.
#[derive(Clone, Debug)]
pub struct RangeReader {
    path: std::path::PathBuf,
    /// Size observed when the reader was created. Ranges are validated
    /// against this, reads are validated against the live size.
    file_size: u64,
    strategy: ReadStrategy,
}

impl RangeReader {
    /// # Errors
    ///
    /// - `ReadError::Io` if the file metadata cannot be read or the path is not a regular file.
    pub fn open(path: impl AsRef<std::path::Path>) -> crate::errors::ReadResult<Self> {
        let path = path.as_ref().to_path_buf();
        let metadata =
            std::fs::metadata(&path).map_err(|e| crate::errors::ReadError::io(&path, e))?;

        if !metadata.is_file() {
            return Err(crate::errors::ReadError::io(
                &path,
                std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a regular file"),
            ));
        }

        tracing::debug!(path = %path.display(), size = metadata.len(), "opened range reader");

        Ok(Self {
            path,
            file_size: metadata.len(),
            strategy: ReadStrategy::default(),
        })
    }

    #[must_use]
    pub fn with_strategy(mut self, strategy: ReadStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// File length in bytes, as seen at open time.
    #[inline]
    #[must_use]
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.file_size == 0
    }

    #[inline]
    #[must_use]
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    #[inline]
    #[must_use]
    pub fn strategy(&self) -> ReadStrategy {
        self.strategy
    }

    /// Returns an exact copy of bytes `start..=end`.
    ///
    /// # Errors
    ///
    /// - `ReadError::InvalidRange` unless `start <= end < file_size`.
    /// - `ReadError::Io` if the file cannot be read, or has been truncated so
    ///   that the range no longer exists. Partial data is never returned.
    pub fn read(&self, start: u64, end: u64) -> crate::errors::ReadResult<Vec<u8>> {
        let invalid = || crate::errors::ReadError::InvalidRange {
            start,
            end,
            file_size: self.file_size,
        };

        if start > end || end >= self.file_size {
            return Err(invalid());
        }

        // end < file_size, so this cannot overflow
        let len = <u64 as TryInto<usize>>::try_into(end - start + 1).map_err(|_| invalid())?;
        let file =
            std::fs::File::open(&self.path).map_err(|e| crate::errors::ReadError::io(&self.path, e))?;
        let live_len = file
            .metadata()
            .map_err(|e| crate::errors::ReadError::io(&self.path, e))?
            .len();

        // Touching a mapping past EOF faults the process, so this has to be
        // checked before mapping, not after.
        if end >= live_len {
            return Err(crate::errors::ReadError::io(
                &self.path,
                std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    format!("file truncated to {live_len} bytes since open"),
                ),
            ));
        }

        let bytes = match self.strategy {
            ReadStrategy::Mapped => match Self::read_mapped(&file, start, len) {
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::debug!(error = %e, "mapping failed, falling back to buffered read");
                    self.read_buffered(file, start, len)?
                }
            },
            ReadStrategy::Buffered => self.read_buffered(file, start, len)?,
        };

        tracing::trace!(start, end, len = bytes.len(), "read byte range");

        Ok(bytes)
    }

    /// Reads up to `max_len` bytes from the start of the file. Returns an
    /// empty vector for an empty file.
    ///
    /// # Errors
    ///
    /// Same as [`RangeReader::read`].
    pub fn read_prefix(&self, max_len: u64) -> crate::errors::ReadResult<Vec<u8>> {
        let len = std::cmp::min(max_len, self.file_size);

        if len == 0 {
            return Ok(Vec::new());
        }

        self.read(0, len - 1)
    }

    fn read_mapped(file: &std::fs::File, start: u64, len: usize) -> std::io::Result<Vec<u8>> {
        // SAFETY:
        // - File is opened read-only
        // - The range was checked against the live file length above
        // - The mapping is copied out and dropped before returning
        let mmap = unsafe { memmap2::MmapOptions::new().offset(start).len(len).map(file)? };

        Ok(mmap.to_vec())
    }

    fn read_buffered(
        &self,
        mut file: std::fs::File,
        start: u64,
        len: usize,
    ) -> crate::errors::ReadResult<Vec<u8>> {
        let mut bytes = vec![0u8; len];

        file.seek(std::io::SeekFrom::Start(start))
            .and_then(|_| file.read_exact(&mut bytes))
            .map_err(|e| crate::errors::ReadError::io(&self.path, e))?;

        Ok(bytes)
    }
}
