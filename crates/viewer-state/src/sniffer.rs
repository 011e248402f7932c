/// Works out how a file should be decoded before it is opened for viewing.
pub trait FileSniffer {
    /// `Ok(None)` means the file is not text.
    ///
    /// # Errors
    ///
    /// - `ViewerError::Io` if the file cannot be read.
    fn detect_encoding(
        &self,
        reader: &io::range_reader::RangeReader,
    ) -> viewer_core::errors::ViewerResult<Option<&'static encoding_rs::Encoding>>;

    /// `Ok(None)` means no terminator was found near the start of the file.
    ///
    /// # Errors
    ///
    /// - `ViewerError::Io` if the file cannot be read.
    fn detect_line_terminator(
        &self,
        reader: &io::range_reader::RangeReader,
        encoding: &'static encoding_rs::Encoding,
    ) -> viewer_core::errors::ViewerResult<Option<viewer_core::line_terminator::LineTerminator>>;
}

/// Looks only at the first `prefix_len` bytes of the file.
#[derive(Clone, Copy, Debug)]
pub struct ContentSniffer {
    prefix_len: u64,
}

impl Default for ContentSniffer {
    fn default() -> Self {
        Self { prefix_len: 4096 }
    }
}

impl ContentSniffer {
    #[must_use]
    pub fn with_prefix_len(prefix_len: u64) -> Self {
        Self { prefix_len }
    }
}

impl FileSniffer for ContentSniffer {
    fn detect_encoding(
        &self,
        reader: &io::range_reader::RangeReader,
    ) -> viewer_core::errors::ViewerResult<Option<&'static encoding_rs::Encoding>> {
        let prefix = reader.read_prefix(self.prefix_len)?;
        // The prefix may end mid-character only if the file goes on
        let cut = (prefix.len() as u64) < reader.file_size();
        let encoding = guess_encoding(&prefix, cut);

        tracing::debug!(
            path = %reader.path().display(),
            encoding = encoding.map(encoding_rs::Encoding::name),
            "sniffed encoding"
        );

        Ok(encoding)
    }

    fn detect_line_terminator(
        &self,
        reader: &io::range_reader::RangeReader,
        encoding: &'static encoding_rs::Encoding,
    ) -> viewer_core::errors::ViewerResult<Option<viewer_core::line_terminator::LineTerminator>>
    {
        let prefix = reader.read_prefix(self.prefix_len)?;
        let (text, _) = encoding.decode_without_bom_handling(&prefix);
        let terminator = find_terminator(text.as_bytes());

        tracing::debug!(
            path = %reader.path().display(),
            terminator = ?terminator,
            "sniffed line terminator"
        );

        Ok(terminator)
    }
}

fn guess_encoding(sample: &[u8], cut: bool) -> Option<&'static encoding_rs::Encoding> {
    if sample.is_empty() {
        return Some(encoding_rs::UTF_8);
    }

    if let Some((encoding, _)) = encoding_rs::Encoding::for_bom(sample) {
        return Some(encoding);
    }

    if sample.iter().any(|&b| is_binary_byte(b)) {
        return None;
    }

    match std::str::from_utf8(sample) {
        Ok(_) => return Some(encoding_rs::UTF_8),
        // Incomplete sequence at the end of a cut sample
        Err(e) if cut && e.error_len().is_none() => return Some(encoding_rs::UTF_8),
        Err(_) => {}
    }

    let mut detector = chardetng::EncodingDetector::new();

    detector.feed(sample, !cut);

    Some(detector.guess(None, true))
}

/// Control bytes that do not show up in text files.
fn is_binary_byte(byte: u8) -> bool {
    match byte {
        0x09..=0x0D | 0x1B => false,
        0x00..=0x1F | 0x7F => true,
        _ => false,
    }
}

fn find_terminator(text: &[u8]) -> Option<viewer_core::line_terminator::LineTerminator> {
    use viewer_core::line_terminator::LineTerminator;

    let lf = memchr::memchr(b'\n', text);
    let cr = memchr::memchr(b'\r', text);

    match (lf, cr) {
        (Some(lf), Some(cr)) if cr + 1 == lf => Some(LineTerminator::CrLf),
        (Some(lf), Some(cr)) if lf + 1 == cr => Some(LineTerminator::LfCr),
        (Some(lf), Some(cr)) if cr < lf => Some(LineTerminator::Cr),
        (Some(_), _) => Some(LineTerminator::Lf),
        (None, Some(_)) => Some(LineTerminator::Cr),
        (None, None) => None,
    }
}
