/// Decoded text of one contiguous byte range of a file, with the
/// address ↔ character index maps for that range.
///
/// - [`TextBlock::index_of`] maps every covered byte to the character it belongs to.
/// - [`TextBlock::address_of`] maps every character to the address of its first byte.
///
/// A character cut in half by the end of the range is dropped, so the block
/// may cover fewer bytes than it was built from (see [`TextBlock::end_addr`]).
#[derive(Debug)]
pub struct TextBlock {
    offset_addr: crate::address::Address,
    /// Bytes handed to `build`, including any dropped tail.
    source_len: usize,
    encoding: &'static encoding_rs::Encoding,
    text: String,
    /// Byte offset into `text` of each character, plus a trailing `text.len()`.
    char_starts: Vec<usize>,
    /// Character index -> address of its first byte.
    address_of_index: Vec<crate::address::Address>,
    /// (address - offset) -> character index. One entry per covered byte.
    index_of_address: Vec<usize>,
}

/*

====================
===== CREATION =====
====================

*/

/// Running state while characters are laid over the source bytes.
struct Layout {
    text_len_mapped: usize,
    /// Bytes already assigned to a character.
    mapped_until: usize,
    char_starts: Vec<usize>,
    address_of_index: Vec<crate::address::Address>,
    index_of_address: Vec<usize>,
    mismatched: bool,
}

impl Layout {
    fn with_capacity(len: usize) -> Self {
        Self {
            text_len_mapped: 0,
            mapped_until: 0,
            char_starts: Vec::with_capacity(len + 1),
            address_of_index: Vec::with_capacity(len),
            index_of_address: Vec::with_capacity(len),
            mismatched: false,
        }
    }

    /// Gives the next character the bytes `mapped_until..span_end`.
    fn push_char(&mut self, offset_addr: u64, text_offset: usize, span_end: usize) {
        let index = self.address_of_index.len();

        self.char_starts.push(text_offset);
        self.address_of_index
            .push(offset_addr + self.mapped_until as u64);
        self.index_of_address
            .resize(self.index_of_address.len() + (span_end - self.mapped_until), index);
        self.mapped_until = span_end;
    }

    /// Assigns the characters decoded into `text[self.text_len_mapped..]` to
    /// the bytes `self.mapped_until..byte_end`.
    fn map_run(
        &mut self,
        offset_addr: u64,
        encoding: &'static encoding_rs::Encoding,
        text: &str,
        byte_end: usize,
    ) {
        let run = &text[self.text_len_mapped..];
        let char_count = run.chars().count();

        if char_count == 0 {
            // Bytes that decoded to nothing (shift sequences) belong to the
            // previous character, or to the next one if there is none yet.
            if let Some(last) = self.address_of_index.len().checked_sub(1) {
                self.index_of_address
                    .resize(self.index_of_address.len() + (byte_end - self.mapped_until), last);
                self.mapped_until = byte_end;
            }

            return;
        }

        for (n, (rel, ch)) in run.char_indices().enumerate() {
            let remaining = byte_end - self.mapped_until;
            let chars_after = char_count - n - 1;
            let expected = crate::encoding::encoded_len(encoding, ch);
            let len = if chars_after == 0 {
                remaining
            } else {
                expected
                    .min(remaining.saturating_sub(chars_after))
                    .max(1)
                    .min(remaining)
            };

            if len != expected {
                self.mismatched = true;
            }

            self.push_char(
                offset_addr,
                self.text_len_mapped + rel,
                self.mapped_until + len,
            );
        }

        self.text_len_mapped = text.len();
    }
}

impl TextBlock {
    /// Decodes `bytes` (read from `offset_addr`) under `encoding`.
    ///
    /// Malformed sequences inside the range become U+FFFD, each mapped to
    /// exactly the bytes it replaced. A malformed or incomplete sequence at
    /// the very end is treated as a character cut by the range boundary and
    /// dropped.
    ///
    /// # Errors
    ///
    /// - `ViewerError::EncodingMismatch` if the decoder cannot size its output
    ///   (only possible for inputs near `usize::MAX`).
    pub fn build(
        offset_addr: crate::address::Address,
        bytes: &[u8],
        encoding: &'static encoding_rs::Encoding,
    ) -> crate::errors::ViewerResult<Self> {
        if crate::encoding::is_stateful(encoding) {
            tracing::warn!(
                encoding = encoding.name(),
                "stateful encoding: character addresses are approximate"
            );
        }

        let mut decoder = encoding.new_decoder_without_bom_handling();
        let mut text = String::new();
        let mut layout = Layout::with_capacity(bytes.len());
        let mut read_total = 0usize;

        loop {
            let remaining = &bytes[read_total..];
            let needed = decoder
                .max_utf8_buffer_length_without_replacement(remaining.len())
                .ok_or(crate::errors::ViewerError::EncodingMismatch {
                    decoded: 0,
                    available: bytes.len() as u64,
                })?;

            text.reserve(needed);

            let (result, read) =
                decoder.decode_to_string_without_replacement(remaining, &mut text, true);

            read_total += read;

            match result {
                encoding_rs::DecoderResult::InputEmpty => {
                    layout.map_run(offset_addr, encoding, &text, read_total);
                    break;
                }
                encoding_rs::DecoderResult::OutputFull => continue,
                encoding_rs::DecoderResult::Malformed(bad, extra) => {
                    let resume = read_total - usize::from(extra);
                    let bad_start = resume - usize::from(bad);

                    layout.map_run(offset_addr, encoding, &text, bad_start);

                    if read_total == bytes.len() && extra == 0 {
                        let err = crate::errors::ViewerError::EncodingMismatch {
                            decoded: bad_start as u64,
                            available: bytes.len() as u64,
                        };

                        tracing::debug!(
                            offset = %crate::address::format_address(offset_addr),
                            dropped = bad,
                            "{err}; dropping character cut by block end"
                        );
                        break;
                    }

                    let replacement_at = text.len();

                    text.push(char::REPLACEMENT_CHARACTER);
                    layout.push_char(offset_addr, replacement_at, resume);
                    layout.text_len_mapped = text.len();
                }
            }
        }

        // Anything decoded but never laid over bytes (zero-width tail) is cut.
        text.truncate(layout.text_len_mapped);

        if layout.mismatched {
            tracing::warn!(
                offset = %crate::address::format_address(offset_addr),
                encoding = encoding.name(),
                "re-encoded character widths disagree with source bytes"
            );
        }

        let Layout {
            mut char_starts,
            address_of_index,
            index_of_address,
            ..
        } = layout;

        char_starts.push(text.len());
        text.shrink_to_fit();

        tracing::trace!(
            offset = %crate::address::format_address(offset_addr),
            bytes = bytes.len(),
            chars = address_of_index.len(),
            "built text block"
        );

        Ok(Self {
            offset_addr,
            source_len: bytes.len(),
            encoding,
            text,
            char_starts,
            address_of_index,
            index_of_address,
        })
    }
}

/*

==========================
===== INLINE METHODS =====
==========================

*/

impl TextBlock {
    /// Address of the first byte of the block.
    #[inline]
    #[must_use]
    pub fn offset_addr(&self) -> crate::address::Address {
        self.offset_addr
    }

    /// Address of the last byte that belongs to a decoded character.
    /// Equal to `offset_addr - 1` (saturating) for an empty block.
    #[inline]
    #[must_use]
    pub fn end_addr(&self) -> crate::address::Address {
        (self.offset_addr + self.covered_len() as u64).saturating_sub(1)
    }

    /// Number of bytes mapped to characters.
    #[inline]
    #[must_use]
    pub fn covered_len(&self) -> usize {
        self.index_of_address.len()
    }

    /// Number of bytes the block was built from.
    #[inline]
    #[must_use]
    pub fn source_len(&self) -> usize {
        self.source_len
    }

    #[inline]
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Length of the text in characters.
    #[inline]
    #[must_use]
    pub fn char_len(&self) -> usize {
        self.address_of_index.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.address_of_index.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn encoding(&self) -> &'static encoding_rs::Encoding {
        self.encoding
    }

    #[inline]
    #[must_use]
    pub fn contains(&self, addr: crate::address::Address) -> bool {
        addr >= self.offset_addr && addr - self.offset_addr < self.covered_len() as u64
    }
}

/*

===========================
========= GETTERS =========
===========================

*/

impl TextBlock {
    /// Character index of the character the byte at `addr` belongs to.
    ///
    /// # Errors
    ///
    /// - `ViewerError::AddressOutOfRange` if `addr` is not covered by this block.
    #[inline]
    pub fn index_of(&self, addr: crate::address::Address) -> crate::errors::ViewerResult<usize> {
        if !self.contains(addr) {
            return Err(self.out_of_range(addr));
        }

        Ok(self.index_of_address[(addr - self.offset_addr) as usize])
    }

    /// Address of the first byte of character `index`.
    ///
    /// # Errors
    ///
    /// - `ViewerError::IndexOutOfRange` if `index >= char_len()`.
    #[inline]
    pub fn address_of(&self, index: usize) -> crate::errors::ViewerResult<crate::address::Address> {
        self.address_of_index
            .get(index)
            .copied()
            .ok_or(crate::errors::ViewerError::IndexOutOfRange {
                index,
                len: self.char_len(),
            })
    }

    /// Address of the last byte of character `index`.
    ///
    /// # Errors
    ///
    /// - `ViewerError::IndexOutOfRange` if `index >= char_len()`.
    pub fn end_address_of(
        &self,
        index: usize,
    ) -> crate::errors::ViewerResult<crate::address::Address> {
        self.address_of(index)?;

        match self.address_of_index.get(index + 1) {
            Some(next) => Ok(next - 1),
            None => Ok(self.end_addr()),
        }
    }

    /// Text of the characters `start..end` (exclusive, character indices).
    ///
    /// # Errors
    ///
    /// - `ViewerError::IndexOutOfRange` if `start > end` or `end > char_len()`.
    pub fn slice_chars(&self, start: usize, end: usize) -> crate::errors::ViewerResult<&str> {
        if end > self.char_len() {
            return Err(crate::errors::ViewerError::IndexOutOfRange {
                index: end,
                len: self.char_len(),
            });
        }

        if start > end {
            return Err(crate::errors::ViewerError::IndexOutOfRange {
                index: start,
                len: end,
            });
        }

        Ok(&self.text[self.char_starts[start]..self.char_starts[end]])
    }

    /// Text of every character touched by `start_addr..=end_addr`.
    ///
    /// # Errors
    ///
    /// - `ViewerError::AddressOutOfRange` if either address is not covered.
    /// - `ViewerError::IndexOutOfRange` if `start_addr > end_addr`.
    pub fn substring(
        &self,
        start_addr: crate::address::Address,
        end_addr: crate::address::Address,
    ) -> crate::errors::ViewerResult<&str> {
        let start = self.index_of(start_addr)?;
        let end = self.index_of(end_addr)?;

        self.slice_chars(start, end + 1)
    }

    /// Character index of the first occurrence of `pattern` within
    /// characters `start..end`, relative to `start`.
    ///
    /// # Errors
    ///
    /// Same as [`TextBlock::slice_chars`].
    pub fn find_in(
        &self,
        start: usize,
        end: usize,
        pattern: &str,
    ) -> crate::errors::ViewerResult<Option<usize>> {
        let haystack = self.slice_chars(start, end)?;

        Ok(haystack
            .find(pattern)
            .map(|pos| self.char_index_at(self.char_starts[start] + pos) - start))
    }

    /// Like [`TextBlock::find_in`] but returns the last occurrence.
    ///
    /// # Errors
    ///
    /// Same as [`TextBlock::slice_chars`].
    pub fn rfind_in(
        &self,
        start: usize,
        end: usize,
        pattern: &str,
    ) -> crate::errors::ViewerResult<Option<usize>> {
        let haystack = self.slice_chars(start, end)?;

        Ok(haystack
            .rfind(pattern)
            .map(|pos| self.char_index_at(self.char_starts[start] + pos) - start))
    }

    /// Character index starting at UTF-8 offset `text_offset` of `text`.
    fn char_index_at(&self, text_offset: usize) -> usize {
        // `char_starts` is strictly increasing and the offset always lands on
        // a character boundary.
        self.char_starts
            .binary_search(&text_offset)
            .unwrap_or_else(|insert_at| insert_at)
    }

    fn out_of_range(&self, addr: crate::address::Address) -> crate::errors::ViewerError {
        crate::errors::ViewerError::AddressOutOfRange {
            addr,
            block_start: self.offset_addr,
            block_end: self.end_addr(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ViewerError;

    const SAMPLE: &str = "Hello World!\nαβ is alpha/beta.";

    // 48(H)[500]0 ... 21(!)[511]11 0A[512]12
    // CE B1(α)[513,514]13  CE B2(β)[515,516]14  20[517]15 ...
    fn sample_block() -> TextBlock {
        TextBlock::build(500, SAMPLE.as_bytes(), encoding_rs::UTF_8).unwrap()
    }

    // --- ADDRESS -> INDEX ---

    #[test]
    fn test_index_of() {
        let block = sample_block();

        assert_eq!(block.index_of(500).unwrap(), 0);
        assert_eq!(block.index_of(501).unwrap(), 1);

        // alpha at 513,514
        assert_eq!(block.index_of(513).unwrap(), 13);
        assert_eq!(block.index_of(514).unwrap(), 13);

        // beta at 515,516
        assert_eq!(block.index_of(515).unwrap(), 14);
        assert_eq!(block.index_of(516).unwrap(), 14);
    }

    #[test]
    fn test_index_of_out_of_range() {
        let block = sample_block();
        let last = 500 + SAMPLE.len() as u64 - 1;

        assert_eq!(block.end_addr(), last);
        assert!(block.index_of(last).is_ok());
        assert!(matches!(
            block.index_of(499),
            Err(ViewerError::AddressOutOfRange { addr: 499, .. })
        ));
        assert!(matches!(
            block.index_of(last + 1),
            Err(ViewerError::AddressOutOfRange { .. })
        ));
    }

    // --- INDEX -> ADDRESS ---

    #[test]
    fn test_address_of() {
        let block = sample_block();

        assert_eq!(block.address_of(0).unwrap(), 500);
        // Multi-byte characters report their first byte
        assert_eq!(block.address_of(13).unwrap(), 513);
        assert_eq!(block.address_of(14).unwrap(), 515);

        assert_eq!(block.end_address_of(13).unwrap(), 514);
        assert_eq!(block.end_address_of(0).unwrap(), 500);

        let len = block.char_len();

        assert_eq!(len, SAMPLE.chars().count());
        assert!(matches!(
            block.address_of(len),
            Err(ViewerError::IndexOutOfRange { index, .. }) if index == len
        ));
    }

    // --- SUBSTRINGS ---

    #[test]
    fn test_substring() {
        let block = sample_block();

        assert_eq!(block.substring(500, 504).unwrap(), "Hello");
        // Addresses inside a character pull in the whole character
        assert_eq!(block.substring(514, 515).unwrap(), "αβ");
        assert_eq!(block.substring(512, 512).unwrap(), "\n");
        assert_eq!(block.slice_chars(13, 15).unwrap(), "αβ");
        assert_eq!(block.slice_chars(3, 3).unwrap(), "");
    }

    #[test]
    fn test_find_in_counts_characters() {
        let block = sample_block();

        // "αβ is" starts at char 13; " " is its third character
        assert_eq!(block.find_in(13, 18, " ").unwrap(), Some(2));
        assert_eq!(block.rfind_in(0, block.char_len(), "a").unwrap(), Some(28));
        assert_eq!(block.find_in(0, 5, "\n").unwrap(), None);
    }

    // --- TRUNCATION ---

    #[test]
    fn test_truncated_tail_is_dropped() {
        let bytes = "abα".as_bytes();
        // Cut between the two bytes of alpha
        let block = TextBlock::build(0, &bytes[..3], encoding_rs::UTF_8).unwrap();

        assert_eq!(block.text(), "ab");
        assert_eq!(block.covered_len(), 2);
        assert_eq!(block.source_len(), 3);
        assert_eq!(block.end_addr(), 1);
        assert!(block.index_of(2).is_err());
    }

    #[test]
    fn test_truncated_four_byte_tail_is_dropped() {
        let bytes = "x😀".as_bytes();

        for cut in 2..bytes.len() {
            let block = TextBlock::build(10, &bytes[..cut], encoding_rs::UTF_8).unwrap();

            assert_eq!(block.text(), "x", "cut at {cut}");
            assert!(!block.text().contains(char::REPLACEMENT_CHARACTER));
        }
    }

    #[test]
    fn test_leading_continuation_bytes() {
        let bytes = "αb".as_bytes();
        // Starts on the second byte of alpha
        let block = TextBlock::build(101, &bytes[1..], encoding_rs::UTF_8).unwrap();

        assert_eq!(block.text(), "\u{FFFD}b");
        assert_eq!(block.index_of(101).unwrap(), 0);
        assert_eq!(block.index_of(102).unwrap(), 1);
        assert_eq!(block.address_of(1).unwrap(), 102);
    }

    #[test]
    fn test_interior_malformed_keeps_addresses_aligned() {
        let bytes = b"ab\xFFcd";
        let block = TextBlock::build(0, bytes, encoding_rs::UTF_8).unwrap();

        assert_eq!(block.text(), "ab\u{FFFD}cd");
        assert_eq!(block.index_of(2).unwrap(), 2);
        assert_eq!(block.index_of(3).unwrap(), 3);
        assert_eq!(block.address_of(4).unwrap(), 4);
    }

    #[test]
    fn test_empty_block() {
        let block = TextBlock::build(42, b"", encoding_rs::UTF_8).unwrap();

        assert!(block.is_empty());
        assert_eq!(block.text(), "");
        assert!(block.index_of(42).is_err());
        assert_eq!(block.slice_chars(0, 0).unwrap(), "");
    }

    // --- OTHER ENCODINGS ---

    #[test]
    fn test_utf16le() {
        let bytes: Vec<u8> = "a😀b".encode_utf16().flat_map(u16::to_le_bytes).collect();
        let block = TextBlock::build(0, &bytes, encoding_rs::UTF_16LE).unwrap();

        assert_eq!(block.text(), "a😀b");
        assert_eq!(block.address_of(1).unwrap(), 2);
        assert_eq!(block.index_of(5).unwrap(), 1);
        assert_eq!(block.address_of(2).unwrap(), 6);

        // Odd trailing byte is cut
        let block = TextBlock::build(0, &bytes[..7], encoding_rs::UTF_16LE).unwrap();

        assert_eq!(block.text(), "a😀");
        assert_eq!(block.covered_len(), 6);
    }

    #[test]
    fn test_shift_jis() {
        let (bytes, _, _) = encoding_rs::SHIFT_JIS.encode("a日本b");
        let block = TextBlock::build(1000, &bytes, encoding_rs::SHIFT_JIS).unwrap();

        assert_eq!(block.text(), "a日本b");
        assert_eq!(block.index_of(1001).unwrap(), 1);
        assert_eq!(block.index_of(1002).unwrap(), 1);
        assert_eq!(block.index_of(1003).unwrap(), 2);
        assert_eq!(block.address_of(3).unwrap(), 1005);

        // Cut inside the second kanji
        let block = TextBlock::build(1000, &bytes[..4], encoding_rs::SHIFT_JIS).unwrap();

        assert_eq!(block.text(), "a日");
    }

    #[test]
    fn test_single_byte_encoding() {
        let (bytes, _, _) = encoding_rs::WINDOWS_1252.encode("café");
        let block = TextBlock::build(7, &bytes, encoding_rs::WINDOWS_1252).unwrap();

        assert_eq!(bytes.len(), 4);
        assert_eq!(block.text(), "café");
        assert_eq!(block.index_of(10).unwrap(), 3);
        assert_eq!(block.address_of(3).unwrap(), 10);
    }
}
