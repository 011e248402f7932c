//! Helpers over `encoding_rs` encodings.

/// Looks an encoding up by WHATWG label (`"utf-8"`, `"Shift_JIS"`, `"latin1"`, ...).
#[inline]
#[must_use]
pub fn for_label(label: &str) -> Option<&'static encoding_rs::Encoding> {
    encoding_rs::Encoding::for_label(label.trim().as_bytes())
}

/// Number of bytes `ch` occupies when encoded under `encoding`.
///
/// Exact for UTF-8, UTF-16 and single-byte encodings. Multi-byte legacy
/// encodings go through the encoder, which is exact for characters the
/// decoder produced from well-formed input.
#[must_use]
pub fn encoded_len(encoding: &'static encoding_rs::Encoding, ch: char) -> usize {
    if encoding == encoding_rs::UTF_8 {
        return ch.len_utf8();
    }

    // encoding_rs never encodes *to* UTF-16 (it substitutes UTF-8)
    if encoding == encoding_rs::UTF_16LE || encoding == encoding_rs::UTF_16BE {
        return ch.len_utf16() * 2;
    }

    if encoding.is_single_byte() {
        return 1;
    }

    let mut utf8 = [0u8; 4];
    let (bytes, _, _) = encoding.encode(ch.encode_utf8(&mut utf8));

    bytes.len()
}

/// Encodings whose bytes cannot be interpreted without decoder state carried
/// over from earlier in the file. Re-encoding single characters is unsound
/// for these.
#[inline]
#[must_use]
pub fn is_stateful(encoding: &'static encoding_rs::Encoding) -> bool {
    encoding == encoding_rs::ISO_2022_JP || encoding == encoding_rs::REPLACEMENT
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_label() {
        assert_eq!(for_label("UTF-8"), Some(encoding_rs::UTF_8));
        assert_eq!(for_label(" utf8 "), Some(encoding_rs::UTF_8));
        assert_eq!(for_label("Shift_JIS"), Some(encoding_rs::SHIFT_JIS));
        assert_eq!(for_label("latin1"), Some(encoding_rs::WINDOWS_1252));
        assert_eq!(for_label("no-such-encoding"), None);
    }

    #[test]
    fn test_encoded_len() {
        assert_eq!(encoded_len(encoding_rs::UTF_8, 'a'), 1);
        assert_eq!(encoded_len(encoding_rs::UTF_8, 'α'), 2);
        assert_eq!(encoded_len(encoding_rs::UTF_8, '日'), 3);
        assert_eq!(encoded_len(encoding_rs::UTF_8, '😀'), 4);

        assert_eq!(encoded_len(encoding_rs::UTF_16LE, 'a'), 2);
        assert_eq!(encoded_len(encoding_rs::UTF_16BE, '😀'), 4);

        assert_eq!(encoded_len(encoding_rs::WINDOWS_1252, 'é'), 1);

        assert_eq!(encoded_len(encoding_rs::SHIFT_JIS, 'a'), 1);
        assert_eq!(encoded_len(encoding_rs::SHIFT_JIS, '日'), 2);
        assert_eq!(encoded_len(encoding_rs::EUC_KR, '한'), 2);
    }

    #[test]
    fn test_is_stateful() {
        assert!(is_stateful(encoding_rs::ISO_2022_JP));
        assert!(!is_stateful(encoding_rs::UTF_8));
        assert!(!is_stateful(encoding_rs::SHIFT_JIS));
    }
}
