/// Line terminator sequence of a file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LineTerminator {
    /// `"\n"`
    Lf,
    /// `"\r"`
    Cr,
    /// `"\r\n"`
    CrLf,
    /// `"\n\r"`
    LfCr,
}

impl LineTerminator {
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            LineTerminator::Lf => "\n",
            LineTerminator::Cr => "\r",
            LineTerminator::CrLf => "\r\n",
            LineTerminator::LfCr => "\n\r",
        }
    }

    /// Length in characters (not bytes) of the sequence.
    #[inline]
    #[must_use]
    pub fn char_len(&self) -> usize {
        match self {
            LineTerminator::Lf | LineTerminator::Cr => 1,
            LineTerminator::CrLf | LineTerminator::LfCr => 2,
        }
    }

    #[must_use]
    pub fn from_sequence(seq: &str) -> Option<Self> {
        match seq {
            "\n" => Some(LineTerminator::Lf),
            "\r" => Some(LineTerminator::Cr),
            "\r\n" => Some(LineTerminator::CrLf),
            "\n\r" => Some(LineTerminator::LfCr),
            _ => None,
        }
    }
}

impl std::fmt::Display for LineTerminator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            LineTerminator::Lf => "LF",
            LineTerminator::Cr => "CR",
            LineTerminator::CrLf => "CRLF",
            LineTerminator::LfCr => "LFCR",
        };

        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_round_trip() {
        for term in [
            LineTerminator::Lf,
            LineTerminator::Cr,
            LineTerminator::CrLf,
            LineTerminator::LfCr,
        ] {
            assert_eq!(LineTerminator::from_sequence(term.as_str()), Some(term));
            assert_eq!(term.as_str().chars().count(), term.char_len());
        }

        assert_eq!(LineTerminator::from_sequence(""), None);
        assert_eq!(LineTerminator::from_sequence("\r\r"), None);
    }
}
