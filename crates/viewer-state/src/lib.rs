pub mod config;
pub mod sniffer;
pub mod view_cursor;

/// One open file: what it is, and where the user is looking in it.
///
/// - [`sniffer`] decides the encoding and line terminator once at open time.
/// - [`view_cursor`] owns the buffer window and does all paging and seeking.
#[derive(Debug)]
pub struct Viewer {
    pub path: std::path::PathBuf,
    pub config: config::ViewerConfig,
    pub cursor: view_cursor::ViewCursor,
}

impl Viewer {
    /// Opens `path` with the default [`sniffer::ContentSniffer`] and shows
    /// the page at `start_addr`.
    ///
    /// # Errors
    ///
    /// - `ViewerError::Io` if the file cannot be opened or read.
    /// - `ViewerError::NotATextFile` if no encoding could be detected.
    /// - `ViewerError::InvalidConfig` if `config` fails validation.
    pub fn open(
        path: impl AsRef<std::path::Path>,
        config: config::ViewerConfig,
        start_addr: viewer_core::address::Address,
    ) -> viewer_core::errors::ViewerResult<Self> {
        Self::open_with(path, config, start_addr, &sniffer::ContentSniffer::default())
    }

    /// Like [`Viewer::open`] with a caller-supplied sniffer.
    ///
    /// # Errors
    ///
    /// Same as [`Viewer::open`].
    pub fn open_with(
        path: impl AsRef<std::path::Path>,
        config: config::ViewerConfig,
        start_addr: viewer_core::address::Address,
        sniffer: &dyn sniffer::FileSniffer,
    ) -> viewer_core::errors::ViewerResult<Self> {
        config.validate()?;

        let path = path.as_ref().to_path_buf();
        let reader =
            io::range_reader::RangeReader::open(&path)?.with_strategy(config.read_strategy());
        let encoding = match config.encoding_override()? {
            Some(encoding) => encoding,
            None => sniffer
                .detect_encoding(&reader)?
                .ok_or(viewer_core::errors::ViewerError::NotATextFile)?,
        };
        let terminator = match config.line_terminator_override()? {
            Some(terminator) => Some(terminator),
            None => sniffer.detect_line_terminator(&reader, encoding)?,
        };

        tracing::info!(
            path = %path.display(),
            size = %viewer_core::address::human_size(reader.file_size(), 2),
            encoding = encoding.name(),
            terminator = %terminator.map_or_else(|| "none".to_string(), |t| t.to_string()),
            "opened file"
        );

        let mut buffer = viewer_core::buffer_window::BufferWindow::new(
            reader,
            Some(encoding),
            terminator,
            config.buffer_size,
            config.window_margin,
        )?;

        buffer.set_pretty_trim(config.pretty_trim);

        let cursor = view_cursor::ViewCursor::new(
            buffer,
            start_addr,
            config.view_area_size,
            config.page_increment_size,
            config.stall_policy,
        )?;

        Ok(Self {
            path,
            config,
            cursor,
        })
    }

    #[inline]
    #[must_use]
    pub fn file_size(&self) -> u64 {
        self.cursor.buffer().file_size()
    }

    #[inline]
    #[must_use]
    pub fn encoding(&self) -> &'static encoding_rs::Encoding {
        self.cursor.buffer().encoding()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;
    use viewer_core::errors::ViewerError;
    use viewer_core::line_terminator::LineTerminator;

    fn file_with(contents: &[u8]) -> NamedTempFile {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(contents).unwrap();
        temp_file.as_file().sync_all().unwrap();
        temp_file
    }

    fn small_config() -> config::ViewerConfig {
        config::ViewerConfig {
            buffer_size: 400,
            window_margin: 50,
            view_area_size: 100,
            page_increment_size: 40,
            ..config::ViewerConfig::default()
        }
    }

    #[test]
    fn test_open_text_file() {
        let contents: Vec<u8> = (0..100)
            .flat_map(|i| format!("row {i:02}\r\n").into_bytes())
            .collect();
        let file = file_with(&contents);

        let viewer = Viewer::open(file.path(), small_config(), 0).unwrap();

        assert_eq!(viewer.file_size(), 800);
        assert_eq!(viewer.encoding(), encoding_rs::UTF_8);
        assert_eq!(
            viewer.cursor.buffer().line_terminator(),
            Some(LineTerminator::CrLf)
        );
        assert!(viewer.cursor.current().text.starts_with("row 00\r\n"));
    }

    #[test]
    fn test_open_binary_file() {
        let file = file_with(&[0x00, 0x01, 0x02, 0xFF, 0x00]);

        assert!(matches!(
            Viewer::open(file.path(), small_config(), 0),
            Err(ViewerError::NotATextFile)
        ));
    }

    #[test]
    fn test_overrides_skip_sniffing() {
        let (bytes, _, _) = encoding_rs::SHIFT_JIS.encode("テキスト|テキスト|");
        let file = file_with(&bytes);
        let config = config::ViewerConfig {
            encoding: Some("shift_jis".to_string()),
            line_terminator: Some("|".to_string()),
            memory_map: false,
            ..small_config()
        };

        assert!(matches!(
            Viewer::open(file.path(), config, 0),
            Err(ViewerError::InvalidConfig(_))
        ));

        let config = config::ViewerConfig {
            encoding: Some("shift_jis".to_string()),
            line_terminator: Some("\n".to_string()),
            memory_map: false,
            ..small_config()
        };
        let viewer = Viewer::open(file.path(), config, 0).unwrap();

        assert_eq!(viewer.encoding(), encoding_rs::SHIFT_JIS);
        assert_eq!(viewer.cursor.current().text, "テキスト|テキスト|");
    }

    #[test]
    fn test_open_rejects_bad_config() {
        let file = file_with(b"text\n");
        let config = config::ViewerConfig {
            view_area_size: 0,
            ..config::ViewerConfig::default()
        };

        assert!(matches!(
            Viewer::open(file.path(), config, 0),
            Err(ViewerError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_open_missing_file() {
        let dir = tempfile::tempdir().unwrap();

        assert!(matches!(
            Viewer::open(dir.path().join("missing.txt"), small_config(), 0),
            Err(ViewerError::Io(_))
        ));
    }

    #[test]
    fn test_open_empty_file() {
        let file = file_with(b"");

        let mut viewer = Viewer::open(file.path(), small_config(), 0).unwrap();

        assert!(viewer.cursor.current().text.is_empty());
        assert_eq!(
            viewer.cursor.forward().unwrap(),
            view_cursor::ViewEvent::Unchanged
        );
    }

    #[test]
    fn test_page_through_whole_file() {
        let contents: Vec<u8> = (0..500)
            .flat_map(|i| format!("entry {i:04}\n").into_bytes())
            .collect();
        let file = file_with(&contents);
        let mut viewer = Viewer::open(file.path(), small_config(), 0).unwrap();
        let mut pages = 0;

        while !viewer.cursor.is_view_showing_end() {
            match viewer.cursor.forward().unwrap() {
                view_cursor::ViewEvent::Redraw(page) => {
                    assert!(page.text.starts_with("entry "));
                }
                view_cursor::ViewEvent::Unchanged => break,
            }
            pages += 1;
        }

        assert!(viewer.cursor.is_view_showing_end());
        assert!(viewer.cursor.current().text.ends_with("entry 0499\n"));
        assert!(pages > 100);
    }
}
