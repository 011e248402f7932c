/// What to do when line trimming pulls a page back to where it started.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StallPolicy {
    /// Keep the trimmed page, flag it as stalled and log a warning.
    #[default]
    Report,
    /// Show the requested range untrimmed so the view keeps moving.
    ForceUntrimmed,
}

/// Sizes and policies for one open file. Every field has a default, so a
/// JSON file only needs the fields it overrides.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Bytes held in memory around the view.
    pub buffer_size: u64,
    /// Re-read once the view gets this close to either edge of the buffer.
    pub window_margin: u64,
    /// Bytes shown at once.
    pub view_area_size: u64,
    /// Bytes moved by one forward or backward step. Should exceed the
    /// longest expected line.
    pub page_increment_size: u64,
    pub pretty_trim: bool,
    pub stall_policy: StallPolicy,
    /// WHATWG label that replaces encoding detection, e.g. `"shift_jis"`.
    pub encoding: Option<String>,
    /// Terminator sequence that replaces detection, e.g. `"\r\n"`.
    pub line_terminator: Option<String>,
    /// Read through a memory map rather than seek and read.
    pub memory_map: bool,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            buffer_size: 60 * 1024,
            window_margin: 10 * 1024,
            view_area_size: 20 * 1024,
            page_increment_size: 4 * 1024,
            pretty_trim: true,
            stall_policy: StallPolicy::default(),
            encoding: None,
            line_terminator: None,
            memory_map: true,
        }
    }
}

impl ViewerConfig {
    /// # Errors
    ///
    /// - `ViewerError::InvalidConfig` if the JSON is malformed or the values fail [`ViewerConfig::validate`].
    pub fn from_json(json: &str) -> viewer_core::errors::ViewerResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| viewer_core::errors::ViewerError::InvalidConfig(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// # Errors
    ///
    /// - `ViewerError::InvalidConfig` if the file cannot be read, or for the reasons in [`ViewerConfig::from_json`].
    pub fn load(path: impl AsRef<std::path::Path>) -> viewer_core::errors::ViewerResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            viewer_core::errors::ViewerError::InvalidConfig(format!(
                "cannot read {}: {e}",
                path.display()
            ))
        })?;

        tracing::debug!(path = %path.display(), "loading viewer config");

        Self::from_json(&json)
    }

    /// # Errors
    ///
    /// - `ViewerError::InvalidConfig` if a size is zero, the buffer cannot hold
    ///   two views, or the margin is not below half the buffer.
    pub fn validate(&self) -> viewer_core::errors::ViewerResult<()> {
        let invalid = |msg: String| Err(viewer_core::errors::ViewerError::InvalidConfig(msg));

        for (name, value) in [
            ("buffer_size", self.buffer_size),
            ("window_margin", self.window_margin),
            ("view_area_size", self.view_area_size),
            ("page_increment_size", self.page_increment_size),
        ] {
            if value == 0 {
                return invalid(format!("{name} must be greater than zero"));
            }
        }

        if self.buffer_size < self.view_area_size.saturating_mul(2) {
            return invalid(format!(
                "buffer_size {} must be at least twice view_area_size {}",
                self.buffer_size, self.view_area_size
            ));
        }

        if self.window_margin >= self.buffer_size / 2 {
            return invalid(format!(
                "window_margin {} must be less than half of buffer_size {}",
                self.window_margin, self.buffer_size
            ));
        }

        self.encoding_override()?;
        self.line_terminator_override()?;

        Ok(())
    }

    /// # Errors
    ///
    /// - `ViewerError::InvalidConfig` if `encoding` is not a known label.
    pub fn encoding_override(
        &self,
    ) -> viewer_core::errors::ViewerResult<Option<&'static encoding_rs::Encoding>> {
        self.encoding
            .as_deref()
            .map(|label| {
                viewer_core::encoding::for_label(label).ok_or_else(|| {
                    viewer_core::errors::ViewerError::InvalidConfig(format!(
                        "unknown encoding {label:?}"
                    ))
                })
            })
            .transpose()
    }

    /// # Errors
    ///
    /// - `ViewerError::InvalidConfig` if `line_terminator` is not one of
    ///   `"\n"`, `"\r"`, `"\r\n"` or `"\n\r"`.
    pub fn line_terminator_override(
        &self,
    ) -> viewer_core::errors::ViewerResult<Option<viewer_core::line_terminator::LineTerminator>>
    {
        self.line_terminator
            .as_deref()
            .map(|seq| {
                viewer_core::line_terminator::LineTerminator::from_sequence(seq).ok_or_else(|| {
                    viewer_core::errors::ViewerError::InvalidConfig(format!(
                        "unknown line terminator {seq:?}"
                    ))
                })
            })
            .transpose()
    }

    #[inline]
    #[must_use]
    pub fn read_strategy(&self) -> io::range_reader::ReadStrategy {
        if self.memory_map {
            io::range_reader::ReadStrategy::Mapped
        } else {
            io::range_reader::ReadStrategy::Buffered
        }
    }
}
