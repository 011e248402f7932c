/// Byte range currently held by the cached [`TextBlock`](crate::text_block::TextBlock).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BufferState {
    pub start_addr: crate::address::Address,
    pub end_addr: crate::address::Address,
    pub target_size: u64,
    pub window_margin: u64,
}

/// Text of a view after line-boundary trimming, and where it really starts
/// and ends in the file.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TrimmedView {
    pub text: String,
    pub preferred_start_addr: crate::address::Address,
    pub preferred_end_addr: crate::address::Address,
    /// False when the requested range was returned verbatim.
    pub trimmed: bool,
}

/// Keeps one decoded block cached around a moving view window.
///
/// The block is re-read only when the view comes within `window_margin`
/// bytes of either edge of the buffer; the new buffer is then re-centred
/// on the side the view is moving towards.
#[derive(Debug)]
pub struct BufferWindow {
    reader: io::range_reader::RangeReader,
    encoding: &'static encoding_rs::Encoding,
    line_terminator: Option<crate::line_terminator::LineTerminator>,
    pretty_trim: bool,
    file_size: u64,
    target_size: u64,
    window_margin: u64,
    /// Inclusive range of the live block; `None` until the first read.
    range: Option<(u64, u64)>,
    block: Option<crate::text_block::TextBlock>,
    reads: u64,
}

/*

====================
===== CREATION =====
====================

*/

impl BufferWindow {
    /// # Errors
    ///
    /// - `ViewerError::NotATextFile` if no encoding was detected for the file.
    /// - `ViewerError::InvalidConfig` if `buffer_size` is zero or `window_margin`
    ///   does not leave room inside half a buffer.
    pub fn new(
        reader: io::range_reader::RangeReader,
        encoding: Option<&'static encoding_rs::Encoding>,
        line_terminator: Option<crate::line_terminator::LineTerminator>,
        buffer_size: u64,
        window_margin: u64,
    ) -> crate::errors::ViewerResult<Self> {
        let encoding = encoding.ok_or(crate::errors::ViewerError::NotATextFile)?;

        if buffer_size == 0 {
            return Err(crate::errors::ViewerError::InvalidConfig(
                "buffer size must be greater than zero".into(),
            ));
        }

        if window_margin >= buffer_size / 2 {
            return Err(crate::errors::ViewerError::InvalidConfig(format!(
                "window margin {window_margin} must be less than half the buffer size {buffer_size}"
            )));
        }

        let file_size = reader.file_size();
        // A file smaller than the buffer is read whole
        let target_size = std::cmp::min(buffer_size, file_size);

        tracing::debug!(
            path = %reader.path().display(),
            file_size = %crate::address::human_size(file_size, 1),
            encoding = encoding.name(),
            terminator = ?line_terminator,
            target_size,
            window_margin,
            "opened buffer window"
        );

        Ok(Self {
            reader,
            encoding,
            line_terminator,
            pretty_trim: true,
            file_size,
            target_size,
            window_margin,
            range: None,
            block: None,
            reads: 0,
        })
    }

    pub fn set_pretty_trim(&mut self, enabled: bool) {
        self.pretty_trim = enabled;
    }
}

/*

==========================
===== INLINE METHODS =====
==========================

*/

impl BufferWindow {
    #[inline]
    #[must_use]
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// Last address of the file (0 for an empty file).
    #[inline]
    #[must_use]
    pub fn file_end_addr(&self) -> crate::address::Address {
        self.file_size.saturating_sub(1)
    }

    #[inline]
    #[must_use]
    pub fn encoding(&self) -> &'static encoding_rs::Encoding {
        self.encoding
    }

    #[inline]
    #[must_use]
    pub fn line_terminator(&self) -> Option<crate::line_terminator::LineTerminator> {
        self.line_terminator
    }

    #[inline]
    #[must_use]
    pub fn pretty_trim(&self) -> bool {
        self.pretty_trim
    }

    /// Number of blocks read from disk so far.
    #[inline]
    #[must_use]
    pub fn reads(&self) -> u64 {
        self.reads
    }

    #[must_use]
    pub fn state(&self) -> Option<BufferState> {
        self.range.map(|(start_addr, end_addr)| BufferState {
            start_addr,
            end_addr,
            target_size: self.target_size,
            window_margin: self.window_margin,
        })
    }

    /// The live block.
    ///
    /// # Errors
    ///
    /// - `ViewerError::NoBlockLoaded` before the first resolve or after [`BufferWindow::release`].
    #[inline]
    pub fn block(&self) -> crate::errors::ViewerResult<&crate::text_block::TextBlock> {
        self.block
            .as_ref()
            .ok_or(crate::errors::ViewerError::NoBlockLoaded)
    }

    /// Drops the cached block. The next resolve reads from disk again.
    pub fn release(&mut self) {
        self.block = None;
        self.range = None;
    }
}

/*

=====================
===== RESOLVING =====
=====================

*/

impl BufferWindow {
    /// Makes sure the buffer covers `view_start..=view_end` and returns the
    /// view text, trimmed to line boundaries when a terminator is known and
    /// trimming is enabled.
    ///
    /// # Errors
    ///
    /// - `ViewerError::InvalidRange` if the view is reversed or past the end of the file.
    /// - `ViewerError::Io` if re-reading fails; the previous block stays cached.
    /// - `ViewerError::AddressOutOfRange` if the buffer cannot cover the view.
    pub fn resolve(
        &mut self,
        view_start: crate::address::Address,
        view_end: crate::address::Address,
    ) -> crate::errors::ViewerResult<TrimmedView> {
        let trim = self.pretty_trim;

        self.resolve_with(view_start, view_end, trim)
    }

    /// [`BufferWindow::resolve`] with trimming chosen per call.
    ///
    /// # Errors
    ///
    /// Same as [`BufferWindow::resolve`].
    pub fn resolve_with(
        &mut self,
        view_start: crate::address::Address,
        view_end: crate::address::Address,
        trim: bool,
    ) -> crate::errors::ViewerResult<TrimmedView> {
        if self.file_size == 0 {
            return Ok(TrimmedView::default());
        }

        if view_start > view_end || view_end > self.file_end_addr() {
            return Err(crate::errors::ViewerError::InvalidRange {
                start: view_start,
                end: view_end,
                file_size: self.file_size,
            });
        }

        if view_end - view_start + 1 > self.target_size {
            return Err(crate::errors::ViewerError::InvalidConfig(format!(
                "view of {} bytes does not fit a buffer of {} bytes",
                view_end - view_start + 1,
                self.target_size
            )));
        }

        let next = self.plan(view_start, view_end);

        if next.0 > view_start || view_end > next.1 {
            let err = crate::errors::ViewerError::AddressOutOfRange {
                addr: if next.0 > view_start { view_start } else { view_end },
                block_start: next.0,
                block_end: next.1,
            };

            tracing::error!("buffer cannot cover view: {err}");

            return Err(err);
        }

        if self.range != Some(next) || self.block.is_none() {
            self.read_block(next, view_start, view_end)?;
        }

        self.trim(view_start, view_end, trim)
    }

    /// Where the buffer should sit for this view.
    fn plan(&self, view_start: u64, view_end: u64) -> (u64, u64) {
        let half = self.target_size / 2;

        let Some((mut start, mut end)) = self.range else {
            // Centre the first buffer on the view
            let centre = view_start + (view_end - view_start + 1) / 2;

            return self.clamp_from_start(centre.saturating_sub(half));
        };

        // Upper edge approaching: re-centre above the view
        if view_start < start || view_start - start < self.window_margin {
            (start, end) = self.clamp_from_start(view_start.saturating_sub(half));
        }

        // Lower edge approaching: re-centre below the view
        if view_end > end || end - view_end < self.window_margin {
            (start, end) = self.clamp_from_end(view_end.saturating_add(half));
        }

        (start, end)
    }

    fn clamp_from_start(&self, start: u64) -> (u64, u64) {
        let end = start + self.target_size - 1;

        if end > self.file_end_addr() {
            return self.clamp_from_end(self.file_end_addr());
        }

        (start, end)
    }

    fn clamp_from_end(&self, end: u64) -> (u64, u64) {
        let end = std::cmp::min(end, self.file_end_addr());

        match (end + 1).checked_sub(self.target_size) {
            Some(start) => (start, end),
            None => (0, self.target_size - 1),
        }
    }

    /// Reads and decodes `range`, swapping it in only once it is complete.
    fn read_block(
        &mut self,
        range: (u64, u64),
        view_start: u64,
        view_end: u64,
    ) -> crate::errors::ViewerResult<()> {
        match self.range {
            None => tracing::debug!(
                buffer = %format_range(range),
                view = %format_range((view_start, view_end)),
                "reading first block"
            ),
            Some(previous) => tracing::debug!(
                from = %format_range(previous),
                to = %format_range(range),
                view = %format_range((view_start, view_end)),
                "re-reading block"
            ),
        }

        let bytes = self.reader.read(range.0, range.1)?;
        let block = crate::text_block::TextBlock::build(range.0, &bytes, self.encoding)?;

        self.block = Some(block);
        self.range = Some(range);
        self.reads += 1;

        Ok(())
    }

    fn trim(
        &self,
        view_start: u64,
        view_end: u64,
        trim: bool,
    ) -> crate::errors::ViewerResult<TrimmedView> {
        let block = self.block()?;
        let at_file_end = view_end == self.file_end_addr();

        // Only a cut-off character follows the block, so nothing to show
        if view_start >= block.offset_addr() + block.covered_len() as u64 {
            return Ok(TrimmedView {
                text: String::new(),
                preferred_start_addr: view_start,
                preferred_end_addr: view_end,
                trimmed: false,
            });
        }

        // A character cut off by the end of the block is not mapped
        let last_addr = std::cmp::min(view_end, block.end_addr());

        let start_idx = block.index_of(view_start).inspect_err(|e| {
            tracing::error!("view start not in buffer: {e}");
        })?;
        let end_idx = block.index_of(last_addr).inspect_err(|e| {
            tracing::error!("view end not in buffer: {e}");
        })? + 1;
        let untrimmed = || -> crate::errors::ViewerResult<TrimmedView> {
            Ok(TrimmedView {
                text: block.slice_chars(start_idx, end_idx)?.to_owned(),
                preferred_start_addr: view_start,
                preferred_end_addr: view_end,
                trimmed: false,
            })
        };

        let Some(terminator) = self.line_terminator.filter(|_| trim) else {
            return untrimmed();
        };

        let view_len = end_idx - start_idx;
        let first = block.find_in(start_idx, end_idx, terminator.as_str())?;
        let last = block.rfind_in(start_idx, end_idx, terminator.as_str())?;
        // Already on a line boundary, so trimming again would skip a line
        let at_line_start = view_start == 0
            || match start_idx.checked_sub(terminator.char_len()) {
                Some(prev) => {
                    block.address_of(start_idx)? == view_start
                        && block.slice_chars(prev, start_idx)? == terminator.as_str()
                }
                None => false,
            };

        let cut_start = match first {
            Some(idx) if !at_line_start => idx + terminator.char_len(),
            _ => 0,
        };
        let cut_end = match last {
            Some(idx) if !at_file_end => idx,
            _ => view_len,
        };

        if cut_start == 0 && cut_end == view_len {
            return untrimmed();
        }

        if cut_start >= cut_end {
            tracing::debug!(
                view = %format_range((view_start, view_end)),
                "no complete line inside view, showing it untrimmed"
            );

            return untrimmed();
        }

        let preferred_start_addr = if cut_start == 0 {
            view_start
        } else {
            block.address_of(start_idx + cut_start)?
        };
        let preferred_end_addr = if cut_end == view_len {
            view_end
        } else {
            block.end_address_of(start_idx + cut_end - 1)?
        };

        tracing::trace!(
            before = %format_range((view_start, view_end)),
            after = %format_range((preferred_start_addr, preferred_end_addr)),
            "trimmed view to line boundaries"
        );

        Ok(TrimmedView {
            text: block
                .slice_chars(start_idx + cut_start, start_idx + cut_end)?
                .to_owned(),
            preferred_start_addr,
            preferred_end_addr,
            trimmed: true,
        })
    }
}

fn format_range((start, end): (u64, u64)) -> String {
    format!(
        "{}-{}",
        crate::address::format_address(start),
        crate::address::format_address(end)
    )
}
