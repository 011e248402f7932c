/// Which navigation call produced a [`DisplayResult`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
    /// A seek that is still being adjusted (e.g. a scrollbar drag). The
    /// result is provisional.
    Seeking,
    /// The final seek of a drag, or a one-shot jump.
    SeekEnd,
    #[default]
    Nothing,
}

impl Direction {
    #[inline]
    #[must_use]
    pub fn is_seek(self) -> bool {
        matches!(self, Direction::Seeking | Direction::SeekEnd)
    }
}

/// Everything the presentation layer needs to draw one page.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DisplayResult {
    pub text: String,
    pub preferred_start_addr: viewer_core::address::Address,
    pub preferred_end_addr: viewer_core::address::Address,
    pub direction: Direction,
    pub cursor_addr: viewer_core::address::Address,
    /// Character position of the cursor inside `text`.
    pub caret_index: usize,
    pub trimmed: bool,
    /// Line trimming pulled the page back to where it was before the move.
    pub stalled: bool,
    pub line_terminator: Option<viewer_core::line_terminator::LineTerminator>,
}

impl DisplayResult {
    #[must_use]
    pub fn first_line(&self) -> &str {
        match self.line_terminator {
            Some(terminator) => self
                .text
                .split_once(terminator.as_str())
                .map_or(self.text.as_str(), |(first, _)| first),
            None => &self.text,
        }
    }

    /// Last line of the page, ignoring a trailing terminator.
    #[must_use]
    pub fn last_line(&self) -> &str {
        let Some(terminator) = self.line_terminator else {
            return &self.text;
        };
        let text = self
            .text
            .strip_suffix(terminator.as_str())
            .unwrap_or(&self.text);

        text.rsplit_once(terminator.as_str())
            .map_or(text, |(_, last)| last)
    }

    #[must_use]
    pub fn line_count(&self) -> usize {
        if self.text.is_empty() {
            return 0;
        }

        let Some(terminator) = self.line_terminator else {
            return 1;
        };
        let terminators =
            memchr::memmem::find_iter(self.text.as_bytes(), terminator.as_str().as_bytes()).count();

        if self.text.ends_with(terminator.as_str()) {
            terminators
        } else {
            terminators + 1
        }
    }
}

/// Outcome of a navigation call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ViewEvent {
    /// The page changed and should be drawn.
    Redraw(DisplayResult),
    /// The page starts where the last drawn one did; nothing to redraw.
    Unchanged,
}

/// Current view window and cursor over one file, with paging and seeking.
///
/// Every call is synchronous. A failed call (e.g. an I/O error while
/// re-reading) leaves the view and cursor where they were.
#[derive(Debug)]
pub struct ViewCursor {
    buffer: viewer_core::buffer_window::BufferWindow,
    view_area_size: u64,
    page_increment: u64,
    stall_policy: crate::config::StallPolicy,
    view_start_addr: viewer_core::address::Address,
    view_end_addr: viewer_core::address::Address,
    cursor_addr: viewer_core::address::Address,
    /// Clamped start of the last resolved request, before trimming.
    requested_start_addr: Option<viewer_core::address::Address>,
    /// Start of the last page handed out as [`ViewEvent::Redraw`].
    notified_start_addr: Option<viewer_core::address::Address>,
    current: DisplayResult,
}

/*

====================
===== CREATION =====
====================

*/

impl ViewCursor {
    /// Resolves the first page at `view_start_addr`. The page is available
    /// through [`ViewCursor::current`].
    ///
    /// # Errors
    ///
    /// - `ViewerError::InvalidConfig` if `view_area_size` or `page_increment` is zero.
    /// - Any error from [`BufferWindow::resolve`](viewer_core::buffer_window::BufferWindow::resolve).
    pub fn new(
        buffer: viewer_core::buffer_window::BufferWindow,
        view_start_addr: viewer_core::address::Address,
        view_area_size: u64,
        page_increment: u64,
        stall_policy: crate::config::StallPolicy,
    ) -> viewer_core::errors::ViewerResult<Self> {
        if view_area_size == 0 || page_increment == 0 {
            return Err(viewer_core::errors::ViewerError::InvalidConfig(
                "view area and page increment must be greater than zero".into(),
            ));
        }

        let view_area_size = std::cmp::min(view_area_size, buffer.file_size());
        let mut cursor = Self {
            buffer,
            view_area_size,
            page_increment,
            stall_policy,
            view_start_addr,
            view_end_addr: view_start_addr,
            cursor_addr: 0,
            requested_start_addr: None,
            notified_start_addr: None,
            current: DisplayResult::default(),
        };

        cursor.navigate(view_start_addr, Direction::Nothing, None)?;

        Ok(cursor)
    }
}

/*

======================
===== NAVIGATION =====
======================

*/

impl ViewCursor {
    /// Moves the view one page increment towards the end of the file.
    ///
    /// # Errors
    ///
    /// See [`ViewCursor::new`].
    pub fn forward(&mut self) -> viewer_core::errors::ViewerResult<ViewEvent> {
        let start = self.view_start_addr.saturating_add(self.page_increment);

        self.navigate(start, Direction::Forward, None)
    }

    /// Moves the view one page increment towards the start of the file.
    ///
    /// # Errors
    ///
    /// See [`ViewCursor::new`].
    pub fn backward(&mut self) -> viewer_core::errors::ViewerResult<ViewEvent> {
        let start = self.view_start_addr.saturating_sub(self.page_increment);

        self.navigate(start, Direction::Backward, None)
    }

    /// Puts the cursor at `addr` and shows the page starting there.
    /// `is_live` marks a seek that is still being adjusted.
    ///
    /// # Errors
    ///
    /// See [`ViewCursor::new`].
    pub fn seek(
        &mut self,
        addr: viewer_core::address::Address,
        is_live: bool,
    ) -> viewer_core::errors::ViewerResult<ViewEvent> {
        let addr = std::cmp::min(addr, self.file_end_address());
        let direction = if is_live {
            Direction::Seeking
        } else {
            Direction::SeekEnd
        };

        match self.buffer.state() {
            Some(state) if (state.start_addr..=state.end_addr).contains(&addr) => {
                tracing::debug!(addr = %viewer_core::address::format_address(addr), ?direction, "seek");
            }
            _ => {
                tracing::debug!(addr = %viewer_core::address::format_address(addr), ?direction, "buffer jump seek");
            }
        }

        self.navigate(addr, direction, Some(addr))
    }

    /// Resolves the current view again.
    ///
    /// # Errors
    ///
    /// See [`ViewCursor::new`].
    pub fn refresh(&mut self) -> viewer_core::errors::ViewerResult<ViewEvent> {
        self.navigate(self.view_start_addr, Direction::Nothing, None)
    }

    fn navigate(
        &mut self,
        requested_start: viewer_core::address::Address,
        direction: Direction,
        seek_addr: Option<viewer_core::address::Address>,
    ) -> viewer_core::errors::ViewerResult<ViewEvent> {
        let previous_start = self.view_start_addr;
        let (start, end) = self.clamp(requested_start);

        tracing::debug!(
            view = %format_range(start, end),
            cursor = %viewer_core::address::format_address(self.cursor_addr),
            ?direction,
            "resolving view"
        );

        let mut view = self.buffer.resolve(start, end)?;
        let mut stalled = false;

        // A window clamped to where the last one was is no move at all
        if direction != Direction::Nothing
            && start != previous_start
            && self.requested_start_addr != Some(start)
            && view.preferred_start_addr == previous_start
        {
            match self.stall_policy {
                crate::config::StallPolicy::Report => {
                    tracing::warn!(
                        at = %viewer_core::address::format_address(previous_start),
                        page_increment = self.page_increment,
                        "view did not move after line trimming; a neighbouring line is \
                         longer than the page increment"
                    );
                    stalled = true;
                }
                crate::config::StallPolicy::ForceUntrimmed => {
                    tracing::warn!(
                        at = %viewer_core::address::format_address(previous_start),
                        "view did not move after line trimming, showing an untrimmed page"
                    );
                    view = self.buffer.resolve_with(start, end, false)?;
                }
            }
        }

        tracing::debug!(
            before = %format_range(start, end),
            after = %format_range(view.preferred_start_addr, view.preferred_end_addr),
            "resolved view"
        );

        self.view_start_addr = view.preferred_start_addr;
        self.view_end_addr = view.preferred_end_addr;
        self.requested_start_addr = Some(start);

        if let Some(addr) = seek_addr {
            self.cursor_addr = addr;
        }

        // The cursor never points before the visible page
        if self.view_start_addr > self.cursor_addr {
            self.cursor_addr = self.view_start_addr;
        }

        let caret_index = self.caret_index_of_cursor(&view.text)?;
        let result = DisplayResult {
            text: view.text,
            preferred_start_addr: view.preferred_start_addr,
            preferred_end_addr: view.preferred_end_addr,
            direction,
            cursor_addr: self.cursor_addr,
            caret_index,
            trimmed: view.trimmed,
            stalled,
            line_terminator: self.buffer.line_terminator(),
        };

        tracing::trace!(
            first_line = result.first_line(),
            last_line = result.last_line(),
            lines = result.line_count(),
            "display text"
        );

        let unchanged = !stalled
            && !direction.is_seek()
            && self.notified_start_addr == Some(result.preferred_start_addr);

        self.current = result;

        if unchanged {
            return Ok(ViewEvent::Unchanged);
        }

        self.notified_start_addr = Some(self.current.preferred_start_addr);

        Ok(ViewEvent::Redraw(self.current.clone()))
    }

    /// Applies the view area to `start`, keeping the window inside the file.
    fn clamp(&self, start: viewer_core::address::Address) -> (u64, u64) {
        if self.view_area_size == 0 {
            return (0, 0);
        }

        let file_end = self.file_end_address();
        let end = start.saturating_add(self.view_area_size - 1);

        if end > file_end {
            return (file_end + 1 - self.view_area_size, file_end);
        }

        (start, end)
    }

    fn caret_index_of_cursor(&self, text: &str) -> viewer_core::errors::ViewerResult<usize> {
        if text.is_empty() {
            return Ok(0);
        }

        let block = self.buffer.block()?;

        if self.cursor_addr > self.view_end_addr || !block.contains(self.cursor_addr) {
            return Ok(text.chars().count());
        }

        Ok(block.index_of(self.cursor_addr)? - block.index_of(self.view_start_addr)?)
    }
}

/*

===================
===== GETTERS =====
===================

*/

impl ViewCursor {
    /// The most recent page, including one reported as [`ViewEvent::Unchanged`].
    #[inline]
    #[must_use]
    pub fn current(&self) -> &DisplayResult {
        &self.current
    }

    #[inline]
    #[must_use]
    pub fn view_start_addr(&self) -> viewer_core::address::Address {
        self.view_start_addr
    }

    #[inline]
    #[must_use]
    pub fn view_end_addr(&self) -> viewer_core::address::Address {
        self.view_end_addr
    }

    #[inline]
    #[must_use]
    pub fn cursor_addr(&self) -> viewer_core::address::Address {
        self.cursor_addr
    }

    /// Moves the cursor without changing the page.
    #[inline]
    pub fn set_cursor_address(&mut self, addr: viewer_core::address::Address) {
        self.cursor_addr = addr;
    }

    #[inline]
    #[must_use]
    pub fn page_increment(&self) -> u64 {
        self.page_increment
    }

    #[inline]
    pub fn set_page_increment(&mut self, page_increment: u64) {
        self.page_increment = page_increment.max(1);
    }

    #[inline]
    #[must_use]
    pub fn view_area_size(&self) -> u64 {
        self.view_area_size
    }

    #[inline]
    #[must_use]
    pub fn file_end_address(&self) -> viewer_core::address::Address {
        self.buffer.file_end_addr()
    }

    #[inline]
    #[must_use]
    pub fn is_view_showing_end(&self) -> bool {
        self.view_end_addr == self.file_end_address()
    }

    #[inline]
    #[must_use]
    pub fn buffer(&self) -> &viewer_core::buffer_window::BufferWindow {
        &self.buffer
    }

    /// Character index of the view start in the live block.
    ///
    /// # Errors
    ///
    /// - `ViewerError::NoBlockLoaded` for an empty file.
    pub fn view_start_index(&self) -> viewer_core::errors::ViewerResult<usize> {
        self.buffer.block()?.index_of(self.view_start_addr)
    }

    /// Character index of the view end in the live block.
    ///
    /// # Errors
    ///
    /// - `ViewerError::NoBlockLoaded` for an empty file.
    pub fn view_end_index(&self) -> viewer_core::errors::ViewerResult<usize> {
        let block = self.buffer.block()?;

        // The last character of the file may have been cut from the block
        block.index_of(std::cmp::min(self.view_end_addr, block.end_addr()))
    }

    /// # Errors
    ///
    /// - `ViewerError::IndexOutOfRange` if `index` is past the live block.
    pub fn address_of_index(
        &self,
        index: usize,
    ) -> viewer_core::errors::ViewerResult<viewer_core::address::Address> {
        self.buffer.block()?.address_of(index)
    }

    /// Address under a caret placed at `caret_index` in the displayed text.
    /// A caret at or past the end of a page that shows the end of the file
    /// maps to the last address of the file.
    ///
    /// # Errors
    ///
    /// - `ViewerError::IndexOutOfRange` if the caret is past the live block.
    pub fn caret_to_address(
        &self,
        caret_index: usize,
    ) -> viewer_core::errors::ViewerResult<viewer_core::address::Address> {
        let cursor_index = self.view_start_index()? + caret_index;

        if cursor_index >= self.view_end_index()? && self.is_view_showing_end() {
            return Ok(self.file_end_address());
        }

        self.address_of_index(cursor_index)
    }
}

fn format_range(start: u64, end: u64) -> String {
    format!(
        "{}-{}",
        viewer_core::address::format_address(start),
        viewer_core::address::format_address(end)
    )
}
