//! Transcript scroll position

/// Scroll state for the transcript pane.
///
/// Follows the bottom until the user scrolls up; any change to the message
/// list snaps it back to the bottom.
#[derive(Debug, Clone)]
pub struct ScrollState {
    offset: usize,
    follow: bool,
    revision: u64,
    viewport: usize,
    total: usize,
}

impl Default for ScrollState {
    fn default() -> Self {
        Self {
            offset: 0,
            follow: true,
            revision: 0,
            viewport: 0,
            total: 0,
        }
    }
}

impl ScrollState {
    /// Record the store's message revision
    pub fn observe(&mut self, revision: u64) {
        if revision != self.revision {
            self.revision = revision;
            self.follow = true;
        }
    }

    pub fn page_up(&mut self) {
        let step = self.viewport.max(1);
        self.offset = self.offset.min(self.max_offset()).saturating_sub(step);
        self.follow = false;
    }

    pub fn page_down(&mut self) {
        let step = self.viewport.max(1);
        let max = self.max_offset();
        self.offset = (self.offset + step).min(max);
        self.follow = self.offset >= max;
    }

    /// Fix the offset for a transcript of `total` lines shown in `viewport`
    /// rows, and return it
    pub fn resolve(&mut self, total: usize, viewport: usize) -> usize {
        self.total = total;
        self.viewport = viewport;
        let max = self.max_offset();
        self.offset = if self.follow { max } else { self.offset.min(max) };
        self.offset
    }

    fn max_offset(&self) -> usize {
        self.total.saturating_sub(self.viewport)
    }
}
