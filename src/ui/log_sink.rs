//! Log Sink: ordered, append-only view of the compile log.

use crate::models::LogEvent;

/// Placeholder shown after the user clears the view.
pub const CLEARED_PLACEHOLDER: &str = "日志已清空";

#[derive(Debug, Clone)]
pub struct LogSink {
    entries: Vec<LogEvent>,
    placeholder: Option<&'static str>,
    auto_scroll: bool,
    /// End (exclusive) of the viewport; follows the newest entry while auto-scrolling
    scroll_offset: usize,
    /// Entries appended since the view last rendered
    unseen: usize,
}

impl Default for LogSink {
    fn default() -> Self {
        Self::new(true)
    }
}

impl LogSink {
    pub fn new(auto_scroll: bool) -> Self {
        LogSink {
            entries: Vec::new(),
            placeholder: None,
            auto_scroll,
            scroll_offset: 0,
            unseen: 0,
        }
    }

    /// Append one entry in arrival order.
    pub fn append(&mut self, event: LogEvent) {
        self.placeholder = None;
        self.entries.push(event);
        self.unseen += 1;
        if self.auto_scroll {
            self.scroll_offset = self.entries.len();
        }
    }

    /// User-initiated clear: empty the view and show the placeholder.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.placeholder = Some(CLEARED_PLACEHOLDER);
        self.scroll_offset = 0;
        self.unseen = 0;
    }

    /// Compile-start reset: empty the view without a placeholder.
    pub fn reset(&mut self) {
        self.entries.clear();
        self.placeholder = None;
        self.scroll_offset = 0;
        self.unseen = 0;
    }

    pub fn auto_scroll(&self) -> bool {
        self.auto_scroll
    }

    /// Flip auto-scroll. The viewport does not move.
    pub fn toggle_auto_scroll(&mut self) -> bool {
        self.auto_scroll = !self.auto_scroll;
        self.auto_scroll
    }

    pub fn auto_scroll_label(&self) -> &'static str {
        if self.auto_scroll {
            "自动滚动"
        } else {
            "手动滚动"
        }
    }

    /// Move the manual viewport so it ends at `end` (exclusive).
    pub fn scroll_to(&mut self, end: usize) {
        self.scroll_offset = end.min(self.entries.len());
    }

    pub fn entries(&self) -> &[LogEvent] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn placeholder(&self) -> Option<&'static str> {
        self.placeholder
    }

    /// Entries inside a viewport of `window` lines.
    ///
    /// A manual viewport never ends before the first full page, so a view
    /// that was never scrolled fills from the top as lines arrive.
    pub fn visible(&self, window: usize) -> &[LogEvent] {
        let end = self.scroll_offset.max(window).min(self.entries.len());
        let start = end.saturating_sub(window);
        &self.entries[start..end]
    }

    /// Take the entries appended since the last call, for incremental output.
    pub fn drain_unseen(&mut self) -> &[LogEvent] {
        let start = self.entries.len() - self.unseen.min(self.entries.len());
        self.unseen = 0;
        &self.entries[start..]
    }

    pub fn render_line(event: &LogEvent) -> String {
        format!(
            "[{}] {} {}",
            event.timestamp,
            event.level.as_str().to_uppercase(),
            event.message
        )
    }

    /// One line per entry, or the placeholder.
    pub fn render(&self) -> Vec<String> {
        if self.entries.is_empty() {
            return self.placeholder.map(|p| vec![p.to_string()]).unwrap_or_default();
        }
        self.entries.iter().map(Self::render_line).collect()
    }
}
