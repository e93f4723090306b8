//! Animated spinner widget

use ratatui::{buffer::Buffer, layout::Rect, style::Style, text::Span, widgets::Widget};
use std::time::Duration;

const SPINNER_FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
const FRAME_DURATION: Duration = Duration::from_millis(80);

/// Spinner frame for the given animation time
pub fn frame_at(elapsed: Duration) -> &'static str {
    let index = (elapsed.as_millis() / FRAME_DURATION.as_millis()) as usize;
    SPINNER_FRAMES[index % SPINNER_FRAMES.len()]
}

/// Spinner followed by a label.
///
/// The animation time is supplied by the caller so every spinner on screen
/// advances in step.
pub struct Spinner<'a> {
    label: &'a str,
    style: Style,
    elapsed: Duration,
}

impl<'a> Spinner<'a> {
    pub fn new(label: &'a str, style: Style) -> Self {
        Self {
            label,
            style,
            elapsed: Duration::ZERO,
        }
    }

    pub fn elapsed(mut self, elapsed: Duration) -> Self {
        self.elapsed = elapsed;
        self
    }

    pub fn to_span(&self) -> Span<'static> {
        Span::styled(
            format!("{} {}", frame_at(self.elapsed), self.label),
            self.style,
        )
    }
}

impl Widget for Spinner<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width < 3 || area.height == 0 {
            return;
        }
        buf.set_span(area.x, area.y, &self.to_span(), area.width);
    }
}
