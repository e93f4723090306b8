//! Subcommand handlers for the `tether` binary

mod diff;
mod replay;
mod resume;
mod sessions;
mod watch;

pub use diff::{DiffCommand, DiffTarget};
pub use replay::ReplayCommand;
pub use resume::ResumeCommand;
pub use sessions::SessionsCommand;
pub use watch::WatchCommand;

use ratatui::text::Line;
use std::time::Duration;
use tether_core::UiMessage;
use tether_tui::Theme;
use tether_tui::widgets::diff_view::plain_text;
use tether_tui::widgets::message_list::message_lines;

/// Width used when printing rendered views to stdout
pub const OUTPUT_WIDTH: usize = 100;

/// Render a conversation as plain text lines
pub fn conversation_text(messages: &[UiMessage]) -> Vec<String> {
    let theme = Theme::default();
    plain_lines(&message_lines(messages, &theme, OUTPUT_WIDTH, Duration::ZERO))
}

pub fn plain_lines(lines: &[Line<'_>]) -> Vec<String> {
    lines.iter().map(|l| plain_text(l).trim_end().to_string()).collect()
}

pub fn print_lines(lines: &[String]) {
    for line in lines {
        println!("{line}");
    }
}
