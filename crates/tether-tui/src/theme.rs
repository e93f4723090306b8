//! Color theme support

use ratatui::style::{Color, Modifier, Style};
use tether_core::Role;

use crate::diff::LineKind;

/// Color theme for the chat, diff and agent views
#[derive(Debug, Clone)]
pub struct Theme {
    pub fg: Color,
    /// Dimmed/secondary text
    pub dim: Color,
    /// User prompts and headers
    pub accent: Color,
    pub error: Color,
    /// Assistant headers, completed agents
    pub success: Color,
    /// Running agents
    pub warning: Color,
    pub border: Color,
    /// Tool calls
    pub tool: Color,
    /// Reasoning traces
    pub thinking: Color,
    pub code: Color,
    pub link: Color,
    pub diff_added: Color,
    pub diff_removed: Color,
    /// Background of changed words inside a changed line
    pub diff_added_word: Color,
    pub diff_removed_word: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self::dark()
    }
}

impl Theme {
    /// Dark theme (default)
    pub fn dark() -> Self {
        Self {
            fg: Color::White,
            dim: Color::DarkGray,
            accent: Color::Cyan,
            error: Color::Red,
            success: Color::Green,
            warning: Color::Yellow,
            border: Color::DarkGray,
            tool: Color::Magenta,
            thinking: Color::Gray,
            code: Color::Magenta,
            link: Color::Blue,
            diff_added: Color::Green,
            diff_removed: Color::Red,
            diff_added_word: Color::Rgb(0, 80, 0),
            diff_removed_word: Color::Rgb(100, 0, 0),
        }
    }

    /// Light theme
    pub fn light() -> Self {
        Self {
            fg: Color::Black,
            dim: Color::Gray,
            accent: Color::Blue,
            error: Color::Red,
            success: Color::Green,
            warning: Color::Rgb(180, 120, 0),
            border: Color::Gray,
            tool: Color::Magenta,
            thinking: Color::DarkGray,
            code: Color::Magenta,
            link: Color::Blue,
            diff_added: Color::Rgb(0, 120, 0),
            diff_removed: Color::Rgb(160, 0, 0),
            diff_added_word: Color::Rgb(190, 240, 190),
            diff_removed_word: Color::Rgb(250, 200, 200),
        }
    }

    pub fn base_style(&self) -> Style {
        Style::default().fg(self.fg)
    }

    pub fn dim_style(&self) -> Style {
        Style::default().fg(self.dim)
    }

    pub fn accent_style(&self) -> Style {
        Style::default().fg(self.accent)
    }

    pub fn error_style(&self) -> Style {
        Style::default().fg(self.error)
    }

    pub fn success_style(&self) -> Style {
        Style::default().fg(self.success)
    }

    pub fn warning_style(&self) -> Style {
        Style::default().fg(self.warning)
    }

    pub fn code_style(&self) -> Style {
        Style::default().fg(self.code)
    }

    pub fn border_style(&self) -> Style {
        Style::default().fg(self.border)
    }

    pub fn thinking_style(&self) -> Style {
        Style::default()
            .fg(self.thinking)
            .add_modifier(Modifier::ITALIC)
    }

    /// Header style for a message role
    pub fn role_style(&self, role: Role) -> Style {
        let style = match role {
            Role::User => self.accent_style(),
            Role::Assistant => self.success_style(),
            Role::ToolCall | Role::ToolResult => Style::default().fg(self.tool),
            Role::System | Role::Summary => self.dim_style(),
        };
        style.add_modifier(Modifier::BOLD)
    }

    /// Style of a whole diff line
    pub fn diff_style(&self, kind: LineKind) -> Style {
        match kind {
            LineKind::Context => self.dim_style(),
            LineKind::Added => Style::default().fg(self.diff_added),
            LineKind::Removed => Style::default().fg(self.diff_removed),
        }
    }

    /// Style of a changed word inside a diff line
    pub fn diff_word_style(&self, kind: LineKind) -> Style {
        match kind {
            LineKind::Added => self.diff_style(kind).bg(self.diff_added_word),
            LineKind::Removed => self.diff_style(kind).bg(self.diff_removed_word),
            LineKind::Context => self.diff_style(kind),
        }
    }
}
