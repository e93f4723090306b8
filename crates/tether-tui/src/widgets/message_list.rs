//! Message list widget for displaying the conversation

use crate::reconcile::{is_continuation, visible_messages};
use crate::theme::Theme;
use crate::widgets::markdown::render_markdown;
use crate::widgets::spinner::frame_at;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Widget, Wrap},
};
use std::time::Duration;
use tether_agents::summarize_tool_input;
use tether_core::{Role, UiMessage};

/// Lines of a collapsed thinking trace shown once it is complete
const THINKING_PREVIEW_LINES: usize = 3;

/// Widget for displaying a list of chat messages
pub struct MessageList<'a> {
    messages: &'a [UiMessage],
    theme: &'a Theme,
    scroll: usize,
    elapsed: Duration,
}

impl<'a> MessageList<'a> {
    pub fn new(messages: &'a [UiMessage], theme: &'a Theme) -> Self {
        Self {
            messages,
            theme,
            scroll: 0,
            elapsed: Duration::ZERO,
        }
    }

    /// Set scroll offset
    pub fn scroll(mut self, scroll: usize) -> Self {
        self.scroll = scroll;
        self
    }

    /// Animation time for streaming indicators
    pub fn elapsed(mut self, elapsed: Duration) -> Self {
        self.elapsed = elapsed;
        self
    }
}

impl Widget for MessageList<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width == 0 || area.height == 0 {
            return;
        }

        let visible: Vec<Line> = message_lines(
            self.messages,
            self.theme,
            area.width as usize,
            self.elapsed,
        )
        .into_iter()
        .skip(self.scroll)
        .take(area.height as usize)
        .collect();

        Paragraph::new(visible)
            .wrap(Wrap { trim: false })
            .render(area, buf);
    }
}

/// Total height of the rendered conversation
pub fn calculate_message_height(messages: &[UiMessage], theme: &Theme, width: usize) -> usize {
    message_lines(messages, theme, width, Duration::ZERO).len()
}

/// Render the whole conversation into lines.
///
/// Agent-side messages that continue the previous agent output are drawn
/// without a header or separator.
pub fn message_lines(
    messages: &[UiMessage],
    theme: &Theme,
    width: usize,
    elapsed: Duration,
) -> Vec<Line<'static>> {
    let renderer = Renderer {
        theme,
        content_width: width.saturating_sub(2),
        elapsed,
    };
    let mut lines = Vec::new();
    let mut previous: Option<&UiMessage> = None;

    for message in visible_messages(messages) {
        let continuation = is_continuation(previous, message);
        if !continuation {
            if !lines.is_empty() {
                lines.push(Line::default());
            }
            lines.push(renderer.header(message));
        }
        renderer.body(message, &mut lines);
        previous = Some(message);
    }
    lines
}

struct Renderer<'t> {
    theme: &'t Theme,
    content_width: usize,
    elapsed: Duration,
}

impl Renderer<'_> {
    fn header(&self, msg: &UiMessage) -> Line<'static> {
        let style = self.theme.role_style(msg.role);
        let text = match msg.role {
            Role::User => "▶ You".to_string(),
            Role::System => "● System".to_string(),
            Role::Summary => "≡ Context compacted".to_string(),
            _ if msg.is_streaming => "◀ Assistant ▌".to_string(),
            _ => "◀ Assistant".to_string(),
        };
        Line::from(Span::styled(text, style))
    }

    fn body(&self, msg: &UiMessage, lines: &mut Vec<Line<'static>>) {
        match msg.role {
            Role::User | Role::System => self.wrapped(&msg.content, self.theme.base_style(), lines),
            Role::Summary => {
                let mut text = format!("trigger: {}", msg.compact_trigger.as_deref().unwrap_or("auto"));
                if let Some(tokens) = msg.compact_pre_tokens {
                    text.push_str(&format!(", {tokens} tokens before"));
                }
                self.wrapped(&text, self.theme.dim_style(), lines);
            }
            Role::Assistant => self.assistant(msg, lines),
            Role::ToolCall => self.tool_call(msg, lines),
            Role::ToolResult => {
                let name = msg.tool_name.as_deref().unwrap_or("tool");
                lines.push(self.indented(vec![Span::styled(
                    format!("⚙ {name} result"),
                    Style::default().fg(self.theme.tool),
                )]));
                let style = if msg.tool_result.as_ref().is_some_and(|r| r.is_error) {
                    self.theme.error_style()
                } else {
                    self.theme.dim_style()
                };
                self.wrapped(&msg.content, style, lines);
            }
        }
    }

    fn assistant(&self, msg: &UiMessage, lines: &mut Vec<Line<'static>>) {
        if let Some(thinking) = msg.thinking.as_deref().filter(|t| !t.trim().is_empty()) {
            if msg.thinking_complete {
                lines.push(self.indented(vec![Span::styled("✻ Thought", self.theme.dim_style())]));
                let preview: Vec<&str> = thinking.lines().take(THINKING_PREVIEW_LINES).collect();
                self.wrapped(&preview.join("\n"), self.theme.thinking_style(), lines);
            } else {
                lines.push(self.indented(vec![Span::styled(
                    format!("{} Thinking…", frame_at(self.elapsed)),
                    self.theme.warning_style(),
                )]));
                self.wrapped(thinking, self.theme.thinking_style(), lines);
            }
        }

        if msg.content.is_empty() {
            if msg.is_streaming && msg.thinking.is_none() {
                lines.push(self.indented(vec![Span::styled(
                    format!("{} thinking...", frame_at(self.elapsed)),
                    self.theme.warning_style(),
                )]));
            }
            return;
        }
        for line in render_markdown(&msg.content, self.theme, self.content_width) {
            lines.push(self.indented(line.spans));
        }
    }

    fn tool_call(&self, msg: &UiMessage, lines: &mut Vec<Line<'static>>) {
        let name = msg.tool_name.clone().unwrap_or_default();
        let summary = msg
            .tool_input
            .as_ref()
            .map(summarize_tool_input)
            .unwrap_or_default();
        let tool_style = Style::default().fg(self.theme.tool);
        let mut spans = vec![Span::styled(
            format!("⚙ {name}"),
            tool_style.add_modifier(Modifier::BOLD),
        )];
        if !summary.is_empty() {
            spans.push(Span::styled(format!(" {summary}"), tool_style));
        }
        lines.push(self.indented(spans));

        let Some(result) = msg.tool_result.as_ref() else {
            return;
        };
        let (marker, style) = if result.is_error {
            ("✗", self.theme.error_style())
        } else if msg.is_background_agent_call() {
            ("↻", self.theme.warning_style())
        } else {
            ("⎿", self.theme.dim_style())
        };
        let first = if msg.is_background_agent_call() {
            "running in background"
        } else {
            result.content.lines().next().unwrap_or_default()
        };
        let first = textwrap::wrap(first, self.content_width.saturating_sub(2).max(1))
            .into_iter()
            .next()
            .map(|c| c.into_owned())
            .unwrap_or_default();
        lines.push(self.indented(vec![Span::styled(format!("{marker} {first}"), style)]));
    }

    fn wrapped(&self, text: &str, style: Style, lines: &mut Vec<Line<'static>>) {
        for line in textwrap::wrap(text, self.content_width.max(1)) {
            lines.push(self.indented(vec![Span::styled(line.into_owned(), style)]));
        }
    }

    fn indented(&self, spans: Vec<Span<'static>>) -> Line<'static> {
        let mut out = Vec::with_capacity(spans.len() + 1);
        out.push(Span::raw("  "));
        out.extend(spans);
        Line::from(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tether_core::ToolResultPayload;

    fn rows(buf: &Buffer) -> Vec<String> {
        (0..buf.area.height)
            .map(|y| {
                (0..buf.area.width)
                    .map(|x| buf[(x, y)].symbol())
                    .collect::<String>()
                    .trim_end()
                    .to_string()
            })
            .collect()
    }

    fn render(messages: &[UiMessage], width: u16, height: u16) -> Vec<String> {
        let theme = Theme::dark();
        let area = Rect::new(0, 0, width, height);
        let mut buf = Buffer::empty(area);
        MessageList::new(messages, &theme).render(area, &mut buf);
        rows(&buf)
    }

    #[test]
    fn test_continuation_has_single_header() {
        let mut call = UiMessage::tool_call("t1", "Read", json!({"file_path": "/src/main.rs"}), 3);
        call.attach_tool_result(ToolResultPayload::text("fn main() {}"));
        let messages = vec![
            UiMessage::user("u1", "show main", 1),
            UiMessage::assistant("a1", "Reading it.", 2),
            call,
            UiMessage::tool_result("t1", Some("Read".into()), ToolResultPayload::text("fn main() {}"), 4),
            UiMessage::assistant("a2", "Done.", 5),
        ];
        let rows = render(&messages, 40, 20);

        assert_eq!(rows.iter().filter(|r| r.starts_with("◀ Assistant")).count(), 1);
        assert_eq!(rows[0], "▶ You");
        assert_eq!(rows[1], "  show main");
        assert!(rows.contains(&"  ⚙ Read main.rs".to_string()));
        assert!(rows.contains(&"  ⎿ fn main() {}".to_string()));
        // Folded result is not drawn separately
        assert!(!rows.iter().any(|r| r.contains("Read result")));
    }

    #[test]
    fn test_streaming_placeholder() {
        let messages = vec![UiMessage::assistant_streaming("a1", 1)];
        let rows = render(&messages, 30, 3);
        assert_eq!(rows[0], "◀ Assistant ▌");
        assert!(rows[1].ends_with("thinking..."));
    }

    #[test]
    fn test_background_agent_marker() {
        let mut call = UiMessage::tool_call("t1", "Task", json!({"description": "Audit"}), 1);
        call.attach_tool_result(ToolResultPayload {
            is_async: true,
            output_file: Some("/tmp/t1.jsonl".into()),
            ..Default::default()
        });
        let rows = render(&[call], 40, 4);
        assert!(rows.contains(&"  ↻ running in background".to_string()));
    }

    #[test]
    fn test_height_matches_rendered_lines() {
        let theme = Theme::dark();
        let messages = vec![
            UiMessage::user("u1", "hi", 1),
            UiMessage::assistant("a1", "hello", 2),
        ];
        // header + body, separator, header + body
        assert_eq!(calculate_message_height(&messages, &theme, 40), 5);
    }
}
