//! Diff view widget with line numbers, word highlighting and collapsed context

use crate::diff::{DiffMode, DiffRow, FileDiff, LineKind, collapse};
use crate::theme::Theme;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::Modifier,
    text::{Line, Span},
    widgets::{Paragraph, Widget},
};
use std::collections::HashSet;

pub struct DiffView<'a> {
    diff: &'a FileDiff,
    theme: &'a Theme,
    file_path: Option<&'a str>,
    context: usize,
    expanded: Option<&'a HashSet<usize>>,
    scroll: usize,
}

impl<'a> DiffView<'a> {
    pub fn new(diff: &'a FileDiff, theme: &'a Theme) -> Self {
        Self {
            diff,
            theme,
            file_path: None,
            context: crate::diff::DEFAULT_CONTEXT_LINES,
            expanded: None,
            scroll: 0,
        }
    }

    pub fn file_path(mut self, path: &'a str) -> Self {
        self.file_path = Some(path);
        self
    }

    pub fn context(mut self, lines: usize) -> Self {
        self.context = lines;
        self
    }

    /// Placeholders the viewer has expanded, by start index
    pub fn expanded(mut self, expanded: &'a HashSet<usize>) -> Self {
        self.expanded = Some(expanded);
        self
    }

    pub fn scroll(mut self, scroll: usize) -> Self {
        self.scroll = scroll;
        self
    }

    /// All lines of the view, header first
    pub fn lines(&self) -> Vec<Line<'static>> {
        let empty = HashSet::new();
        let expanded = self.expanded.unwrap_or(&empty);
        let rows = collapse(&self.diff.lines, self.context, expanded);

        let gutter = self
            .diff
            .lines
            .iter()
            .filter_map(|l| l.new_line.or(l.old_line))
            .max()
            .unwrap_or(0)
            .to_string()
            .len();

        let mut lines = vec![self.header()];
        for row in rows {
            lines.push(match row {
                DiffRow::Line(line) => {
                    let (number, sign) = match line.kind {
                        LineKind::Context => (line.new_line, ' '),
                        LineKind::Added => (line.new_line, '+'),
                        LineKind::Removed => (line.old_line, '-'),
                    };
                    let number = number.map(|n| n.to_string()).unwrap_or_default();
                    let base = self.theme.diff_style(line.kind);
                    let mut spans = vec![
                        Span::styled(format!("{number:>gutter$} "), self.theme.dim_style()),
                        Span::styled(format!("{sign} "), base),
                    ];
                    match &line.segments {
                        Some(segments) => spans.extend(segments.iter().map(|s| {
                            let style = if s.changed {
                                self.theme.diff_word_style(line.kind)
                            } else {
                                base
                            };
                            Span::styled(s.text.clone(), style)
                        })),
                        None => spans.push(Span::styled(line.text.clone(), base)),
                    }
                    Line::from(spans)
                }
                DiffRow::Collapsed { hidden, .. } => Line::from(Span::styled(
                    format!("{:>gutter$} ⋯ {hidden} unchanged lines", ""),
                    self.theme.dim_style().add_modifier(Modifier::ITALIC),
                )),
            });
        }
        lines
    }

    fn header(&self) -> Line<'static> {
        let mut spans = Vec::new();
        if let Some(path) = self.file_path {
            spans.push(Span::styled(
                format!("{path} "),
                self.theme.base_style().add_modifier(Modifier::BOLD),
            ));
        }
        spans.push(Span::styled(
            format!("+{}", self.diff.added()),
            self.theme.diff_style(LineKind::Added),
        ));
        spans.push(Span::raw(" "));
        spans.push(Span::styled(
            format!("-{}", self.diff.removed()),
            self.theme.diff_style(LineKind::Removed),
        ));
        let note = match self.diff.mode {
            DiffMode::Applied => None,
            DiffMode::Pending => Some(" (not yet applied)"),
            DiffMode::Fragment => Some(" (snippet)"),
        };
        if let Some(note) = note {
            spans.push(Span::styled(note, self.theme.dim_style()));
        }
        Line::from(spans)
    }
}

impl Widget for DiffView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width == 0 || area.height == 0 {
            return;
        }
        let lines: Vec<Line> = self
            .lines()
            .into_iter()
            .skip(self.scroll)
            .take(area.height as usize)
            .collect();
        Paragraph::new(lines).render(area, buf);
    }
}

/// Plain-text rendering of a line, for non-terminal output
pub fn plain_text(line: &Line<'_>) -> String {
    line.spans.iter().map(|s| s.content.as_ref()).collect()
}
