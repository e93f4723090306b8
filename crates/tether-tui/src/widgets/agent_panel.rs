//! Background agent panel

use crate::theme::Theme;
use crate::widgets::spinner::Spinner;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::Modifier,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget},
};
use std::time::Duration;
use tether_agents::{ActivityKind, AgentStatus, BackgroundAgent};

/// Activities shown per agent, most recent last
const DEFAULT_RECENT_ACTIVITY: usize = 3;

/// Lists tracked background agents with their latest activity
pub struct AgentPanel<'a> {
    agents: &'a [BackgroundAgent],
    theme: &'a Theme,
    elapsed: Duration,
    recent: usize,
}

impl<'a> AgentPanel<'a> {
    pub fn new(agents: &'a [BackgroundAgent], theme: &'a Theme) -> Self {
        Self {
            agents,
            theme,
            elapsed: Duration::ZERO,
            recent: DEFAULT_RECENT_ACTIVITY,
        }
    }

    pub fn elapsed(mut self, elapsed: Duration) -> Self {
        self.elapsed = elapsed;
        self
    }

    pub fn recent_activity(mut self, count: usize) -> Self {
        self.recent = count;
        self
    }

    pub fn lines(&self) -> Vec<Line<'static>> {
        let mut lines = Vec::new();
        for agent in self.agents {
            let title = if agent.description.is_empty() {
                agent.agent_id.as_str()
            } else {
                agent.description.as_str()
            };
            let status = match agent.status {
                AgentStatus::Running => {
                    Spinner::new(title, self.theme.warning_style().add_modifier(Modifier::BOLD))
                        .elapsed(self.elapsed)
                        .to_span()
                }
                AgentStatus::Completed => Span::styled(
                    format!("✓ {title}"),
                    self.theme.success_style().add_modifier(Modifier::BOLD),
                ),
            };
            lines.push(Line::from(status));

            let skip = agent.activity.len().saturating_sub(self.recent);
            for activity in &agent.activity[skip..] {
                let text = match activity.kind {
                    ActivityKind::ToolCall => {
                        let name = activity.tool_name.as_deref().unwrap_or("tool");
                        if activity.summary.is_empty() {
                            format!("  ⚙ {name}")
                        } else {
                            format!("  ⚙ {name} {}", activity.summary)
                        }
                    }
                    ActivityKind::Text => format!("  • {}", activity.summary),
                };
                lines.push(Line::from(Span::styled(text, self.theme.dim_style())));
            }

            if let Some(result) = agent.result.as_deref() {
                let first = result.lines().next().unwrap_or_default();
                lines.push(Line::from(Span::styled(
                    format!("  ⎿ {first}"),
                    self.theme.base_style(),
                )));
            }
        }
        lines
    }
}

impl Widget for AgentPanel<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let running = self.agents.iter().filter(|a| a.is_running()).count();
        let block = Block::default()
            .borders(Borders::TOP)
            .border_style(self.theme.border_style())
            .title(format!(" Background agents ({running} running) "));
        let inner = block.inner(area);
        block.render(area, buf);
        if inner.width == 0 || inner.height == 0 {
            return;
        }
        let lines = self.lines();
        // Keep the newest agents visible
        let skip = lines.len().saturating_sub(inner.height as usize);
        Paragraph::new(lines.into_iter().skip(skip).collect::<Vec<_>>()).render(inner, buf);
    }
}
