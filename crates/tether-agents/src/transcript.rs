//! Background-agent transcript parsing
//!
//! A background agent appends one JSON event per line to its output file.
//! The file is read while the agent is still writing, so the last line may be
//! half flushed; every line is decoded on its own and failures are skipped.

use serde::{Deserialize, Serialize};
use tether_core::now_millis;

const COMMAND_SUMMARY_CHARS: usize = 80;
const QUERY_SUMMARY_CHARS: usize = 60;
const TEXT_SUMMARY_CHARS: usize = 100;

/// Kind of an activity record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    ToolCall,
    Text,
}

/// One observed assistant content block of a background agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    pub summary: String,
    /// Capture time of the parse, not the transcript's own timestamp
    pub timestamp: i64,
}

/// Result of parsing a transcript slice
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedTranscript {
    pub activities: Vec<Activity>,
    /// Full trimmed text of the last non-empty assistant text block
    pub last_assistant_text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TranscriptLine {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    message: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    content: AssistantContent,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AssistantContent {
    Blocks(Vec<TranscriptBlock>),
    Text(String),
}

impl Default for AssistantContent {
    fn default() -> Self {
        Self::Blocks(Vec::new())
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum TranscriptBlock {
    Text {
        #[serde(default)]
        text: String,
    },
    ToolUse {
        #[serde(default)]
        name: String,
        #[serde(default)]
        input: serde_json::Value,
    },
    #[serde(other)]
    Other,
}

fn non_blank_lines(content: &str) -> impl Iterator<Item = &str> {
    content.lines().filter(|line| !line.trim().is_empty())
}

/// Number of non-blank lines; the growth signal used by the poller.
///
/// Uses the same rule as the `start_line` slicing in [`parse_transcript`].
pub fn count_lines(content: &str) -> usize {
    non_blank_lines(content).count()
}

/// Parse transcript lines from `start_line` on, stamping activities with now
pub fn parse_transcript(content: &str, start_line: usize) -> ParsedTranscript {
    parse_transcript_at(content, start_line, now_millis())
}

/// Parse transcript lines from `start_line` on with an explicit capture time
pub fn parse_transcript_at(content: &str, start_line: usize, timestamp: i64) -> ParsedTranscript {
    let mut parsed = ParsedTranscript::default();

    for (offset, line) in non_blank_lines(content).skip(start_line).enumerate() {
        let event = match serde_json::from_str::<TranscriptLine>(line) {
            Ok(event) => event,
            Err(e) => {
                tracing::trace!(line = start_line + offset, error = %e, "skipping undecodable transcript line");
                continue;
            }
        };
        if event.kind != "assistant" {
            continue;
        }
        let Some(message) = event.message else {
            continue;
        };
        let message = match serde_json::from_value::<AssistantMessage>(message) {
            Ok(message) => message,
            Err(e) => {
                tracing::trace!(line = start_line + offset, error = %e, "skipping malformed assistant event");
                continue;
            }
        };

        let blocks = match message.content {
            AssistantContent::Blocks(blocks) => blocks,
            AssistantContent::Text(text) => vec![TranscriptBlock::Text { text }],
        };

        for block in blocks {
            match block {
                TranscriptBlock::ToolUse { name, input } => {
                    parsed.activities.push(Activity {
                        kind: ActivityKind::ToolCall,
                        summary: summarize_tool_input(&input),
                        tool_name: Some(name),
                        timestamp,
                    });
                }
                TranscriptBlock::Text { text } => {
                    let text = text.trim();
                    if text.is_empty() {
                        continue;
                    }
                    parsed.activities.push(Activity {
                        kind: ActivityKind::Text,
                        tool_name: None,
                        summary: truncate_with_ellipsis(text, TEXT_SUMMARY_CHARS),
                        timestamp,
                    });
                    parsed.last_assistant_text = Some(text.to_string());
                }
                TranscriptBlock::Other => {}
            }
        }
    }

    parsed
}

/// One-line description of a tool invocation from its input fields.
///
/// Priority: file basename, first command line, search pattern, query,
/// URL host.
pub fn summarize_tool_input(input: &serde_json::Value) -> String {
    let field = |key: &str| input.get(key).and_then(|v| v.as_str()).filter(|s| !s.is_empty());

    if let Some(path) = field("file_path")
        .or_else(|| field("path"))
        .or_else(|| field("notebook_path"))
    {
        return basename(path).to_string();
    }
    if let Some(command) = field("command") {
        let first_line = command.lines().next().unwrap_or_default();
        return truncate_chars(first_line, COMMAND_SUMMARY_CHARS);
    }
    if let Some(pattern) = field("pattern") {
        return pattern.to_string();
    }
    if let Some(query) = field("query") {
        return truncate_chars(query, QUERY_SUMMARY_CHARS);
    }
    if let Some(raw) = field("url") {
        return match url::Url::parse(raw) {
            Ok(parsed) => parsed
                .host_str()
                .map(str::to_string)
                .unwrap_or_else(|| truncate_chars(raw, QUERY_SUMMARY_CHARS)),
            Err(_) => truncate_chars(raw, QUERY_SUMMARY_CHARS),
        };
    }
    String::new()
}

fn basename(path: &str) -> &str {
    path.rsplit(['/', '\\'])
        .find(|segment| !segment.is_empty())
        .unwrap_or(path)
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

fn truncate_with_ellipsis(s: &str, max: usize) -> String {
    let mut chars = s.chars();
    let truncated: String = chars.by_ref().take(max).collect();
    if chars.next().is_some() {
        format!("{}...", truncated)
    } else {
        truncated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn assistant_line(content: serde_json::Value) -> String {
        json!({"type": "assistant", "message": {"role": "assistant", "content": content}})
            .to_string()
    }

    #[test]
    fn test_skips_user_invalid_and_keeps_assistant() {
        let content = [
            json!({"type": "user", "message": {"role": "user", "content": "go"}}).to_string(),
            "{\"type\": \"assistant\", \"message\": {".to_string(),
            assistant_line(json!([{"type": "text", "text": "Scanning the repo"}])),
        ]
        .join("\n");

        let parsed = parse_transcript_at(&content, 0, 42);
        assert_eq!(parsed.activities.len(), 1);
        assert_eq!(
            parsed.activities[0],
            Activity {
                kind: ActivityKind::Text,
                tool_name: None,
                summary: "Scanning the repo".into(),
                timestamp: 42,
            }
        );
        assert_eq!(parsed.last_assistant_text.as_deref(), Some("Scanning the repo"));
    }

    #[test]
    fn test_progress_events_are_ignored() {
        let content = json!({"type": "progress", "data": {"message": "working"}}).to_string();
        assert!(parse_transcript(&content, 0).activities.is_empty());
    }

    #[test]
    fn test_start_line_skips_seen_lines() {
        let content = [
            assistant_line(json!([{"type": "text", "text": "one"}])),
            String::new(),
            assistant_line(json!([{"type": "text", "text": "two"}])),
            "   ".to_string(),
            assistant_line(json!([{"type": "text", "text": "three"}])),
        ]
        .join("\n");

        assert_eq!(count_lines(&content), 3);
        let parsed = parse_transcript_at(&content, 2, 0);
        let summaries: Vec<&str> = parsed.activities.iter().map(|a| a.summary.as_str()).collect();
        assert_eq!(summaries, vec!["three"]);
        assert!(parse_transcript_at(&content, 3, 0).activities.is_empty());
    }

    #[test]
    fn test_tool_use_and_text_blocks_in_order() {
        let content = assistant_line(json!([
            {"type": "text", "text": "Let me look"},
            {"type": "tool_use", "id": "x", "name": "Read", "input": {"file_path": "/repo/src/main.rs"}},
            {"type": "tool_use", "id": "y", "name": "Bash", "input": {"command": "cargo build\ncargo test"}}
        ]));
        let parsed = parse_transcript_at(&content, 0, 7);
        let got: Vec<(ActivityKind, Option<&str>, &str)> = parsed
            .activities
            .iter()
            .map(|a| (a.kind, a.tool_name.as_deref(), a.summary.as_str()))
            .collect();
        assert_eq!(
            got,
            vec![
                (ActivityKind::Text, None, "Let me look"),
                (ActivityKind::ToolCall, Some("Read"), "main.rs"),
                (ActivityKind::ToolCall, Some("Bash"), "cargo build"),
            ]
        );
        assert!(parsed.activities.iter().all(|a| a.timestamp == 7));
    }

    #[test]
    fn test_last_assistant_text_wins_across_lines() {
        let content = [
            assistant_line(json!([{"type": "text", "text": "first"}])),
            assistant_line(json!([{"type": "tool_use", "name": "Grep", "input": {"pattern": "fn main"}}])),
            assistant_line(json!([{"type": "text", "text": "  final answer \n"}, {"type": "text", "text": "   "}])),
        ]
        .join("\n");
        let parsed = parse_transcript(&content, 0);
        assert_eq!(parsed.last_assistant_text.as_deref(), Some("final answer"));
        assert_eq!(parsed.activities.len(), 3);
    }

    #[test]
    fn test_string_content_counts_as_text() {
        let content = assistant_line(json!("plain string reply"));
        let parsed = parse_transcript(&content, 0);
        assert_eq!(parsed.last_assistant_text.as_deref(), Some("plain string reply"));
    }

    #[test]
    fn test_long_text_is_truncated_with_ellipsis() {
        let long = "x".repeat(150);
        let content = assistant_line(json!([{"type": "text", "text": long}]));
        let parsed = parse_transcript(&content, 0);
        assert_eq!(parsed.activities[0].summary.chars().count(), 103);
        assert!(parsed.activities[0].summary.ends_with("..."));
        assert_eq!(parsed.last_assistant_text.unwrap().len(), 150);
    }

    #[test]
    fn test_summary_priority() {
        assert_eq!(
            summarize_tool_input(&json!({"file_path": "C:\\work\\lib.rs", "command": "ls"})),
            "lib.rs"
        );
        assert_eq!(summarize_tool_input(&json!({"path": "/tmp/dir/"})), "dir");
        assert_eq!(
            summarize_tool_input(&json!({"command": "echo hi", "pattern": "p"})),
            "echo hi"
        );
        assert_eq!(summarize_tool_input(&json!({"pattern": "TODO", "query": "q"})), "TODO");
        assert_eq!(
            summarize_tool_input(&json!({"query": "q".repeat(100)})),
            "q".repeat(60)
        );
        assert_eq!(
            summarize_tool_input(&json!({"url": "https://docs.rs/tokio/latest"})),
            "docs.rs"
        );
        assert_eq!(summarize_tool_input(&json!({"url": "not a url"})), "not a url");
        assert_eq!(summarize_tool_input(&json!({"todos": []})), "");
        assert_eq!(summarize_tool_input(&json!(null)), "");
    }

    #[test]
    fn test_command_truncated_to_80_chars() {
        let command = format!("{} --flag", "a".repeat(100));
        assert_eq!(
            summarize_tool_input(&json!({"command": command})),
            "a".repeat(80)
        );
    }

    #[test]
    fn test_count_lines_matches_slicing() {
        let content = "{}\n\n  \n{}\n{\"partial\": ";
        assert_eq!(count_lines(content), 3);
        assert_eq!(count_lines(""), 0);
        assert_eq!(count_lines("\n\n"), 0);
    }
}
