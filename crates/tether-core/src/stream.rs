//! Agent session event types
//!
//! The agent SDK delivers an assistant turn as `content_block_start`,
//! `content_block_delta` and `content_block_stop` events wrapped in
//! `message_start`/`message_stop`. The client interleaves its own events
//! (user input, tool results, compaction boundaries) into the same stream.

use crate::error::{Error, Result};
use crate::types::ToolResultPayload;
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use tokio_stream::Stream;

/// Initial payload of a content block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        #[serde(default)]
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        /// Usually empty at start; the real input arrives as `input_json_delta`
        #[serde(default)]
        input: serde_json::Value,
    },
    Thinking {
        #[serde(default)]
        thinking: String,
    },
    /// Block kinds this client does not render (redacted thinking, server tools)
    #[serde(other)]
    Unsupported,
}

impl ContentBlock {
    /// Create a text block
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Create a tool-use block
    pub fn tool_use(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::ToolUse {
            id: id.into(),
            name: name.into(),
            input: serde_json::Value::Object(Default::default()),
        }
    }

    /// Create a thinking block
    pub fn thinking(thinking: impl Into<String>) -> Self {
        Self::Thinking {
            thinking: thinking.into(),
        }
    }
}

/// Incremental update to a started content block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Delta {
    TextDelta { text: String },
    /// Raw partial JSON of a tool input
    InputJsonDelta { partial_json: String },
    ThinkingDelta { thinking: String },
    /// Signature deltas and anything newer than this client
    #[serde(other)]
    Unknown,
}

impl Delta {
    /// Create a text delta
    pub fn text(text: impl Into<String>) -> Self {
        Self::TextDelta { text: text.into() }
    }

    /// Create a tool-input delta
    pub fn input_json(partial_json: impl Into<String>) -> Self {
        Self::InputJsonDelta {
            partial_json: partial_json.into(),
        }
    }

    /// Create a thinking delta
    pub fn thinking(thinking: impl Into<String>) -> Self {
        Self::ThinkingDelta {
            thinking: thinking.into(),
        }
    }
}

/// Events consumed by the turn assembler
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// An assistant turn begins
    MessageStart,
    ContentBlockStart {
        index: usize,
        content_block: ContentBlock,
    },
    ContentBlockDelta {
        index: usize,
        delta: Delta,
    },
    ContentBlockStop {
        index: usize,
    },
    /// The assistant turn is complete
    MessageStop,
    /// Text the user sent
    User { text: String },
    /// Result of a tool call, correlated by tool-use id
    ToolResult {
        tool_use_id: String,
        #[serde(flatten)]
        result: ToolResultPayload,
    },
    /// The session's context was compacted
    CompactBoundary {
        #[serde(default = "default_compact_trigger")]
        trigger: String,
        #[serde(default)]
        pre_tokens: Option<u64>,
    },
    /// Informational message from the host
    System { text: String },
}

fn default_compact_trigger() -> String {
    "auto".to_string()
}

impl SessionEvent {
    /// Check if this event belongs to the content-block protocol of a turn
    pub fn is_block_event(&self) -> bool {
        matches!(
            self,
            SessionEvent::ContentBlockStart { .. }
                | SessionEvent::ContentBlockDelta { .. }
                | SessionEvent::ContentBlockStop { .. }
        )
    }
}

/// A stream of session events
pub type SessionEventStream = Pin<Box<dyn Stream<Item = SessionEvent> + Send>>;

/// Decode a recorded event log (one JSON event per line).
///
/// Blank lines are skipped. Unlike transcript polling, a recorded log is
/// complete, so a malformed line is reported with its 1-based line number.
pub fn parse_event_log(content: &str) -> Result<Vec<SessionEvent>> {
    let mut events = Vec::new();
    for (idx, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let event = serde_json::from_str::<SessionEvent>(line)
            .map_err(|e| Error::invalid_event(idx + 1, e.to_string()))?;
        events.push(event);
    }
    Ok(events)
}
