//! Core message types shared by the assembler, the poller and the views

use serde::{Deserialize, Serialize};

/// Prefix of every `tool_call` message id; the rest is the tool-use identifier.
pub const TOOL_CALL_ID_PREFIX: &str = "tool-";

/// Prefix of every `tool_result` message id.
pub const TOOL_RESULT_ID_PREFIX: &str = "result-";

/// Tools whose results may point at a background agent transcript
pub const ASYNC_AGENT_TOOLS: &[&str] = &["Task", "Agent"];

/// Message roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
    ToolCall,
    ToolResult,
    System,
    /// Context-compaction boundary
    Summary,
}

impl Role {
    /// Get the role as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::ToolCall => "tool_call",
            Role::ToolResult => "tool_result",
            Role::System => "system",
            Role::Summary => "summary",
        }
    }

    /// Whether messages of this role are produced by the agent's turn
    pub fn is_agent_side(&self) -> bool {
        matches!(self, Role::Assistant | Role::ToolCall | Role::ToolResult)
    }
}

/// Outcome of a tool call as reported by the agent session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResultPayload {
    /// Text returned to the model
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub is_error: bool,
    /// The tool launched work that keeps running after the call returned
    #[serde(default)]
    pub is_async: bool,
    /// Transcript written by the spawned background agent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
}

impl ToolResultPayload {
    /// Create a plain (synchronous) result
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }

    /// Create an error result
    pub fn error(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: true,
            ..Default::default()
        }
    }

    /// Whether this result carries the markers of a pollable background agent
    pub fn spawns_background_agent(&self) -> bool {
        self.is_async && self.output_file.as_deref().is_some_and(|f| !f.is_empty())
    }
}

/// A single message of conversation state, as rendered by the chat view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiMessage {
    /// Unique within a session, stable across restores
    pub id: String,
    pub role: Role,
    /// Accumulated text (may be empty while streaming)
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thinking: Option<String>,
    #[serde(default)]
    pub thinking_complete: bool,
    #[serde(default)]
    pub is_streaming: bool,
    /// Logical ordering key, monotonic per session
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_input: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_result: Option<ToolResultPayload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compact_trigger: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compact_pre_tokens: Option<u64>,
}

impl UiMessage {
    fn base(id: impl Into<String>, role: Role, content: impl Into<String>, timestamp: i64) -> Self {
        Self {
            id: id.into(),
            role,
            content: content.into(),
            thinking: None,
            thinking_complete: false,
            is_streaming: false,
            timestamp,
            tool_name: None,
            tool_input: None,
            tool_result: None,
            compact_trigger: None,
            compact_pre_tokens: None,
        }
    }

    /// Create a user message
    pub fn user(id: impl Into<String>, content: impl Into<String>, timestamp: i64) -> Self {
        Self::base(id, Role::User, content, timestamp)
    }

    /// Create a finished assistant message
    pub fn assistant(id: impl Into<String>, content: impl Into<String>, timestamp: i64) -> Self {
        Self::base(id, Role::Assistant, content, timestamp)
    }

    /// Create an assistant message that is still receiving deltas
    pub fn assistant_streaming(id: impl Into<String>, timestamp: i64) -> Self {
        Self {
            is_streaming: true,
            ..Self::base(id, Role::Assistant, "", timestamp)
        }
    }

    /// Create a system message
    pub fn system(id: impl Into<String>, content: impl Into<String>, timestamp: i64) -> Self {
        Self::base(id, Role::System, content, timestamp)
    }

    /// Create a context-compaction summary marker
    pub fn summary(
        id: impl Into<String>,
        trigger: impl Into<String>,
        pre_tokens: Option<u64>,
        timestamp: i64,
    ) -> Self {
        Self {
            compact_trigger: Some(trigger.into()),
            compact_pre_tokens: pre_tokens,
            ..Self::base(id, Role::Summary, "", timestamp)
        }
    }

    /// Create a tool call; the message id is derived from the tool-use id
    pub fn tool_call(
        tool_use_id: &str,
        tool_name: impl Into<String>,
        input: serde_json::Value,
        timestamp: i64,
    ) -> Self {
        Self {
            tool_name: Some(tool_name.into()),
            tool_input: Some(input),
            ..Self::base(
                format!("{TOOL_CALL_ID_PREFIX}{tool_use_id}"),
                Role::ToolCall,
                "",
                timestamp,
            )
        }
    }

    /// Create a tool result message correlated to `tool_use_id`
    pub fn tool_result(
        tool_use_id: &str,
        tool_name: Option<String>,
        payload: ToolResultPayload,
        timestamp: i64,
    ) -> Self {
        Self {
            tool_name,
            content: payload.content.clone(),
            tool_result: Some(payload),
            ..Self::base(
                format!("{TOOL_RESULT_ID_PREFIX}{tool_use_id}"),
                Role::ToolResult,
                "",
                timestamp,
            )
        }
    }

    /// The tool-use identifier this message is correlated with, if any
    pub fn tool_use_id(&self) -> Option<&str> {
        match self.role {
            Role::ToolCall => self.id.strip_prefix(TOOL_CALL_ID_PREFIX),
            Role::ToolResult => self.id.strip_prefix(TOOL_RESULT_ID_PREFIX),
            _ => None,
        }
    }

    /// Attach the result of a tool call.
    ///
    /// Returns `false` and leaves the message untouched if it is not a tool call
    /// or already has a result.
    pub fn attach_tool_result(&mut self, payload: ToolResultPayload) -> bool {
        if self.role != Role::ToolCall || self.tool_result.is_some() {
            return false;
        }
        self.tool_result = Some(payload);
        true
    }

    /// String field of the tool input, if present
    pub fn tool_input_str(&self, key: &str) -> Option<&str> {
        self.tool_input.as_ref()?.get(key)?.as_str()
    }

    /// Whether this tool call launched a pollable background agent
    pub fn is_background_agent_call(&self) -> bool {
        self.role == Role::ToolCall
            && self
                .tool_name
                .as_deref()
                .is_some_and(|name| ASYNC_AGENT_TOOLS.contains(&name))
            && self
                .tool_result
                .as_ref()
                .is_some_and(ToolResultPayload::spawns_background_agent)
    }

    /// Whether the message has anything worth rendering
    pub fn has_meaningful_content(&self) -> bool {
        match self.role {
            Role::Assistant => {
                !self.content.trim().is_empty()
                    || self.thinking.as_deref().is_some_and(|t| !t.trim().is_empty())
            }
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tool_use_id_roundtrip() {
        let call = UiMessage::tool_call("toolu_01", "Bash", json!({"command": "ls"}), 1);
        assert_eq!(call.id, "tool-toolu_01");
        assert_eq!(call.tool_use_id(), Some("toolu_01"));

        let result = UiMessage::tool_result("toolu_01", None, ToolResultPayload::text("ok"), 2);
        assert_eq!(result.tool_use_id(), Some("toolu_01"));
        assert_eq!(result.content, "ok");
    }

    #[test]
    fn test_tool_use_id_absent_for_plain_messages() {
        let msg = UiMessage::user("tool-looks-like-a-call", "hi", 1);
        assert_eq!(msg.tool_use_id(), None);
    }

    #[test]
    fn test_attach_tool_result_only_once() {
        let mut call = UiMessage::tool_call("t1", "Read", json!({}), 1);
        assert!(call.attach_tool_result(ToolResultPayload::text("first")));
        assert!(!call.attach_tool_result(ToolResultPayload::text("second")));
        assert_eq!(call.tool_result.unwrap().content, "first");
    }

    #[test]
    fn test_attach_tool_result_rejects_non_tool_call() {
        let mut msg = UiMessage::assistant("a1", "hello", 1);
        assert!(!msg.attach_tool_result(ToolResultPayload::text("x")));
        assert!(msg.tool_result.is_none());
    }

    #[test]
    fn test_background_agent_call_detection() {
        let mut call = UiMessage::tool_call("t1", "Task", json!({"description": "scan"}), 1);
        assert!(!call.is_background_agent_call());

        call.attach_tool_result(ToolResultPayload {
            content: "launched".into(),
            is_async: true,
            output_file: Some("/tmp/agent-1.jsonl".into()),
            ..Default::default()
        });
        assert!(call.is_background_agent_call());
    }

    #[test]
    fn test_background_agent_requires_known_tool_and_file() {
        let mut call = UiMessage::tool_call("t1", "Bash", json!({}), 1);
        call.attach_tool_result(ToolResultPayload {
            is_async: true,
            output_file: Some("/tmp/out".into()),
            ..Default::default()
        });
        assert!(!call.is_background_agent_call());

        let mut task = UiMessage::tool_call("t2", "Task", json!({}), 1);
        task.attach_tool_result(ToolResultPayload {
            is_async: true,
            output_file: Some(String::new()),
            ..Default::default()
        });
        assert!(!task.is_background_agent_call());
    }

    #[test]
    fn test_serde_uses_camel_case() {
        let mut call = UiMessage::tool_call("t1", "Task", json!({}), 5);
        call.attach_tool_result(ToolResultPayload {
            is_async: true,
            output_file: Some("/tmp/a".into()),
            ..Default::default()
        });
        let value = serde_json::to_value(&call).unwrap();
        assert_eq!(value["role"], "tool_call");
        assert_eq!(value["toolName"], "Task");
        assert_eq!(value["isStreaming"], false);
        assert_eq!(value["toolResult"]["isAsync"], true);
        assert_eq!(value["toolResult"]["outputFile"], "/tmp/a");
        assert!(value.get("compactTrigger").is_none());
    }

    #[test]
    fn test_meaningful_content() {
        assert!(!UiMessage::assistant("a", "  \n ", 1).has_meaningful_content());
        let mut thinking_only = UiMessage::assistant("a", "", 1);
        thinking_only.thinking = Some("hmm".into());
        assert!(thinking_only.has_meaningful_content());
        assert!(UiMessage::summary("s", "auto", Some(1000), 1).has_meaningful_content());
    }
}
