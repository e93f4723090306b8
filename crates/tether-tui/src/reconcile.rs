//! Display-only relationships derived from a finalized message list

use serde_json::Value;
use std::collections::HashSet;
use tether_core::{Role, UiMessage};

use crate::diff::{FileDiff, reconstruct};

/// Messages the chat view renders, in order.
///
/// A `tool_result` is hidden when its `tool_call` is in the list and already
/// carries the result; orphaned results stay visible.
pub fn visible_messages(messages: &[UiMessage]) -> Vec<&UiMessage> {
    let folded: HashSet<&str> = messages
        .iter()
        .filter(|m| m.role == Role::ToolCall && m.tool_result.is_some())
        .filter_map(UiMessage::tool_use_id)
        .collect();

    messages
        .iter()
        .filter(|m| {
            m.role != Role::ToolResult || !m.tool_use_id().is_some_and(|id| folded.contains(id))
        })
        .collect()
}

/// Whether `current` continues the agent's output from `previous`, so the
/// view can skip repeating the role header
pub fn is_continuation(previous: Option<&UiMessage>, current: &UiMessage) -> bool {
    previous.is_some_and(|prev| prev.role.is_agent_side()) && current.role.is_agent_side()
}

/// A user prompt and everything that follows it up to the next prompt
#[derive(Debug, Clone, Default)]
pub struct Turn<'a> {
    pub messages: Vec<&'a UiMessage>,
}

impl<'a> Turn<'a> {
    pub fn prompt(&self) -> Option<&'a UiMessage> {
        self.messages.first().copied().filter(|m| m.role == Role::User)
    }

    /// Whether the turn is still being streamed
    pub fn is_streaming(&self) -> bool {
        self.messages.iter().any(|m| m.is_streaming)
    }
}

/// Group visible messages into turns; each user message and each compaction
/// summary opens a new one
pub fn group_turns(messages: &[UiMessage]) -> Vec<Turn<'_>> {
    let mut turns: Vec<Turn<'_>> = Vec::new();
    for message in visible_messages(messages) {
        let opens_turn = matches!(message.role, Role::User | Role::Summary);
        match turns.last_mut() {
            Some(turn) if !opens_turn => turn.messages.push(message),
            _ => turns.push(Turn {
                messages: vec![message],
            }),
        }
    }
    turns
}

/// One string replacement recorded by a file-editing tool call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEdit {
    pub file_path: String,
    pub old: String,
    pub new: String,
}

impl FileEdit {
    /// Diff of this edit, anchored in `current` when given
    pub fn diff(&self, current: Option<&str>) -> FileDiff {
        reconstruct(&self.old, &self.new, current)
    }
}

/// Edits recorded by an `Edit`, `MultiEdit` or `Write` tool call
pub fn extract_edits(message: &UiMessage) -> Vec<FileEdit> {
    if message.role != Role::ToolCall {
        return Vec::new();
    }
    let (Some(name), Some(input)) = (message.tool_name.as_deref(), message.tool_input.as_ref())
    else {
        return Vec::new();
    };
    let Some(file_path) = str_field(input, "file_path") else {
        return Vec::new();
    };

    let edit = |old: &str, new: &str| FileEdit {
        file_path: file_path.to_string(),
        old: old.to_string(),
        new: new.to_string(),
    };

    match name {
        "Edit" => match (str_field(input, "old_string"), str_field(input, "new_string")) {
            (Some(old), Some(new)) => vec![edit(old, new)],
            _ => Vec::new(),
        },
        "MultiEdit" => input
            .get("edits")
            .and_then(Value::as_array)
            .map(|edits| {
                edits
                    .iter()
                    .filter_map(|e| Some(edit(str_field(e, "old_string")?, str_field(e, "new_string")?)))
                    .collect()
            })
            .unwrap_or_default(),
        "Write" => str_field(input, "content")
            .map(|content| vec![edit("", content)])
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}

fn str_field<'v>(value: &'v Value, key: &str) -> Option<&'v str> {
    value.get(key)?.as_str()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tether_core::ToolResultPayload;

    fn conversation() -> Vec<UiMessage> {
        let mut call = UiMessage::tool_call("t1", "Bash", json!({"command": "ls"}), 3);
        call.attach_tool_result(ToolResultPayload::text("Cargo.toml"));
        vec![
            UiMessage::user("u1", "list files", 1),
            UiMessage::assistant("a1", "Listing.", 2),
            call,
            UiMessage::tool_result("t1", Some("Bash".into()), ToolResultPayload::text("Cargo.toml"), 4),
            UiMessage::assistant("a2", "One file.", 5),
            UiMessage::user("u2", "thanks", 6),
            UiMessage::tool_result("orphan", None, ToolResultPayload::text("late"), 7),
        ]
    }

    #[test]
    fn test_folded_tool_results_hidden() {
        let messages = conversation();
        let visible: Vec<&str> = visible_messages(&messages)
            .iter()
            .map(|m| m.id.as_str())
            .collect();
        assert_eq!(visible, vec!["u1", "a1", "tool-t1", "a2", "u2", "result-orphan"]);
    }

    #[test]
    fn test_continuation() {
        let messages = conversation();
        let visible = visible_messages(&messages);
        let flags: Vec<bool> = visible
            .iter()
            .enumerate()
            .map(|(i, m)| is_continuation(i.checked_sub(1).map(|p| visible[p]), m))
            .collect();
        assert_eq!(flags, vec![false, false, true, true, false, false]);
    }

    #[test]
    fn test_group_turns() {
        let messages = conversation();
        let turns = group_turns(&messages);
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].messages.len(), 4);
        assert_eq!(turns[0].prompt().map(|m| m.id.as_str()), Some("u1"));
        assert_eq!(turns[1].messages.len(), 2);
        assert!(!turns[0].is_streaming());
    }

    #[test]
    fn test_summary_opens_turn() {
        let messages = vec![
            UiMessage::summary("s1", "manual", Some(1000), 1),
            UiMessage::assistant("a1", "continuing", 2),
        ];
        let turns = group_turns(&messages);
        assert_eq!(turns.len(), 1);
        assert!(turns[0].prompt().is_none());
    }

    #[test]
    fn test_extract_edit() {
        let msg = UiMessage::tool_call(
            "t1",
            "Edit",
            json!({"file_path": "/src/lib.rs", "old_string": "a", "new_string": "b"}),
            1,
        );
        assert_eq!(
            extract_edits(&msg),
            vec![FileEdit {
                file_path: "/src/lib.rs".into(),
                old: "a".into(),
                new: "b".into()
            }]
        );
    }

    #[test]
    fn test_extract_multi_edit_skips_incomplete_entries() {
        let msg = UiMessage::tool_call(
            "t1",
            "MultiEdit",
            json!({
                "file_path": "/a.rs",
                "edits": [
                    {"old_string": "x", "new_string": "y"},
                    {"old_string": "only old"},
                    {"old_string": "p", "new_string": "q"}
                ]
            }),
            1,
        );
        let edits = extract_edits(&msg);
        assert_eq!(edits.len(), 2);
        assert_eq!(edits[1].new, "q");
    }

    #[test]
    fn test_write_diffs_as_new_content() {
        let msg = UiMessage::tool_call(
            "t1",
            "Write",
            json!({"file_path": "/n.txt", "content": "one\ntwo\n"}),
            1,
        );
        let edits = extract_edits(&msg);
        assert_eq!(edits.len(), 1);

        // Already written: the whole file shows as added
        let diff = edits[0].diff(Some("one\ntwo\n"));
        assert_eq!(diff.added(), 2);
        assert_eq!(diff.removed(), 0);
    }

    #[test]
    fn test_non_edit_tools_have_no_edits() {
        let msg = UiMessage::tool_call("t1", "Bash", json!({"command": "ls"}), 1);
        assert!(extract_edits(&msg).is_empty());
        assert!(extract_edits(&UiMessage::user("u", "Edit", 1)).is_empty());
    }
}
