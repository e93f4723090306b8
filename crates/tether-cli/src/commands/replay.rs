//! `tether replay` - feed a recorded event stream through the assembler

use super::{ResumeCommand, conversation_text, print_lines};
use crate::session::{SessionEntry, SessionStore};
use anyhow::Context;
use std::path::Path;
use tether_agents::TurnAssembler;
use tether_core::{SessionEvent, parse_event_log};

pub struct ReplayCommand;

impl ReplayCommand {
    /// Replay `path`, optionally onto an existing session (`into`)
    pub async fn execute(
        path: &Path,
        stop_after: Option<usize>,
        save: bool,
        into: Option<&str>,
        store: &SessionStore,
    ) -> anyhow::Result<()> {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading {}", path.display()))?;
        let mut events = parse_event_log(&content)?;
        if let Some(limit) = stop_after {
            events.truncate(limit);
        }

        let total = events.len();
        let start = match into {
            Some(id) => ResumeCommand::restore(id, store)?,
            None => TurnAssembler::new(),
        };
        let (assembler, updates) = Self::replay(start, events).await;
        tracing::debug!(events = total, updates, "replay finished");

        print_lines(&conversation_text(assembler.messages()));

        if assembler.is_streaming() {
            println!();
            println!("[stream ended mid-turn]");
        }

        if let Some(id) = into {
            let mut entries: Vec<SessionEntry> = assembler
                .messages()
                .iter()
                .map(|m| SessionEntry::Message { message: m.clone() })
                .collect();
            if let Some(turn) = assembler.partial_turn() {
                entries.push(SessionEntry::Partial { turn });
            }
            store.append(id, &entries)?;
            println!();
            println!("Updated session {id}");
        } else if save {
            let partial = assembler.partial_turn();
            let id = store.create(assembler.messages(), partial.as_ref())?;
            println!();
            println!("Saved session {id}");
            println!("Resume with: tether resume {id}");
        }
        Ok(())
    }

    /// Apply `events` to `assembler`, returning it and the number of visible updates
    pub async fn replay(
        mut assembler: TurnAssembler,
        events: Vec<SessionEvent>,
    ) -> (TurnAssembler, usize) {
        let mut updates = 0;
        assembler
            .consume(Box::pin(tokio_stream::iter(events)), |_| updates += 1)
            .await;
        (assembler, updates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tether_core::Role;

    const RECORDED: &str = r#"
{"type":"user","text":"list files"}
{"type":"message_start"}
{"type":"content_block_start","index":0,"content_block":{"type":"text","text":""}}
{"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"Hel"}}
{"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"lo"}}
{"type":"content_block_stop","index":0}
{"type":"content_block_start","index":1,"content_block":{"type":"tool_use","id":"t1","name":"Bash"}}
{"type":"content_block_delta","index":1,"delta":{"type":"input_json_delta","partial_json":"{\"cmd\":"}}
{"type":"content_block_delta","index":1,"delta":{"type":"input_json_delta","partial_json":"\"ls\"}"}}
{"type":"content_block_stop","index":1}
{"type":"message_stop"}
{"type":"tool_result","tool_use_id":"t1","content":"Cargo.toml"}
"#;

    #[tokio::test]
    async fn test_replay_recorded_turn() {
        let events = parse_event_log(RECORDED).unwrap();
        let (assembler, updates) = ReplayCommand::replay(TurnAssembler::new(), events).await;
        assert!(updates > 0);
        assert!(!assembler.is_streaming());

        let roles: Vec<Role> = assembler.messages().iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![Role::User, Role::Assistant, Role::ToolCall, Role::ToolResult]
        );
        assert_eq!(assembler.messages()[1].content, "Hello");
        let call = &assembler.messages()[2];
        assert_eq!(call.tool_input_str("cmd"), Some("ls"));
        assert_eq!(
            call.tool_result.as_ref().map(|r| r.content.as_str()),
            Some("Cargo.toml")
        );

        let text = conversation_text(assembler.messages());
        assert!(text.contains(&"  ⚙ Bash".to_string()));
    }

    #[tokio::test]
    async fn test_interrupted_replay_saves_partial() {
        let mut events = parse_event_log(RECORDED).unwrap();
        events.truncate(4);
        let (assembler, _) = ReplayCommand::replay(TurnAssembler::new(), events).await;
        assert!(assembler.is_streaming());

        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path());
        let id = store
            .create(assembler.messages(), assembler.partial_turn().as_ref())
            .unwrap();
        let loaded = store.load(&id).unwrap();
        assert_eq!(loaded.partial.map(|p| p.text), Some("Hel".to_string()));
    }

    #[tokio::test]
    async fn test_replay_into_saved_session() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path());
        let events = parse_event_log(RECORDED).unwrap();

        let (first, _) = ReplayCommand::replay(TurnAssembler::new(), events[..4].to_vec()).await;
        let id = store
            .create(first.messages(), first.partial_turn().as_ref())
            .unwrap();

        let events_file = dir.path().join("rest.jsonl");
        let rest: Vec<String> = RECORDED
            .lines()
            .filter(|l| !l.trim().is_empty())
            .skip(4)
            .map(str::to_string)
            .collect();
        std::fs::write(&events_file, rest.join("\n")).unwrap();

        ReplayCommand::execute(&events_file, None, false, Some(&id), &store)
            .await
            .unwrap();

        let loaded = store.load(&id).unwrap();
        assert!(loaded.partial.is_none());
        assert_eq!(loaded.messages.len(), 4);
        assert_eq!(loaded.messages[1].content, "Hello");
        assert!(!loaded.messages[1].is_streaming);
    }
}
