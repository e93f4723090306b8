//! `tether resume` - reconstruct a saved session, including a partial turn

use super::{conversation_text, print_lines};
use crate::session::SessionStore;
use tether_agents::TurnAssembler;

pub struct ResumeCommand;

impl ResumeCommand {
    pub fn execute(id: &str, store: &SessionStore) -> anyhow::Result<()> {
        let assembler = Self::restore(id, store)?;
        println!("Session {id} ({} messages)", assembler.messages().len());
        println!();
        print_lines(&conversation_text(assembler.messages()));

        if let Some(partial) = assembler.partial_turn() {
            println!();
            println!(
                "[turn interrupted: {} chars of text{} restored]",
                partial.text.chars().count(),
                if partial.thinking.is_some() {
                    " and thinking"
                } else {
                    ""
                }
            );
        }
        Ok(())
    }

    pub fn restore(id: &str, store: &SessionStore) -> anyhow::Result<TurnAssembler> {
        let session = store.load(id)?;
        Ok(TurnAssembler::resume(session.messages, session.partial))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tether_agents::PartialTurn;
    use tether_core::{Delta, SessionEvent, UiMessage};

    #[test]
    fn test_restored_turn_accepts_more_deltas() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path());
        let mut streaming = UiMessage::assistant_streaming("a1", 2);
        streaming.content = "Hel".into();
        let id = store
            .create(
                &[UiMessage::user("u1", "hi", 1), streaming],
                Some(&PartialTurn {
                    text: "Hel".into(),
                    thinking: None,
                }),
            )
            .unwrap();

        let mut assembler = ResumeCommand::restore(&id, &store).unwrap();
        assert!(assembler.is_streaming());

        assembler.apply(&SessionEvent::ContentBlockStart {
            index: 0,
            content_block: tether_core::ContentBlock::text(""),
        });
        assembler.apply(&SessionEvent::ContentBlockDelta {
            index: 0,
            delta: Delta::text("lo"),
        });
        assert_eq!(assembler.streaming_message().unwrap().content, "Hello");
    }

    #[test]
    fn test_unknown_session_errors() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path());
        let err = ResumeCommand::restore("missing", &store).unwrap_err();
        assert!(err.to_string().contains("Session not found"));
    }
}
