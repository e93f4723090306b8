//! Session store: one JSONL file per session
//!
//! A session file starts with a metadata entry followed by message entries.
//! Message entries with an id seen before replace the earlier message, so a
//! session can be appended to as messages evolve. A trailing partial entry
//! records the content of an assistant turn that was still streaming.

use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tether_agents::PartialTurn;
use tether_core::{Error, Result, UiMessage, now_millis};

/// Session entry types for JSONL format
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEntry {
    Metadata {
        id: String,
        created_at: i64,
        working_dir: String,
    },
    Message {
        message: UiMessage,
    },
    /// In-flight assistant turn content at save time
    Partial {
        #[serde(flatten)]
        turn: PartialTurn,
    },
}

/// A session read back from disk
#[derive(Debug, Clone, Default)]
pub struct LoadedSession {
    pub messages: Vec<UiMessage>,
    pub partial: Option<PartialTurn>,
}

/// Information about a saved session
#[derive(Debug, Clone)]
pub struct SessionInfo {
    pub id: String,
    pub created_at: i64,
    pub working_dir: String,
    pub message_count: usize,
}

impl SessionInfo {
    /// Format the created_at timestamp for display
    pub fn created_at_display(&self) -> String {
        use chrono::{TimeZone, Utc};
        Utc.timestamp_millis_opt(self.created_at)
            .single()
            .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "unknown".to_string())
    }
}

/// Directory of session files
#[derive(Debug, Clone)]
pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.jsonl"))
    }

    /// Write a new session and return its id
    pub fn create(&self, messages: &[UiMessage], partial: Option<&PartialTurn>) -> Result<String> {
        let id = uuid::Uuid::new_v4().to_string();
        fs::create_dir_all(&self.dir)?;

        let mut writer = BufWriter::new(File::create(self.path(&id))?);
        let metadata = SessionEntry::Metadata {
            id: id.clone(),
            created_at: now_millis(),
            working_dir: std::env::current_dir()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|_| ".".to_string()),
        };
        write_entry(&mut writer, &metadata)?;
        for message in messages {
            write_entry(
                &mut writer,
                &SessionEntry::Message {
                    message: message.clone(),
                },
            )?;
        }
        if let Some(turn) = partial {
            write_entry(&mut writer, &SessionEntry::Partial { turn: turn.clone() })?;
        }
        writer.flush()?;

        tracing::debug!(%id, messages = messages.len(), partial = partial.is_some(), "session saved");
        Ok(id)
    }

    /// Append entries to an existing session
    pub fn append(&self, id: &str, entries: &[SessionEntry]) -> Result<()> {
        let path = self.path(id);
        if !path.exists() {
            return Err(Error::SessionNotFound(id.to_string()));
        }
        let mut writer = BufWriter::new(File::options().append(true).open(path)?);
        for entry in entries {
            write_entry(&mut writer, entry)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Load a session's messages and any trailing partial turn.
    ///
    /// Undecodable lines are skipped with a warning.
    pub fn load(&self, id: &str) -> Result<LoadedSession> {
        let path = self.path(id);
        if !path.exists() {
            return Err(Error::SessionNotFound(id.to_string()));
        }

        let mut session = LoadedSession::default();
        for (idx, line) in BufReader::new(File::open(&path)?).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<SessionEntry>(&line) {
                Ok(SessionEntry::Metadata { .. }) => {}
                Ok(SessionEntry::Message { message }) => {
                    session.partial = None;
                    match session.messages.iter_mut().find(|m| m.id == message.id) {
                        Some(existing) => *existing = message,
                        None => session.messages.push(message),
                    }
                }
                Ok(SessionEntry::Partial { turn }) => session.partial = Some(turn),
                Err(e) => {
                    tracing::warn!(%id, line = idx + 1, error = %e, "skipping bad session entry");
                }
            }
        }
        Ok(session)
    }

    /// List all sessions, newest first
    pub fn list(&self) -> Result<Vec<SessionInfo>> {
        if !self.dir.exists() {
            return Ok(vec![]);
        }

        let mut sessions = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|s| s.to_str()) == Some("jsonl") {
                if let Some(info) = read_session_info(&path) {
                    sessions.push(info);
                }
            }
        }
        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(sessions)
    }
}

fn write_entry(writer: &mut impl Write, entry: &SessionEntry) -> Result<()> {
    serde_json::to_writer(&mut *writer, entry)?;
    writeln!(writer)?;
    Ok(())
}

fn read_session_info(path: &Path) -> Option<SessionInfo> {
    let mut lines = BufReader::new(File::open(path).ok()?).lines();
    let first_line = lines.next()?.ok()?;
    let SessionEntry::Metadata {
        id,
        created_at,
        working_dir,
    } = serde_json::from_str(&first_line).ok()?
    else {
        return None;
    };

    let mut ids: Vec<String> = Vec::new();
    for line in lines.map_while(std::result::Result::ok) {
        if let Ok(SessionEntry::Message { message }) = serde_json::from_str(&line) {
            if !ids.contains(&message.id) {
                ids.push(message.id);
            }
        }
    }

    Some(SessionInfo {
        id,
        created_at,
        working_dir,
        message_count: ids.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, SessionStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("sessions"));
        (dir, store)
    }

    #[test]
    fn test_create_and_load() {
        let (_dir, store) = store();
        let messages = vec![
            UiMessage::user("u1", "hello", 1),
            UiMessage::assistant("a1", "hi there", 2),
        ];
        let id = store.create(&messages, None).unwrap();

        let loaded = store.load(&id).unwrap();
        assert_eq!(loaded.messages, messages);
        assert!(loaded.partial.is_none());
    }

    #[test]
    fn test_trailing_partial_is_returned() {
        let (_dir, store) = store();
        let mut streaming = UiMessage::assistant_streaming("a1", 2);
        streaming.content = "Hel".into();
        let partial = PartialTurn {
            text: "Hello".into(),
            thinking: Some("plan".into()),
        };
        let id = store
            .create(&[UiMessage::user("u1", "hi", 1), streaming], Some(&partial))
            .unwrap();

        let loaded = store.load(&id).unwrap();
        assert_eq!(loaded.partial, Some(partial));
        assert!(loaded.messages[1].is_streaming);
    }

    #[test]
    fn test_later_message_replaces_and_clears_partial() {
        let (_dir, store) = store();
        let id = store
            .create(
                &[UiMessage::assistant_streaming("a1", 1)],
                Some(&PartialTurn {
                    text: "par".into(),
                    thinking: None,
                }),
            )
            .unwrap();
        store
            .append(
                &id,
                &[SessionEntry::Message {
                    message: UiMessage::assistant("a1", "partial done", 1),
                }],
            )
            .unwrap();

        let loaded = store.load(&id).unwrap();
        assert_eq!(loaded.messages.len(), 1);
        assert_eq!(loaded.messages[0].content, "partial done");
        assert!(loaded.partial.is_none());
    }

    #[test]
    fn test_missing_session() {
        let (_dir, store) = store();
        assert!(matches!(
            store.load("nope"),
            Err(Error::SessionNotFound(id)) if id == "nope"
        ));
    }

    #[test]
    fn test_list_sessions() {
        let (_dir, store) = store();
        assert!(store.list().unwrap().is_empty());

        let id = store
            .create(&[UiMessage::user("u1", "one", 1)], None)
            .unwrap();
        store
            .append(
                &id,
                &[SessionEntry::Message {
                    message: UiMessage::user("u1", "one (edited)", 1),
                }],
            )
            .unwrap();

        let sessions = store.list().unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].id, id);
        assert_eq!(sessions[0].message_count, 1);
    }
}
