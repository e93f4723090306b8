//! `tether diff` - print a reconstructed edit diff

use super::{plain_lines, print_lines};
use crate::session::SessionStore;
use anyhow::{Context, bail};
use std::path::{Path, PathBuf};
use tether_core::{TOOL_CALL_ID_PREFIX, UiMessage};
use tether_tui::reconcile::{FileEdit, extract_edits};
use tether_tui::widgets::DiffView;
use tether_tui::{FileDiff, Theme};

/// What to diff
#[derive(Debug, Clone)]
pub enum DiffTarget {
    /// An explicit replacement in a file
    Edit {
        file: PathBuf,
        old: String,
        new: String,
    },
    /// The edits recorded by a tool call in a saved session
    Message { session: String, message: String },
}

pub struct DiffCommand;

impl DiffCommand {
    pub async fn execute(
        target: DiffTarget,
        store: &SessionStore,
        context_lines: usize,
    ) -> anyhow::Result<()> {
        let edits = match target {
            DiffTarget::Edit { file, old, new } => vec![FileEdit {
                file_path: file.display().to_string(),
                old,
                new,
            }],
            DiffTarget::Message { session, message } => {
                let loaded = store.load(&session)?;
                let msg = find_message(&loaded.messages, &message)
                    .with_context(|| format!("no message {message} in session {session}"))?;
                let edits = extract_edits(msg);
                if edits.is_empty() {
                    bail!("message {message} is not a file edit");
                }
                edits
            }
        };

        for (i, edit) in edits.iter().enumerate() {
            if i > 0 {
                println!();
            }
            let diff = Self::diff_against_disk(edit).await;
            print_lines(&render(&diff, &edit.file_path, context_lines));
        }
        Ok(())
    }

    /// Diff an edit against the file's current content, if it can be read
    pub async fn diff_against_disk(edit: &FileEdit) -> FileDiff {
        let current = match tokio::fs::read_to_string(Path::new(&edit.file_path)).await {
            Ok(content) => Some(content),
            Err(e) => {
                tracing::debug!(path = %edit.file_path, error = %e, "diffing without file content");
                None
            }
        };
        edit.diff(current.as_deref())
    }
}

/// Look a tool call up by message id or by its bare tool-use id
fn find_message<'a>(messages: &'a [UiMessage], id: &str) -> Option<&'a UiMessage> {
    let prefixed = format!("{TOOL_CALL_ID_PREFIX}{id}");
    messages
        .iter()
        .find(|m| m.id == id)
        .or_else(|| messages.iter().find(|m| m.id == prefixed))
}

fn render(diff: &FileDiff, path: &str, context_lines: usize) -> Vec<String> {
    let theme = Theme::default();
    plain_lines(
        &DiffView::new(diff, &theme)
            .file_path(path)
            .context(context_lines)
            .lines(),
    )
}
