//! Per-turn accumulator of streamed content blocks
//!
//! Blocks are keyed by their positional index. Indices may arrive sparse or
//! out of order, so every read walks the keys in ascending order rather than
//! relying on arrival order.

use crate::stream::{ContentBlock, Delta};
use std::collections::{BTreeMap, BTreeSet};

/// Identity of a streamed tool invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolMeta {
    pub id: String,
    pub name: String,
}

/// Mutable, partially built content of one assistant turn
#[derive(Debug, Default)]
pub struct StreamingBuffer {
    text: BTreeMap<usize, String>,
    thinking: BTreeMap<usize, String>,
    tool_input: BTreeMap<usize, String>,
    tool_meta: BTreeMap<usize, ToolMeta>,
    thinking_indices: BTreeSet<usize>,
    restored_text: String,
    restored_thinking: String,
    thinking_complete: bool,
}

impl StreamingBuffer {
    /// Create an empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Initialize storage for a new content block. A second start for the same
    /// index overwrites the first.
    pub fn start_block(&mut self, index: usize, block: &ContentBlock) {
        match block {
            ContentBlock::Text { text } => {
                self.text.insert(index, text.clone());
            }
            ContentBlock::ToolUse { id, name, .. } => {
                self.tool_meta.insert(
                    index,
                    ToolMeta {
                        id: id.clone(),
                        name: name.clone(),
                    },
                );
                self.tool_input.insert(index, String::new());
            }
            ContentBlock::Thinking { thinking } => {
                self.thinking.insert(index, thinking.clone());
                self.thinking_indices.insert(index);
            }
            ContentBlock::Unsupported => {
                tracing::trace!(index, "ignoring unsupported content block");
            }
        }
    }

    /// Append a delta to a block. Returns `true` if the visible content changed
    /// and the renderer should refresh.
    pub fn append_delta(&mut self, index: usize, delta: &Delta) -> bool {
        match delta {
            Delta::TextDelta { text } => {
                self.text.entry(index).or_default().push_str(text);
                true
            }
            // Tool inputs are not shown incrementally; parsed once the block stops
            Delta::InputJsonDelta { partial_json } => {
                self.tool_input
                    .entry(index)
                    .or_default()
                    .push_str(partial_json);
                false
            }
            Delta::ThinkingDelta { thinking } => {
                self.thinking.entry(index).or_default().push_str(thinking);
                true
            }
            Delta::Unknown => false,
        }
    }

    /// Close a block. Returns `true` when a thinking block finished, so the
    /// caller can flush the "thinking" indicator.
    pub fn stop_block(&mut self, index: usize) -> bool {
        if self.thinking_indices.contains(&index) {
            self.thinking_complete = true;
            return true;
        }
        false
    }

    /// Inject content streamed before this client attached to the turn.
    ///
    /// Must be called right after construction. Restored thinking is finished
    /// by definition.
    pub fn seed_from_restore(&mut self, text: impl Into<String>, thinking: Option<String>) {
        self.restored_text = text.into();
        if let Some(thinking) = thinking.filter(|t| !t.is_empty()) {
            self.restored_thinking = thinking;
            self.thinking_complete = true;
        }
    }

    /// Restore prefix followed by all text blocks in ascending index order
    pub fn all_text(&self) -> String {
        let mut out = self.restored_text.clone();
        for text in self.text.values() {
            out.push_str(text);
        }
        out
    }

    /// Restore prefix followed by all thinking blocks in ascending index order
    pub fn all_thinking(&self) -> String {
        let mut out = self.restored_thinking.clone();
        for thinking in self.thinking.values() {
            out.push_str(thinking);
        }
        out
    }

    /// Whether any thinking content exists (restored or streamed)
    pub fn has_thinking(&self) -> bool {
        !self.restored_thinking.is_empty() || !self.thinking_indices.is_empty()
    }

    pub fn thinking_complete(&self) -> bool {
        self.thinking_complete
    }

    pub fn tool_meta(&self, index: usize) -> Option<&ToolMeta> {
        self.tool_meta.get(&index)
    }

    /// Raw (possibly partial) JSON input of a tool block; `"{}"` if never written
    pub fn raw_tool_input(&self, index: usize) -> &str {
        match self.tool_input.get(&index) {
            Some(raw) if !raw.is_empty() => raw,
            _ => "{}",
        }
    }

    /// Parse the tool input, tolerating JSON that is still being streamed
    pub fn parsed_tool_input(&self, index: usize) -> Option<serde_json::Value> {
        match serde_json::from_str(self.raw_tool_input(index)) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::trace!(index, error = %e, "tool input not parseable yet");
                None
            }
        }
    }

    /// Indices of started tool blocks, ascending
    pub fn tool_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.tool_meta.keys().copied()
    }

    /// Clear all per-turn state
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
