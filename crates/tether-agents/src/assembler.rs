//! Turn assembly: session events in, ordered UI messages out
//!
//! The assembler owns the `StreamingBuffer` of the in-flight assistant turn
//! and keeps exactly one assistant message marked as streaming while deltas
//! are expected. Tool calls become their own messages once their input block
//! stops; tool results are folded back into the matching call.

use serde::{Deserialize, Serialize};
use tether_core::{
    ContentBlock, Role, SessionEvent, SessionEventStream, StreamingBuffer, ToolResultPayload,
    UiMessage,
};
use tokio_stream::StreamExt;

use crate::conversation::Conversation;

/// Content of an assistant turn that was cut off mid-stream
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartialTurn {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thinking: Option<String>,
}

/// Builds the message list of a session from its event stream
#[derive(Debug, Default)]
pub struct TurnAssembler {
    conversation: Conversation,
    buffer: StreamingBuffer,
    /// Id of the assistant message currently receiving deltas
    streaming_id: Option<String>,
}

impl TurnAssembler {
    /// Create an assembler for a new, empty session
    pub fn new() -> Self {
        Self::default()
    }

    /// Reattach to a persisted session.
    ///
    /// If the session was saved while an assistant turn was streaming, the
    /// turn's content is seeded into a fresh buffer so later deltas append to
    /// it. `partial` wins over whatever the streaming message itself holds.
    pub fn resume(messages: Vec<UiMessage>, partial: Option<PartialTurn>) -> Self {
        let mut conversation = Conversation::from_messages(messages);
        let streaming_id = conversation
            .messages()
            .iter()
            .rev()
            .find(|m| m.is_streaming && m.role == Role::Assistant)
            .map(|m| m.id.clone());
        conversation.settle_streaming(streaming_id.as_deref());

        let mut assembler = Self {
            conversation,
            buffer: StreamingBuffer::new(),
            streaming_id,
        };

        let seed = partial.or_else(|| {
            assembler.streaming_message().map(|m| PartialTurn {
                text: m.content.clone(),
                thinking: m.thinking.clone(),
            })
        });

        if let Some(seed) = seed {
            tracing::debug!(
                text_len = seed.text.len(),
                has_thinking = seed.thinking.is_some(),
                "resuming partially streamed turn"
            );
            assembler.buffer.seed_from_restore(seed.text, seed.thinking);
            assembler.ensure_streaming_message();
            assembler.refresh_streaming_message();
        }

        assembler
    }

    /// Get the conversation
    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Get all messages
    pub fn messages(&self) -> &[UiMessage] {
        self.conversation.messages()
    }

    pub fn into_messages(self) -> Vec<UiMessage> {
        self.conversation.into_messages()
    }

    /// The buffer of the in-flight turn
    pub fn buffer(&self) -> &StreamingBuffer {
        &self.buffer
    }

    /// The assistant message still receiving deltas
    pub fn streaming_message(&self) -> Option<&UiMessage> {
        self.streaming_id
            .as_deref()
            .and_then(|id| self.conversation.get(id))
    }

    pub fn is_streaming(&self) -> bool {
        self.streaming_id.is_some()
    }

    /// Snapshot of the in-flight turn for persisting a mid-stream session
    pub fn partial_turn(&self) -> Option<PartialTurn> {
        self.streaming_id.as_ref()?;
        let thinking = self.buffer.all_thinking();
        Some(PartialTurn {
            text: self.buffer.all_text(),
            thinking: (!thinking.is_empty()).then_some(thinking),
        })
    }

    /// Apply one event. Returns `true` if the visible message list changed.
    pub fn apply(&mut self, event: &SessionEvent) -> bool {
        match event {
            SessionEvent::MessageStart => {
                let changed = self.finish_turn();
                self.buffer.reset();
                changed
            }
            SessionEvent::ContentBlockStart {
                index,
                content_block,
            } => {
                self.buffer.start_block(*index, content_block);
                match content_block {
                    ContentBlock::Text { .. } | ContentBlock::Thinking { .. } => {
                        self.ensure_streaming_message();
                        self.refresh_streaming_message();
                        true
                    }
                    _ => false,
                }
            }
            SessionEvent::ContentBlockDelta { index, delta } => {
                if !self.buffer.append_delta(*index, delta) {
                    return false;
                }
                self.ensure_streaming_message();
                self.refresh_streaming_message();
                true
            }
            SessionEvent::ContentBlockStop { index } => {
                if self.buffer.stop_block(*index) {
                    self.refresh_streaming_message();
                    return true;
                }
                self.emit_tool_call(*index)
            }
            SessionEvent::MessageStop => {
                let changed = self.finish_turn();
                self.buffer.reset();
                changed
            }
            SessionEvent::User { text } => {
                self.finish_turn();
                self.buffer.reset();
                let ts = self.conversation.next_timestamp();
                self.conversation
                    .push(UiMessage::user(new_id("user"), text.clone(), ts));
                true
            }
            SessionEvent::ToolResult {
                tool_use_id,
                result,
            } => self.apply_tool_result(tool_use_id, result),
            SessionEvent::CompactBoundary {
                trigger,
                pre_tokens,
            } => {
                let ts = self.conversation.next_timestamp();
                self.conversation.push(UiMessage::summary(
                    new_id("summary"),
                    trigger.clone(),
                    *pre_tokens,
                    ts,
                ));
                true
            }
            SessionEvent::System { text } => {
                let ts = self.conversation.next_timestamp();
                self.conversation
                    .push(UiMessage::system(new_id("system"), text.clone(), ts));
                true
            }
        }
    }

    /// Drain an event stream, calling `on_change` after every visible change
    pub async fn consume<F>(&mut self, mut stream: SessionEventStream, mut on_change: F)
    where
        F: FnMut(&Conversation),
    {
        while let Some(event) = stream.next().await {
            if self.apply(&event) {
                on_change(&self.conversation);
            }
        }
    }

    fn ensure_streaming_message(&mut self) {
        if self.streaming_id.is_some() {
            return;
        }
        let id = new_id("assistant");
        let ts = self.conversation.next_timestamp();
        self.conversation.settle_streaming(None);
        self.conversation
            .push(UiMessage::assistant_streaming(id.clone(), ts));
        self.streaming_id = Some(id);
    }

    fn refresh_streaming_message(&mut self) {
        let Some(id) = self.streaming_id.as_deref() else {
            return;
        };
        let Some(message) = self.conversation.get_mut(id) else {
            return;
        };
        message.content = self.buffer.all_text();
        message.thinking = self
            .buffer
            .has_thinking()
            .then(|| self.buffer.all_thinking());
        message.thinking_complete = self.buffer.thinking_complete();
    }

    /// Turn a finished tool-use block into a `tool_call` message
    fn emit_tool_call(&mut self, index: usize) -> bool {
        let Some(meta) = self.buffer.tool_meta(index).cloned() else {
            return false;
        };
        let call_id = format!("{}{}", tether_core::TOOL_CALL_ID_PREFIX, meta.id);
        if self.conversation.contains(&call_id) {
            tracing::debug!(tool_use_id = %meta.id, "tool call already recorded");
            return false;
        }
        let input = self.buffer.parsed_tool_input(index).unwrap_or_else(|| {
            tracing::debug!(
                tool_use_id = %meta.id,
                raw = self.buffer.raw_tool_input(index),
                "tool input is not valid JSON, recording empty input"
            );
            serde_json::json!({})
        });
        let ts = self.conversation.next_timestamp();
        self.conversation
            .push(UiMessage::tool_call(&meta.id, meta.name, input, ts));
        true
    }

    fn apply_tool_result(&mut self, tool_use_id: &str, result: &ToolResultPayload) -> bool {
        let result_id = format!("{}{}", tether_core::TOOL_RESULT_ID_PREFIX, tool_use_id);
        if self.conversation.contains(&result_id) {
            tracing::debug!(tool_use_id, "duplicate tool result ignored");
            return false;
        }

        let tool_name = match self.conversation.tool_call_mut(tool_use_id) {
            Some(call) => {
                call.attach_tool_result(result.clone());
                call.tool_name.clone()
            }
            None => {
                tracing::debug!(tool_use_id, "tool result without a matching call");
                None
            }
        };

        let ts = self.conversation.next_timestamp();
        self.conversation.push(UiMessage::tool_result(
            tool_use_id,
            tool_name,
            result.clone(),
            ts,
        ));
        true
    }

    /// Finalize the streaming message, dropping it if it never got content
    fn finish_turn(&mut self) -> bool {
        let Some(id) = self.streaming_id.take() else {
            return false;
        };
        let keep = match self.conversation.get_mut(&id) {
            Some(message) => {
                message.is_streaming = false;
                if message.thinking.is_some() {
                    message.thinking_complete = true;
                }
                message.has_meaningful_content()
            }
            None => return false,
        };
        if !keep {
            self.conversation.remove(&id);
        }
        tracing::debug!(message_id = %id, kept = keep, "assistant turn finished");
        true
    }
}

fn new_id(kind: &str) -> String {
    format!("{}-{}", kind, uuid::Uuid::new_v4())
}
