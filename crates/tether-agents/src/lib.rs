//! tether-agents: Conversation assembly and background-agent tracking
//!
//! This crate turns a stream of session events into the message list the chat
//! view renders, and follows asynchronously running sub-agents by polling
//! their transcripts.

pub mod assembler;
pub mod conversation;
pub mod events;
pub mod poller;
pub mod source;
pub mod transcript;

pub use assembler::{PartialTurn, TurnAssembler};
pub use conversation::Conversation;
pub use events::PollerEvent;
pub use poller::{
    AgentStatus, BackgroundAgent, BackgroundAgentPoller, PollOutcome, PollerConfig, apply_poll,
};
pub use source::{FsTranscriptSource, TranscriptSource};
pub use transcript::{Activity, ActivityKind, ParsedTranscript, parse_transcript, summarize_tool_input};
