//! Widgets for the chat, diff and background agent views

pub mod agent_panel;
pub mod diff_view;
pub mod markdown;
pub mod message_list;
pub mod spinner;

pub use agent_panel::AgentPanel;
pub use diff_view::DiffView;
pub use message_list::MessageList;
pub use spinner::Spinner;
