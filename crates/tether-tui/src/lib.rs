//! tether-tui: Chat view reconciliation, diff reconstruction and widgets
//!
//! Everything here derives display state from a finalized message list; the
//! widgets render with ratatui and never own conversation state.

pub mod diff;
pub mod reconcile;
pub mod theme;
pub mod widgets;

pub use diff::{DiffLine, DiffMode, DiffRow, FileDiff, LineKind, WordSegment, collapse, reconstruct};
pub use reconcile::{FileEdit, Turn, extract_edits, group_turns, is_continuation, visible_messages};
pub use theme::Theme;
