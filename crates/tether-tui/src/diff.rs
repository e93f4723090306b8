//! Diff reconstruction for edit tool calls
//!
//! An edit is recorded as an `(old, new)` string pair. When the current file
//! content is known the pair is placed back into the file so the diff shows
//! real line numbers and surrounding context. Only the first occurrence of a
//! string is considered, so edits of non-unique snippets may be anchored at
//! the wrong place.

use similar::{Algorithm, ChangeTag, TextDiff};
use std::collections::HashSet;

/// Lines kept on each side of a change when collapsing unchanged runs
pub const DEFAULT_CONTEXT_LINES: usize = 3;

/// How the diff was anchored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffMode {
    /// The edit is already in the file; pre-edit content was reconstructed
    Applied,
    /// The edit has not been applied yet; post-edit content was synthesized
    Pending,
    /// No anchor in the file; the bare strings are diffed
    Fragment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Context,
    Added,
    Removed,
}

/// Part of a changed line, flagged when it differs from its paired line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordSegment {
    pub text: String,
    pub changed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffLine {
    pub kind: LineKind,
    /// 1-based line number on the old side
    pub old_line: Option<usize>,
    /// 1-based line number on the new side
    pub new_line: Option<usize>,
    pub text: String,
    /// Word-level highlighting, present for paired removed/added lines
    pub segments: Option<Vec<WordSegment>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDiff {
    pub mode: DiffMode,
    pub lines: Vec<DiffLine>,
}

impl FileDiff {
    pub fn added(&self) -> usize {
        self.count(LineKind::Added)
    }

    pub fn removed(&self) -> usize {
        self.count(LineKind::Removed)
    }

    pub fn has_changes(&self) -> bool {
        self.lines.iter().any(|l| l.kind != LineKind::Context)
    }

    fn count(&self, kind: LineKind) -> usize {
        self.lines.iter().filter(|l| l.kind == kind).count()
    }
}

/// Reconstruct the diff of an edit, anchoring it in `current` when possible
pub fn reconstruct(old: &str, new: &str, current: Option<&str>) -> FileDiff {
    if let Some(current) = current {
        if !new.is_empty() && current.contains(new) {
            let before = current.replacen(new, old, 1);
            return FileDiff {
                mode: DiffMode::Applied,
                lines: diff_lines(&before, current),
            };
        }
        if !old.is_empty() && current.contains(old) {
            let after = current.replacen(old, new, 1);
            return FileDiff {
                mode: DiffMode::Pending,
                lines: diff_lines(current, &after),
            };
        }
        tracing::trace!("edit not found in current content, showing fragment diff");
    }
    FileDiff {
        mode: DiffMode::Fragment,
        lines: diff_lines(old, new),
    }
}

/// Split into lines after dropping a single trailing newline
fn split_lines(text: &str) -> Vec<&str> {
    let text = text.strip_suffix('\n').unwrap_or(text);
    if text.is_empty() {
        return Vec::new();
    }
    text.split('\n').collect()
}

/// Line-level Myers diff with word-level highlighting of replaced lines
pub fn diff_lines(before: &str, after: &str) -> Vec<DiffLine> {
    let old_lines = split_lines(before);
    let new_lines = split_lines(after);
    let diff = TextDiff::configure()
        .algorithm(Algorithm::Myers)
        .diff_slices(old_lines.as_slice(), new_lines.as_slice());

    let mut lines: Vec<DiffLine> = diff
        .iter_all_changes()
        .map(|change| {
            let kind = match change.tag() {
                ChangeTag::Equal => LineKind::Context,
                ChangeTag::Delete => LineKind::Removed,
                ChangeTag::Insert => LineKind::Added,
            };
            DiffLine {
                kind,
                old_line: change.old_index().map(|i| i + 1),
                new_line: change.new_index().map(|i| i + 1),
                text: change.value().to_string(),
                segments: None,
            }
        })
        .collect();

    highlight_words(&mut lines);
    lines
}

/// Pair each removed run with the added run right after it, by position
fn highlight_words(lines: &mut [DiffLine]) {
    let mut i = 0;
    while i < lines.len() {
        if lines[i].kind != LineKind::Removed {
            i += 1;
            continue;
        }
        let removed_start = i;
        while i < lines.len() && lines[i].kind == LineKind::Removed {
            i += 1;
        }
        let added_start = i;
        while i < lines.len() && lines[i].kind == LineKind::Added {
            i += 1;
        }
        let removed = added_start - removed_start;
        let added = i - added_start;

        for offset in 0..removed.min(added) {
            let (old_segments, new_segments) = word_diff(
                &lines[removed_start + offset].text,
                &lines[added_start + offset].text,
            );
            lines[removed_start + offset].segments = Some(old_segments);
            lines[added_start + offset].segments = Some(new_segments);
        }
    }
}

fn word_diff(old: &str, new: &str) -> (Vec<WordSegment>, Vec<WordSegment>) {
    let diff = TextDiff::from_words(old, new);
    let mut old_segments: Vec<WordSegment> = Vec::new();
    let mut new_segments: Vec<WordSegment> = Vec::new();

    for change in diff.iter_all_changes() {
        let value = change.value();
        match change.tag() {
            ChangeTag::Equal => {
                push_segment(&mut old_segments, value, false);
                push_segment(&mut new_segments, value, false);
            }
            ChangeTag::Delete => push_segment(&mut old_segments, value, true),
            ChangeTag::Insert => push_segment(&mut new_segments, value, true),
        }
    }
    (old_segments, new_segments)
}

/// Append, merging with the previous segment when the flag matches
fn push_segment(segments: &mut Vec<WordSegment>, text: &str, changed: bool) {
    match segments.last_mut() {
        Some(last) if last.changed == changed => last.text.push_str(text),
        _ => segments.push(WordSegment {
            text: text.to_string(),
            changed,
        }),
    }
}

/// A row of a collapsed diff view
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffRow<'a> {
    Line(&'a DiffLine),
    /// Placeholder for `hidden` unchanged lines starting at index `start`
    Collapsed { start: usize, hidden: usize },
}

/// Collapse long unchanged runs, keeping `context` lines next to each change.
///
/// Placeholders are identified by the index of their first hidden line;
/// runs whose placeholder start is in `expanded` are shown in full. A run is
/// only collapsed when at least two lines would be hidden.
pub fn collapse<'a>(
    lines: &'a [DiffLine],
    context: usize,
    expanded: &HashSet<usize>,
) -> Vec<DiffRow<'a>> {
    let mut rows = Vec::with_capacity(lines.len());
    let mut i = 0;

    while i < lines.len() {
        if lines[i].kind != LineKind::Context {
            rows.push(DiffRow::Line(&lines[i]));
            i += 1;
            continue;
        }

        let start = i;
        while i < lines.len() && lines[i].kind == LineKind::Context {
            i += 1;
        }
        let end = i;

        let head = if start == 0 { 0 } else { context };
        let tail = if end == lines.len() { 0 } else { context };
        let hidden = (end - start).saturating_sub(head + tail);
        let hidden_start = start + head;

        if hidden < 2 || expanded.contains(&hidden_start) {
            rows.extend(lines[start..end].iter().map(DiffRow::Line));
            continue;
        }

        rows.extend(lines[start..hidden_start].iter().map(DiffRow::Line));
        rows.push(DiffRow::Collapsed {
            start: hidden_start,
            hidden,
        });
        rows.extend(lines[hidden_start + hidden..end].iter().map(DiffRow::Line));
    }
    rows
}
