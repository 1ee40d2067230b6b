//! Linear undo/redo history of canvas snapshots.

use crate::elements::Element;

/// Snapshot history with a pointer at the current entry.
///
/// There is always at least one entry (the empty canvas after construction),
/// and the pointer stays within `0..len`. Committing truncates everything
/// after the pointer, so a new edit after an undo drops the redo branch.
#[derive(Debug, Clone)]
pub struct History {
    entries: Vec<Vec<Element>>,
    pointer: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

impl History {
    pub fn new() -> Self {
        Self::with_snapshot(Vec::new())
    }

    pub fn with_snapshot(snapshot: Vec<Element>) -> Self {
        Self {
            entries: vec![snapshot],
            pointer: 0,
        }
    }

    /// Replace the whole history with a single entry.
    pub fn reset(&mut self, snapshot: Vec<Element>) {
        self.entries.clear();
        self.entries.push(snapshot);
        self.pointer = 0;
    }

    /// Record a finalized canvas state.
    pub fn commit(&mut self, snapshot: Vec<Element>) {
        self.entries.truncate(self.pointer + 1);
        self.entries.push(snapshot);
        self.pointer = self.entries.len() - 1;
        log::debug!("History commit, {} entries", self.entries.len());
    }

    /// Step back one entry. Returns the snapshot to restore, or None at the
    /// oldest entry.
    pub fn undo(&mut self) -> Option<&[Element]> {
        if self.pointer == 0 {
            return None;
        }
        self.pointer -= 1;
        Some(&self.entries[self.pointer])
    }

    /// Step forward one entry. Returns the snapshot to restore, or None at the
    /// newest entry.
    pub fn redo(&mut self) -> Option<&[Element]> {
        if self.pointer + 1 >= self.entries.len() {
            return None;
        }
        self.pointer += 1;
        Some(&self.entries[self.pointer])
    }

    pub fn can_undo(&self) -> bool {
        self.pointer > 0
    }

    pub fn can_redo(&self) -> bool {
        self.pointer + 1 < self.entries.len()
    }

    pub fn current(&self) -> &[Element] {
        &self.entries[self.pointer]
    }

    pub fn pointer(&self) -> usize {
        self.pointer
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
