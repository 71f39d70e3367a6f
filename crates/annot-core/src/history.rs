use std::collections::VecDeque;

/// Linear, bounded undo/redo stack.
///
/// Entries before `cursor` can be undone, entries from `cursor` on can be
/// redone. Pushing discards the redo tail; exceeding `limit` drops the
/// oldest entry.
#[derive(Clone, Debug)]
pub struct History<T> {
    entries: VecDeque<T>,
    cursor: usize,
    limit: usize,
}

impl<T> History<T> {
    pub fn new(limit: usize) -> Self {
        Self { entries: VecDeque::new(), cursor: 0, limit: limit.max(1) }
    }

    pub fn push(&mut self, entry: T) {
        self.entries.truncate(self.cursor);
        self.entries.push_back(entry);

        while self.entries.len() > self.limit {
            self.entries.pop_front();
        }
        self.cursor = self.entries.len();
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor < self.entries.len()
    }

    /// Steps back and returns the entry to revert.
    pub fn undo(&mut self) -> Option<&T> {
        if !self.can_undo() {
            return None;
        }
        self.cursor -= 1;
        self.entries.get(self.cursor)
    }

    /// Steps forward and returns the entry to reapply.
    pub fn redo(&mut self) -> Option<&T> {
        if !self.can_redo() {
            return None;
        }
        self.cursor += 1;
        self.entries.get(self.cursor - 1)
    }

    pub fn undo_depth(&self) -> usize {
        self.cursor
    }

    pub fn redo_depth(&self) -> usize {
        self.entries.len() - self.cursor
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
