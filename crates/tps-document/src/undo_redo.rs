//! Snapshot-based undo/redo history.
//!
//! [`UndoRedo`] holds a mutable *scratch* value plus a committed *head*.
//! Editing happens on the scratch copy; [`UndoRedo::commit_scratch`] turns
//! it into a new head and pushes the previous head onto the undo stack.
//! Undo and redo move whole snapshots between the stacks, so `T` should be
//! cheap to clone (share large members through `Arc`).

use std::time::SystemTime;

use tracing::{debug, trace};

/// One committed snapshot and what produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct UndoRedoEntry<T> {
    message: String,
    time: SystemTime,
    value: T,
}

impl<T> UndoRedoEntry<T> {
    fn new(message: impl Into<String>, value: T) -> Self {
        Self {
            message: message.into(),
            time: SystemTime::now(),
            value,
        }
    }

    /// Describes the edit that produced this snapshot.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// When the snapshot was committed.
    pub fn time(&self) -> SystemTime {
        self.time
    }

    pub fn value(&self) -> &T {
        &self.value
    }
}

/// A value with linear undo/redo history.
///
/// After any commit, undo, redo or rollback the scratch value equals the head.
#[derive(Debug, Clone)]
pub struct UndoRedo<T: Clone> {
    scratch: T,
    head: UndoRedoEntry<T>,
    // most recent entry last
    undo: Vec<UndoRedoEntry<T>>,
    redo: Vec<UndoRedoEntry<T>>,
    max_undo_entries: Option<usize>,
}

impl<T: Clone + Default> Default for UndoRedo<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Clone> UndoRedo<T> {
    /// Start a history whose only snapshot is `initial`.
    pub fn new(initial: T) -> Self {
        Self {
            scratch: initial.clone(),
            head: UndoRedoEntry::new("created document", initial),
            undo: Vec::new(),
            redo: Vec::new(),
            max_undo_entries: None,
        }
    }

    /// Keep at most `max` undo entries, dropping the oldest first.
    pub fn with_max_undo_entries(mut self, max: usize) -> Self {
        self.max_undo_entries = Some(max);
        self.enforce_history_limit();
        self
    }

    pub fn max_undo_entries(&self) -> Option<usize> {
        self.max_undo_entries
    }

    /// The working copy, including uncommitted edits.
    pub fn scratch(&self) -> &T {
        &self.scratch
    }

    /// Mutable access to the working copy. Nothing is recorded until
    /// [`commit_scratch`](Self::commit_scratch) is called.
    pub fn upd_scratch(&mut self) -> &mut T {
        &mut self.scratch
    }

    /// The most recently committed snapshot.
    pub fn head(&self) -> &UndoRedoEntry<T> {
        &self.head
    }

    /// Record the scratch value as the new head.
    ///
    /// Clears the redo stack.
    pub fn commit_scratch(&mut self, message: impl Into<String>) {
        let entry = UndoRedoEntry::new(message, self.scratch.clone());
        let previous = std::mem::replace(&mut self.head, entry);
        self.undo.push(previous);
        self.redo.clear();
        self.enforce_history_limit();

        debug!(
            target: "tps_document::undo_redo",
            message = self.head.message(),
            undo_depth = self.undo.len(),
            "committed"
        );
    }

    /// Discard uncommitted edits.
    pub fn rollback(&mut self) {
        self.scratch = self.head.value.clone();
        trace!(target: "tps_document::undo_redo", "rolled back scratch");
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    /// Step back one snapshot. No-op when there is nothing to undo.
    ///
    /// Uncommitted scratch edits are discarded.
    pub fn undo(&mut self) {
        let Some(entry) = self.undo.pop() else {
            return;
        };
        let undone = std::mem::replace(&mut self.head, entry);
        debug!(target: "tps_document::undo_redo", message = undone.message(), "undo");
        self.redo.push(undone);
        self.scratch = self.head.value.clone();
    }

    /// Step forward one snapshot. No-op when there is nothing to redo.
    ///
    /// Uncommitted scratch edits are discarded.
    pub fn redo(&mut self) {
        let Some(entry) = self.redo.pop() else {
            return;
        };
        let previous = std::mem::replace(&mut self.head, entry);
        self.undo.push(previous);
        debug!(target: "tps_document::undo_redo", message = self.head.message(), "redo");
        self.scratch = self.head.value.clone();
    }

    /// Undo until the entry at `index` in [`undo_entries`](Self::undo_entries)
    /// becomes the head. Out-of-range indices are ignored.
    pub fn undo_to(&mut self, index: usize) {
        if index >= self.undo.len() {
            return;
        }
        for _ in 0..=index {
            self.undo();
        }
    }

    /// Redo until the entry at `index` in [`redo_entries`](Self::redo_entries)
    /// becomes the head. Out-of-range indices are ignored.
    pub fn redo_to(&mut self, index: usize) {
        if index >= self.redo.len() {
            return;
        }
        for _ in 0..=index {
            self.redo();
        }
    }

    pub fn num_undo_entries(&self) -> usize {
        self.undo.len()
    }

    pub fn num_redo_entries(&self) -> usize {
        self.redo.len()
    }

    /// Undoable snapshots, most recent first.
    pub fn undo_entries(&self) -> impl Iterator<Item = &UndoRedoEntry<T>> + '_ {
        self.undo.iter().rev()
    }

    /// Redoable snapshots, next redo first.
    pub fn redo_entries(&self) -> impl Iterator<Item = &UndoRedoEntry<T>> + '_ {
        self.redo.iter().rev()
    }

    fn enforce_history_limit(&mut self) {
        if let Some(max) = self.max_undo_entries
            && self.undo.len() > max
        {
            let excess = self.undo.len() - max;
            self.undo.drain(..excess);
            trace!(target: "tps_document::undo_redo", dropped = excess, "trimmed history");
        }
    }
}
