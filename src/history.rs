//! Undo/redo command log.
//!
//! Every committed mutation is recorded as a [`Command`] that knows how to undo
//! and redo itself against a [`Catalog`]. The log is strictly LIFO: pushing a new
//! command clears the redo stack, and nothing is coalesced or persisted.

use thiserror::Error;

use crate::catalog::Catalog;
use crate::types::{
    EntryValues,
    KeyPath,
    RequestId,
};

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryError {
    #[error("Nothing to undo")]
    NothingToUndo,
    #[error("Nothing to redo")]
    NothingToRedo,
}

/// One reversible user action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Add {
        path: KeyPath,
        values: EntryValues,
    },
    /// `old_path == new_path` unless the entry was relocated.
    Edit {
        old_path: KeyPath,
        new_path: KeyPath,
        before: EntryValues,
        after: EntryValues,
    },
    Delete {
        path: KeyPath,
        values: EntryValues,
    },
}

impl Command {
    /// The path the command leaves populated when applied.
    #[must_use]
    pub const fn path(&self) -> &KeyPath {
        match self {
            Self::Add { path, .. } | Self::Delete { path, .. } => path,
            Self::Edit { new_path, .. } => new_path,
        }
    }

    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Add { .. } => "add",
            Self::Edit { .. } => "edit",
            Self::Delete { .. } => "delete",
        }
    }

    fn undo(&self, catalog: &mut Catalog) {
        match self {
            Self::Add { path, .. } => {
                catalog.delete_entry(path);
            }
            Self::Edit { old_path, new_path, before, .. } => {
                catalog.delete_entry(new_path);
                catalog.restore(old_path, before);
            }
            Self::Delete { path, values } => catalog.restore(path, values),
        }
    }

    fn redo(&self, catalog: &mut Catalog) {
        match self {
            Self::Add { path, values } => catalog.restore(path, values),
            Self::Edit { old_path, new_path, after, .. } => {
                catalog.delete_entry(old_path);
                catalog.restore(new_path, after);
            }
            Self::Delete { path, .. } => {
                catalog.delete_entry(path);
            }
        }
    }

    /// Whether applying or reverting the command changes the entry at `path`.
    fn touches(&self, path: &KeyPath) -> bool {
        match self {
            Self::Add { path: own, .. } | Self::Delete { path: own, .. } => own == path,
            Self::Edit { old_path, new_path, .. } => old_path == path || new_path == path,
        }
    }

    /// Fills in the target text the command will restore on redo.
    fn set_translation(&mut self, text: &str) {
        match self {
            Self::Add { values, .. } | Self::Edit { after: values, .. } => {
                values.target = Some(text.to_string());
            }
            Self::Delete { .. } => {}
        }
    }
}

/// Where [`CommandLog::reconcile_translation`] found the waiting command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciliation {
    /// On the undo stack; the entry is live and the target store should be written.
    Live,
    /// On the redo stack; the entry is currently undone and the stores must stay as they are.
    Undone,
    /// No waiting command matched.
    Unknown,
}

#[derive(Debug, Clone)]
struct Record {
    command: Command,
    /// Translation whose text the command still has to receive.
    awaiting: Option<RequestId>,
}

#[derive(Debug, Clone, Default)]
pub struct CommandLog {
    undo: Vec<Record>,
    redo: Vec<Record>,
}

impl CommandLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a committed command and forgets everything that could be redone.
    ///
    /// Older commands waiting for a translation of a path this command touches
    /// stop waiting: their result would no longer match the entry.
    pub fn push(&mut self, command: Command) {
        self.push_record(Record { command, awaiting: None });
    }

    /// Like [`Self::push`], for a command whose target text is still being
    /// translated by `request`.
    pub fn push_awaiting_translation(&mut self, command: Command, request: RequestId) {
        self.push_record(Record { command, awaiting: Some(request) });
    }

    fn push_record(&mut self, record: Record) {
        for earlier in &mut self.undo {
            if earlier.awaiting.is_some() && record.command.touches(earlier.command.path()) {
                tracing::debug!(
                    path = %earlier.command.path(),
                    by = record.command.label(),
                    "Translation wait superseded"
                );
                earlier.awaiting = None;
            }
        }
        tracing::debug!(
            command = record.command.label(),
            path = %record.command.path(),
            dropped_redo = self.redo.len(),
            "Command pushed"
        );
        self.undo.push(record);
        self.redo.clear();
    }

    /// Reverts the most recent command.
    ///
    /// # Errors
    /// [`HistoryError::NothingToUndo`] when the undo stack is empty.
    pub fn undo(&mut self, catalog: &mut Catalog) -> Result<Command, HistoryError> {
        let record = self.undo.pop().ok_or(HistoryError::NothingToUndo)?;
        record.command.undo(catalog);
        let command = record.command.clone();
        self.redo.push(record);
        Ok(command)
    }

    /// Re-applies the most recently undone command.
    ///
    /// # Errors
    /// [`HistoryError::NothingToRedo`] when the redo stack is empty.
    pub fn redo(&mut self, catalog: &mut Catalog) -> Result<Command, HistoryError> {
        let record = self.redo.pop().ok_or(HistoryError::NothingToRedo)?;
        record.command.redo(catalog);
        let command = record.command.clone();
        self.undo.push(record);
        Ok(command)
    }

    /// Settles the command still waiting for `request`.
    ///
    /// The undo stack is searched from the top first, then the redo stack. With
    /// `Some(text)` the command's target text is replaced so later undo/redo
    /// restore it; with `None` (failed translation) only the wait is cleared.
    ///
    /// A command found on the undo stack is the newest one touching its path,
    /// so its entry is live in the catalog.
    pub fn reconcile_translation(&mut self, request: RequestId, text: Option<&str>) -> Reconciliation {
        let settle = |record: &mut Record| {
            record.awaiting = None;
            if let Some(text) = text {
                record.command.set_translation(text);
            }
        };

        if let Some(record) = find_waiting(&mut self.undo, request) {
            settle(record);
            return Reconciliation::Live;
        }
        if let Some(record) = find_waiting(&mut self.redo, request) {
            settle(record);
            return Reconciliation::Undone;
        }
        Reconciliation::Unknown
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    #[must_use]
    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    #[must_use]
    pub fn redo_len(&self) -> usize {
        self.redo.len()
    }

    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }
}

fn find_waiting(stack: &mut [Record], request: RequestId) -> Option<&mut Record> {
    stack.iter_mut().rev().find(|record| record.awaiting == Some(request))
}
