//! The active editing session.
//!
//! An [`EditSession`] owns the catalog, its command log and the translation
//! orchestrator, and is driven from a single task. Every mutation, including
//! those caused by finished translations, happens on that task: translations
//! are only applied when the owner calls [`EditSession::poll_notices`] or
//! [`EditSession::next_notice`].

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use crate::catalog::{
    Catalog,
    Progress,
    TreeRow,
};
use crate::config::EditorSettings;
use crate::history::{
    Command,
    CommandLog,
    HistoryError,
    Reconciliation,
};
use crate::storage::{
    self,
    StorageError,
};
use crate::translate::{
    TranslationError,
    TranslationOrchestrator,
    TranslationOutcome,
    TranslationState,
    Translator,
};
use crate::types::{
    EntryValues,
    KeyPath,
    ValidationError,
};

#[derive(Error, Debug)]
pub enum EditError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Key '{0}' does not exist")]
    NotFound(String),
    #[error(transparent)]
    Translation(#[from] TranslationError),
}

/// The pair of catalog files a session edits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogFiles {
    pub source: PathBuf,
    pub target: PathBuf,
}

impl CatalogFiles {
    #[must_use]
    pub fn new(source: impl Into<PathBuf>, target: impl Into<PathBuf>) -> Self {
        Self { source: source.into(), target: target.into() }
    }
}

/// Where the target text of an added or edited entry comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetText {
    Manual(String),
    /// Machine-translate the source text in the background.
    Auto,
}

/// User input for [`EditSession::add`] and [`EditSession::edit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryRequest {
    pub key: String,
    pub source: String,
    pub target: TargetText,
}

impl EntryRequest {
    #[must_use]
    pub fn manual(key: impl Into<String>, source: impl Into<String>, target: impl Into<String>) -> Self {
        Self { key: key.into(), source: source.into(), target: TargetText::Manual(target.into()) }
    }

    #[must_use]
    pub fn auto(key: impl Into<String>, source: impl Into<String>) -> Self {
        Self { key: key.into(), source: source.into(), target: TargetText::Auto }
    }
}

/// What happened to a finished translation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// Written to the target store.
    Translated { path: KeyPath, text: String },
    /// The entry stays untranslated.
    TranslationFailed { path: KeyPath, reason: String },
    /// The command that asked for it is currently undone. The text is kept in the
    /// command log and comes back with redo.
    TranslationShelved { path: KeyPath, text: String },
}

/// Result of a successful [`EditSession::save`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveReport {
    pub files: CatalogFiles,
    pub entries: usize,
    /// Translations still in flight, not part of the saved files.
    pub pending: usize,
}

pub struct EditSession {
    files: CatalogFiles,
    catalog: Catalog,
    history: CommandLog,
    translations: TranslationOrchestrator,
}

impl std::fmt::Debug for EditSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditSession")
            .field("files", &self.files)
            .field("entries", &self.catalog.count_leaves())
            .field("undo", &self.history.undo_len())
            .field("redo", &self.history.redo_len())
            .field("translations", &self.translations)
            .finish()
    }
}

impl EditSession {
    /// Loads both catalog files. Unreadable files start out empty.
    #[must_use]
    pub fn open(files: CatalogFiles, settings: &EditorSettings, translator: Arc<dyn Translator>) -> Self {
        let catalog = load_catalog(&files);
        let translations = TranslationOrchestrator::new(
            translator,
            settings.languages(),
            settings.translation.concurrency,
        );
        tracing::info!(
            source = %files.source.display(),
            target = %files.target.display(),
            entries = catalog.count_leaves(),
            "Session opened"
        );
        Self { files, catalog, history: CommandLog::new(), translations }
    }

    #[must_use]
    pub const fn files(&self) -> &CatalogFiles {
        &self.files
    }

    #[must_use]
    pub const fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    #[must_use]
    pub const fn history(&self) -> &CommandLog {
        &self.history
    }

    #[must_use]
    pub fn pending_translations(&self) -> usize {
        self.translations.pending_count()
    }

    /// Creates a new entry.
    ///
    /// With [`TargetText::Auto`] only the source text is written now; the
    /// translation lands through [`Self::poll_notices`] or [`Self::next_notice`].
    ///
    /// # Errors
    /// Invalid key or empty source text, a key that already exists as an entry
    /// or a branch, a key below an existing entry, or a translation still pending
    /// for the key. Nothing is modified on error.
    pub fn add(&mut self, request: &EntryRequest) -> Result<Command, EditError> {
        let path = KeyPath::parse(&request.key)?;
        let source = validated_source(&request.source)?;
        self.ensure_vacant(&path)?;
        self.ensure_translatable(&path, &request.target)?;

        let (values, auto) = match &request.target {
            TargetText::Manual(text) => (EntryValues::new(source, Some(text.trim().to_string())), false),
            TargetText::Auto => (EntryValues::new(source, None), true),
        };
        self.catalog.restore(&path, &values);

        let command = Command::Add { path: path.clone(), values };
        self.commit(command.clone(), auto.then(|| (path, source.to_string())))?;
        Ok(command)
    }

    /// Changes the entry at `old_key`, relocating it when the request names a
    /// different key.
    ///
    /// With [`TargetText::Auto`] the previous target text is dropped until the
    /// new translation arrives.
    ///
    /// # Errors
    /// Invalid keys or empty source text, no entry at `old_key`, a new key that
    /// is taken or lies below an existing entry, or a translation still pending
    /// for the new key. Nothing is modified on error.
    pub fn edit(&mut self, old_key: &str, request: &EntryRequest) -> Result<Command, EditError> {
        let old_path = KeyPath::parse(old_key)?;
        let new_path = KeyPath::parse(&request.key)?;
        let source = validated_source(&request.source)?;

        let before = self.catalog.entry(&old_path);
        if before.is_absent() {
            return Err(EditError::NotFound(old_path.to_string()));
        }
        self.ensure_translatable(&new_path, &request.target)?;

        let (after, auto) = match &request.target {
            TargetText::Manual(text) => (EntryValues::new(source, Some(text.trim().to_string())), false),
            TargetText::Auto => (EntryValues::new(source, None), true),
        };
        // The new key is checked with the old entry out of the way, so an entry
        // can move below or above its own position.
        self.catalog.delete_entry(&old_path);
        if new_path != old_path {
            if let Err(e) = self.ensure_vacant(&new_path) {
                self.catalog.restore(&old_path, &before);
                return Err(e.into());
            }
        }
        self.catalog.restore(&new_path, &after);

        let command = Command::Edit { old_path, new_path: new_path.clone(), before, after };
        self.commit(command.clone(), auto.then(|| (new_path, source.to_string())))?;
        Ok(command)
    }

    /// Removes the entry at `key` from both stores.
    ///
    /// # Errors
    /// Invalid key, or no entry at `key` in either store.
    pub fn delete(&mut self, key: &str) -> Result<Command, EditError> {
        let path = KeyPath::parse(key)?;
        let values = self.catalog.entry(&path);
        if values.is_absent() {
            return Err(EditError::NotFound(path.to_string()));
        }

        self.catalog.delete_entry(&path);
        let command = Command::Delete { path, values };
        self.history.push(command.clone());
        Ok(command)
    }

    /// # Errors
    /// [`HistoryError::NothingToUndo`] when there is nothing to undo.
    pub fn undo(&mut self) -> Result<Command, HistoryError> {
        let command = self.history.undo(&mut self.catalog)?;
        tracing::debug!(command = command.label(), path = %command.path(), "Undone");
        Ok(command)
    }

    /// # Errors
    /// [`HistoryError::NothingToRedo`] when there is nothing to redo.
    pub fn redo(&mut self) -> Result<Command, HistoryError> {
        let command = self.history.redo(&mut self.catalog)?;
        tracing::debug!(command = command.label(), path = %command.path(), "Redone");
        Ok(command)
    }

    /// Applies every translation that has finished so far, without waiting.
    pub fn poll_notices(&mut self) -> Vec<Notice> {
        let mut notices = Vec::new();
        while let Some(outcome) = self.translations.try_next() {
            notices.extend(self.apply_translation(outcome));
        }
        notices
    }

    /// Waits for the next translation and applies it.
    ///
    /// `None` once no translation is pending.
    pub async fn next_notice(&mut self) -> Option<Notice> {
        loop {
            let outcome = self.translations.next().await?;
            if let Some(notice) = self.apply_translation(outcome) {
                return Some(notice);
            }
        }
    }

    /// Writes both catalog files.
    ///
    /// # Errors
    /// The first write that fails. The other file may already be written.
    pub fn save(&self) -> Result<SaveReport, StorageError> {
        storage::save_catalog_file(&self.files.source, self.catalog.source())?;
        storage::save_catalog_file(&self.files.target, self.catalog.target())?;

        let report = SaveReport {
            files: self.files.clone(),
            entries: self.catalog.count_leaves(),
            pending: self.translations.pending_count(),
        };
        tracing::info!(entries = report.entries, pending = report.pending, "Catalog saved");
        Ok(report)
    }

    /// Waits for outstanding translations, then rereads both files and clears
    /// the command log.
    ///
    /// Returns the notices of the translations that were waited for.
    pub async fn reload(&mut self) -> Vec<Notice> {
        let notices = self.settle_translations().await;
        self.catalog = load_catalog(&self.files);
        self.history.clear();
        tracing::info!(entries = self.catalog.count_leaves(), "Catalog reloaded");
        notices
    }

    /// Like [`Self::reload`], for a different pair of files.
    pub async fn change_files(&mut self, files: CatalogFiles) -> Vec<Notice> {
        let notices = self.settle_translations().await;
        self.files = files;
        self.catalog = load_catalog(&self.files);
        self.history.clear();
        tracing::info!(
            source = %self.files.source.display(),
            target = %self.files.target.display(),
            entries = self.catalog.count_leaves(),
            "Catalog files changed"
        );
        notices
    }

    /// Waits for outstanding translations before the session is dropped.
    pub async fn shutdown(mut self) -> Vec<Notice> {
        let notices = self.settle_translations().await;
        tracing::debug!("Session closed");
        notices
    }

    /// Nests dotted keys in both stores. Not undoable, so the command log is
    /// cleared.
    pub fn flatten_dotted(&mut self) {
        self.catalog.flatten_dotted();
        self.history.clear();
        tracing::info!(entries = self.catalog.count_leaves(), "Dotted keys flattened");
    }

    /// Tree snapshot, filtered by a case-insensitive search when `query` is
    /// not blank.
    #[must_use]
    pub fn tree(&self, query: Option<&str>) -> Vec<TreeRow> {
        let visible: Option<BTreeSet<KeyPath>> = query
            .map(str::trim)
            .filter(|query| !query.is_empty())
            .map(|query| self.catalog.search_text(query));
        self.catalog.tree(visible.as_ref())
    }

    #[must_use]
    pub fn progress(&self) -> Progress {
        self.catalog.progress()
    }

    fn ensure_vacant(&self, path: &KeyPath) -> Result<(), ValidationError> {
        if !self.catalog.entry(path).is_absent() || self.catalog.is_branch(path) {
            return Err(ValidationError::DuplicateKey(path.to_string()));
        }
        if let Some(entry) = self.catalog.leaf_prefix(path) {
            return Err(ValidationError::PrefixIsEntry { key: path.to_string(), entry: entry.to_string() });
        }
        Ok(())
    }

    fn ensure_translatable(&self, path: &KeyPath, target: &TargetText) -> Result<(), TranslationError> {
        if matches!(target, TargetText::Auto) && self.translations.is_pending(path) {
            return Err(TranslationError::AlreadyPending(path.clone()));
        }
        Ok(())
    }

    /// Pushes an applied command, requesting its translation when given.
    fn commit(&mut self, command: Command, translation: Option<(KeyPath, String)>) -> Result<(), TranslationError> {
        match translation {
            Some((path, text)) => {
                let request = self.translations.request(path, text)?;
                self.history.push_awaiting_translation(command, request);
            }
            None => self.history.push(command),
        }
        Ok(())
    }

    async fn settle_translations(&mut self) -> Vec<Notice> {
        let outcomes = self.translations.drain().await;
        outcomes.into_iter().filter_map(|outcome| self.apply_translation(outcome)).collect()
    }

    fn apply_translation(&mut self, outcome: TranslationOutcome) -> Option<Notice> {
        let TranslationOutcome { request, path, state } = outcome;
        match state {
            TranslationState::Completed(text) => match self.history.reconcile_translation(request, Some(&text)) {
                Reconciliation::Live => {
                    self.catalog.set_target(&path, &text);
                    tracing::debug!(path = %path, %request, "Translation applied");
                    Some(Notice::Translated { path, text })
                }
                Reconciliation::Undone => {
                    tracing::debug!(path = %path, %request, "Translation shelved");
                    Some(Notice::TranslationShelved { path, text })
                }
                Reconciliation::Unknown => {
                    tracing::info!(path = %path, %request, "Discarding translation superseded by a later change");
                    None
                }
            },
            TranslationState::Failed(reason) => {
                self.history.reconcile_translation(request, None);
                Some(Notice::TranslationFailed { path, reason })
            }
        }
    }
}

fn validated_source(text: &str) -> Result<&str, ValidationError> {
    let text = text.trim();
    if text.is_empty() { Err(ValidationError::EmptySourceText) } else { Ok(text) }
}

fn load_catalog(files: &CatalogFiles) -> Catalog {
    Catalog::new(storage::load_catalog_file(&files.source), storage::load_catalog_file(&files.target))
}
