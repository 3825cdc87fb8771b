//! Runs translations on the blocking pool and hands results back to the owner.
//!
//! The orchestrator never touches the catalog. Each request becomes one task that
//! waits for a semaphore permit, calls the [`Translator`] under
//! [`tokio::task::spawn_blocking`] and sends exactly one [`TranslationOutcome`]
//! back, even when the translator panics. The owner drains outcomes with
//! [`TranslationOrchestrator::try_next`] or [`TranslationOrchestrator::next`] and
//! applies them itself.

use std::collections::HashSet;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{
    Semaphore,
    mpsc,
};
use tokio::task::JoinSet;

use super::{
    LanguagePair,
    Translator,
};
use crate::types::{
    KeyPath,
    RequestId,
};

/// Number of translator calls allowed in flight at once.
pub const DEFAULT_CONCURRENCY: usize = 5;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TranslationError {
    #[error("A translation for '{0}' is already in progress")]
    AlreadyPending(KeyPath),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranslationState {
    /// Non-empty translated text.
    Completed(String),
    /// Reason the path stays untranslated.
    Failed(String),
}

/// The finished translation of one path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationOutcome {
    /// The id [`TranslationOrchestrator::request`] handed out.
    pub request: RequestId,
    pub path: KeyPath,
    pub state: TranslationState,
}

pub struct TranslationOrchestrator {
    translator: Arc<dyn Translator>,
    languages: LanguagePair,
    permits: Arc<Semaphore>,
    tasks: JoinSet<()>,
    pending: HashSet<KeyPath>,
    /// Last id handed out by [`Self::request`].
    next_request: u64,
    outcome_tx: mpsc::UnboundedSender<TranslationOutcome>,
    outcome_rx: mpsc::UnboundedReceiver<TranslationOutcome>,
}

impl std::fmt::Debug for TranslationOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranslationOrchestrator")
            .field("languages", &self.languages)
            .field("available_permits", &self.permits.available_permits())
            .field("pending", &self.pending)
            .finish_non_exhaustive()
    }
}

impl TranslationOrchestrator {
    /// `concurrency` of zero is raised to one.
    #[must_use]
    pub fn new(
        translator: Arc<dyn Translator>,
        languages: LanguagePair,
        concurrency: usize,
    ) -> Self {
        let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();
        Self {
            translator,
            languages,
            permits: Arc::new(Semaphore::new(concurrency.max(1))),
            tasks: JoinSet::new(),
            pending: HashSet::new(),
            next_request: 0,
            outcome_tx,
            outcome_rx,
        }
    }

    #[must_use]
    pub const fn languages(&self) -> &LanguagePair {
        &self.languages
    }

    /// Submits `text` for translation into the target language of `path`.
    ///
    /// Must be called from within a tokio runtime. Returns immediately with the
    /// id the outcome will carry.
    ///
    /// # Errors
    /// [`TranslationError::AlreadyPending`] while an earlier request for `path`
    /// has not been collected yet.
    pub fn request(&mut self, path: KeyPath, text: String) -> Result<RequestId, TranslationError> {
        if self.pending.contains(&path) {
            return Err(TranslationError::AlreadyPending(path));
        }
        self.pending.insert(path.clone());
        self.next_request += 1;
        let request = RequestId::new(self.next_request);
        tracing::debug!(path = %path, %request, pending = self.pending.len(), "Translation requested");

        let translator = Arc::clone(&self.translator);
        let languages = self.languages.clone();
        let permits = Arc::clone(&self.permits);
        let outcome_tx = self.outcome_tx.clone();

        self.tasks.spawn(async move {
            // The semaphore is never closed, so acquiring only fails if it were.
            let _permit = permits.acquire_owned().await.ok();
            let handle = tokio::task::spawn_blocking(move || translator.translate(&text, &languages));

            let state = match handle.await {
                Ok(Ok(translated)) if !translated.trim().is_empty() => {
                    TranslationState::Completed(translated)
                }
                Ok(Ok(_)) => TranslationState::Failed("translation service returned no text".to_string()),
                Ok(Err(e)) => {
                    tracing::warn!(path = %path, "Translation failed: {e}");
                    TranslationState::Failed(e.to_string())
                }
                Err(e) => {
                    tracing::error!(path = %path, "Translation task panicked: {e:?}");
                    TranslationState::Failed("translation task aborted".to_string())
                }
            };

            if outcome_tx.send(TranslationOutcome { request, path, state }).is_err() {
                tracing::debug!("Translation outcome dropped (receiver closed)");
            }
        });
        Ok(request)
    }

    /// Returns a finished outcome without waiting, if one is ready.
    pub fn try_next(&mut self) -> Option<TranslationOutcome> {
        self.reap();
        let outcome = self.outcome_rx.try_recv().ok()?;
        self.settle(&outcome);
        Some(outcome)
    }

    /// Waits for the next outcome. `None` when nothing is pending.
    pub async fn next(&mut self) -> Option<TranslationOutcome> {
        if self.pending.is_empty() {
            self.reap();
            return None;
        }
        let outcome = self.outcome_rx.recv().await?;
        self.settle(&outcome);
        Some(outcome)
    }

    /// Waits for every outstanding request and returns their outcomes in
    /// completion order.
    pub async fn drain(&mut self) -> Vec<TranslationOutcome> {
        let mut outcomes = Vec::with_capacity(self.pending.len());
        while let Some(outcome) = self.next().await {
            outcomes.push(outcome);
        }
        while self.tasks.join_next().await.is_some() {}
        if !outcomes.is_empty() {
            tracing::debug!(count = outcomes.len(), "Drained outstanding translations");
        }
        outcomes
    }

    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    #[must_use]
    pub fn is_pending(&self, path: &KeyPath) -> bool {
        self.pending.contains(path)
    }

    fn settle(&mut self, outcome: &TranslationOutcome) {
        self.pending.remove(&outcome.path);
        self.reap();
    }

    /// Drops handles of tasks that already finished.
    fn reap(&mut self) {
        while let Some(result) = self.tasks.try_join_next() {
            if let Err(e) = result {
                tracing::error!("Translation task failed to join: {e:?}");
            }
        }
    }
}
