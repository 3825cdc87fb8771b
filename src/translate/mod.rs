//! Machine translation: the translator collaborator and the orchestrator that
//! runs it off the owning thread.

mod deepl;
mod orchestrator;

use thiserror::Error;

pub use deepl::DeeplTranslator;
pub use orchestrator::{
    DEFAULT_CONCURRENCY,
    TranslationError,
    TranslationOrchestrator,
    TranslationOutcome,
    TranslationState,
};

/// Language codes a request translates between, e.g. `PL` to `EN-GB`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguagePair {
    pub source: String,
    pub target: String,
}

impl LanguagePair {
    #[must_use]
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self { source: source.into(), target: target.into() }
    }
}

impl Default for LanguagePair {
    fn default() -> Self {
        Self::new("PL", "EN-GB")
    }
}

/// Failure reported by a [`Translator`].
#[derive(Error, Debug)]
pub enum TranslateError {
    #[error("Translation service auth key is not set (expected in ${0})")]
    MissingAuthKey(String),
    #[error("Translation request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Translation service answered {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Translation service returned no text")]
    EmptyResult,
}

/// A blocking machine-translation service.
///
/// Called from worker threads only, never from the thread that owns the catalog.
pub trait Translator: Send + Sync {
    /// # Errors
    /// Any failure of the underlying service, including an empty answer.
    fn translate(&self, text: &str, languages: &LanguagePair) -> Result<String, TranslateError>;
}

/// Stands in for the translation service when no auth key is configured.
///
/// Every call fails, so auto-translated entries stay untranslated and the user
/// sees why.
#[derive(Debug, Clone)]
pub struct Unconfigured {
    auth_key_env: String,
}

impl Unconfigured {
    #[must_use]
    pub fn new(auth_key_env: impl Into<String>) -> Self {
        Self { auth_key_env: auth_key_env.into() }
    }
}

impl Translator for Unconfigured {
    fn translate(&self, _: &str, _: &LanguagePair) -> Result<String, TranslateError> {
        Err(TranslateError::MissingAuthKey(self.auth_key_env.clone()))
    }
}
