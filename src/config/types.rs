use std::path::PathBuf;

use serde::{
    Deserialize,
    Serialize,
};
use thiserror::Error;

use crate::translate::{
    DEFAULT_CONCURRENCY,
    LanguagePair,
};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Configuration error in '{field_path}': {message}")]
pub struct ValidationError {
    /// JSON path to the field (e.g., "translation.concurrency")
    pub field_path: String,
    pub message: String,
}

impl ValidationError {
    #[must_use]
    pub fn new(field_path: impl Into<String>, message: impl Into<String>) -> Self {
        Self { field_path: field_path.into(), message: message.into() }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration validation failed:\n{}", format_validation_errors(.0))]
    ValidationErrors(Vec<ValidationError>),

    #[error("Failed to load configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] serde_json::Error),
}

fn format_validation_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .enumerate()
        .map(|(i, err)| format!("  {}. {} - {}", i + 1, err.field_path, err.message))
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EditorSettings {
    /// Language code of the source catalog, as the translation service names it.
    pub source_language: String,
    pub target_language: String,

    pub translation: TranslationConfig,

    /// Overrides `~/.translation_app_config.json` as the recent files cache.
    pub recent_files_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TranslationConfig {
    /// Translator calls allowed in flight at once.
    pub concurrency: usize,
    /// Environment variable holding the translation service auth key.
    pub auth_key_env: String,
    /// Base URL of the translation service. Chosen from the auth key when unset.
    pub api_url: Option<String>,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            auth_key_env: "DEEPL_API_KEY".to_string(),
            api_url: None,
        }
    }
}

impl Default for EditorSettings {
    fn default() -> Self {
        let languages = LanguagePair::default();
        Self {
            source_language: languages.source,
            target_language: languages.target,
            translation: TranslationConfig::default(),
            recent_files_path: None,
        }
    }
}

impl EditorSettings {
    #[must_use]
    pub fn languages(&self) -> LanguagePair {
        LanguagePair::new(&self.source_language, &self.target_language)
    }

    /// # Errors
    /// - Language code is empty
    /// - Source and target language are the same
    /// - Concurrency is zero
    /// - Auth key variable name is empty
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if self.source_language.trim().is_empty() {
            errors.push(ValidationError::new(
                "sourceLanguage",
                "The language code cannot be empty. Example: \"PL\"",
            ));
        }

        if self.target_language.trim().is_empty() {
            errors.push(ValidationError::new(
                "targetLanguage",
                "The language code cannot be empty. Example: \"EN-GB\"",
            ));
        }

        if !self.source_language.trim().is_empty()
            && self.source_language.trim().eq_ignore_ascii_case(self.target_language.trim())
        {
            errors.push(ValidationError::new(
                "sourceLanguage/targetLanguage",
                format!(
                    "Source and target language must differ (both are '{}')",
                    self.source_language
                ),
            ));
        }

        if self.translation.concurrency == 0 {
            errors.push(ValidationError::new(
                "translation.concurrency",
                "At least one concurrent translation is required",
            ));
        }

        if self.translation.auth_key_env.trim().is_empty() {
            errors.push(ValidationError::new(
                "translation.authKeyEnv",
                "The variable name cannot be empty. Example: \"DEEPL_API_KEY\"",
            ));
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::expect_used, clippy::panic)]
mod tests {
    use googletest::prelude::*;
    use rstest::*;

    use super::*;

    #[rstest]
    fn validate_valid_settings() {
        let settings = EditorSettings::default();

        assert_that!(settings.validate(), ok(anything()));
    }

    #[rstest]
    fn deserialize_empty_settings() {
        let settings: EditorSettings = serde_json::from_str("{}").unwrap();

        assert_that!(settings.source_language, eq("PL"));
        assert_that!(settings.target_language, eq("EN-GB"));
        assert_that!(settings.translation.concurrency, eq(5));
        assert_that!(settings.translation.auth_key_env, eq("DEEPL_API_KEY"));
        assert_that!(settings.translation.api_url, none());
        assert_that!(settings.recent_files_path, none());
    }

    #[rstest]
    fn deserialize_partial_settings() {
        let json = r#"{"targetLanguage": "EN-US", "translation": {"concurrency": 2}}"#;

        let settings: EditorSettings = serde_json::from_str(json).unwrap();

        assert_that!(settings.source_language, eq("PL"));
        assert_that!(settings.target_language, eq("EN-US"));
        assert_that!(settings.translation.concurrency, eq(2));
        assert_that!(settings.translation.auth_key_env, eq("DEEPL_API_KEY"));
    }

    #[rstest]
    #[case::source_empty(
        EditorSettings { source_language: String::new(), ..EditorSettings::default() },
        "sourceLanguage"
    )]
    #[case::target_empty(
        EditorSettings { target_language: " ".to_string(), ..EditorSettings::default() },
        "targetLanguage"
    )]
    #[case::same_language(
        EditorSettings {
            source_language: "en-gb".to_string(),
            target_language: "EN-GB".to_string(),
            ..EditorSettings::default()
        },
        "sourceLanguage/targetLanguage"
    )]
    #[case::zero_concurrency(
        EditorSettings {
            translation: TranslationConfig { concurrency: 0, ..TranslationConfig::default() },
            ..EditorSettings::default()
        },
        "translation.concurrency"
    )]
    #[case::empty_env(
        EditorSettings {
            translation: TranslationConfig { auth_key_env: String::new(), ..TranslationConfig::default() },
            ..EditorSettings::default()
        },
        "translation.authKeyEnv"
    )]
    fn validate_rejects(#[case] settings: EditorSettings, #[case] field_path: &str) {
        assert_that!(
            settings.validate(),
            err(elements_are![field!(ValidationError.field_path, eq(field_path))])
        );
    }

    #[rstest]
    fn config_error_validation_errors_format() {
        let settings = EditorSettings {
            source_language: String::new(),
            translation: TranslationConfig { concurrency: 0, ..TranslationConfig::default() },
            ..EditorSettings::default()
        };

        let errors = settings.validate().unwrap_err();
        let error_message = format!("{}", ConfigError::ValidationErrors(errors));

        assert_that!(error_message, contains_substring("Configuration validation failed"));
        assert_that!(error_message, contains_substring("1. sourceLanguage"));
        assert_that!(error_message, contains_substring("2. translation.concurrency"));
    }

    #[rstest]
    fn languages_pair() {
        let settings = EditorSettings::default();

        assert_that!(settings.languages(), eq(&LanguagePair::new("PL", "EN-GB")));
    }
}
