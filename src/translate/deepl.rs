//! DeepL REST client.

use std::time::Duration;

use serde::{
    Deserialize,
    Serialize,
};

use super::{
    LanguagePair,
    TranslateError,
    Translator,
};

/// Free-plan auth keys carry this suffix and are served from a separate host.
const FREE_KEY_SUFFIX: &str = ":fx";
const FREE_API_URL: &str = "https://api-free.deepl.com";
const PRO_API_URL: &str = "https://api.deepl.com";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Serialize)]
struct TranslateRequest<'a> {
    text: [&'a str; 1],
    source_lang: &'a str,
    target_lang: &'a str,
}

#[derive(Deserialize)]
struct TranslateResponse {
    translations: Vec<TranslatedText>,
}

#[derive(Deserialize)]
struct TranslatedText {
    text: String,
}

/// [`Translator`] backed by the DeepL `/v2/translate` endpoint.
///
/// A blocking HTTP client is built per request: it must be created and dropped
/// on the worker thread, outside the async runtime.
#[derive(Clone)]
pub struct DeeplTranslator {
    auth_key: String,
    base_url: String,
}

impl std::fmt::Debug for DeeplTranslator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeeplTranslator")
            .field("auth_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl DeeplTranslator {
    /// Creates a client for `auth_key`, using `api_url` when given or the host
    /// matching the key's plan otherwise.
    #[must_use]
    pub fn new(auth_key: impl Into<String>, api_url: Option<&str>) -> Self {
        let auth_key = auth_key.into();
        let base_url = api_url
            .map_or_else(|| default_base_url(&auth_key).to_string(), str::to_string)
            .trim_end_matches('/')
            .to_string();
        Self { auth_key, base_url }
    }

    /// Reads the auth key from the environment variable `var`.
    ///
    /// # Errors
    /// [`TranslateError::MissingAuthKey`] when the variable is unset or blank.
    pub fn from_env(var: &str, api_url: Option<&str>) -> Result<Self, TranslateError> {
        match std::env::var(var) {
            Ok(key) if !key.trim().is_empty() => Ok(Self::new(key.trim(), api_url)),
            _ => Err(TranslateError::MissingAuthKey(var.to_string())),
        }
    }

    #[must_use]
    pub fn endpoint(&self) -> String {
        format!("{}/v2/translate", self.base_url)
    }
}

fn default_base_url(auth_key: &str) -> &'static str {
    if auth_key.ends_with(FREE_KEY_SUFFIX) { FREE_API_URL } else { PRO_API_URL }
}

impl Translator for DeeplTranslator {
    fn translate(&self, text: &str, languages: &LanguagePair) -> Result<String, TranslateError> {
        let client = reqwest::blocking::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        let request = TranslateRequest {
            text: [text],
            source_lang: &languages.source,
            target_lang: &languages.target,
        };

        tracing::debug!(
            source = %languages.source,
            target = %languages.target,
            chars = text.chars().count(),
            "Sending DeepL request"
        );
        let response = client
            .post(self.endpoint())
            .header("Authorization", format!("DeepL-Auth-Key {}", self.auth_key))
            .json(&request)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            tracing::error!(status = status.as_u16(), "DeepL translation error: {body}");
            return Err(TranslateError::Status { status: status.as_u16(), body });
        }

        let parsed: TranslateResponse = response.json()?;
        parsed
            .translations
            .into_iter()
            .next()
            .map(|translated| translated.text)
            .filter(|translated| !translated.is_empty())
            .ok_or(TranslateError::EmptyResult)
    }
}
