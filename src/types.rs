//! Core types used throughout the project.

use std::fmt;

use thiserror::Error;

/// Separator between key path segments.
pub const KEY_SEPARATOR: char = '.';

/// Rejected user input. Raised before any catalog mutation takes place.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Key is required")]
    EmptyKey,
    #[error("Key '{0}' must not end with '{KEY_SEPARATOR}'")]
    TrailingSeparator(String),
    #[error("Key '{0}' contains an empty segment")]
    EmptySegment(String),
    #[error("Polish text is required")]
    EmptySourceText,
    #[error("Key '{0}' already exists")]
    DuplicateKey(String),
    #[error("Key '{key}' would overwrite the existing entry '{entry}'")]
    PrefixIsEntry { key: String, entry: String },
}

/// A dot-separated address of one catalog entry.
///
/// Paths built from user input never have empty segments or segments containing
/// [`KEY_SEPARATOR`]. Paths enumerated from a loaded document may still carry
/// dotted segments until [`crate::catalog::Catalog::flatten_dotted`] runs.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct KeyPath {
    segments: Vec<String>,
}

impl KeyPath {
    /// Parses user-entered key text such as `fruit.apple`.
    ///
    /// Surrounding whitespace is ignored.
    ///
    /// # Errors
    /// - [`ValidationError::EmptyKey`] for blank input
    /// - [`ValidationError::TrailingSeparator`] for `fruit.`
    /// - [`ValidationError::EmptySegment`] for `fruit..apple` or `.fruit`
    pub fn parse(text: &str) -> Result<Self, ValidationError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ValidationError::EmptyKey);
        }
        if text.ends_with(KEY_SEPARATOR) {
            return Err(ValidationError::TrailingSeparator(text.to_string()));
        }

        let segments: Vec<String> = text.split(KEY_SEPARATOR).map(str::to_string).collect();
        if segments.iter().any(String::is_empty) {
            return Err(ValidationError::EmptySegment(text.to_string()));
        }

        Ok(Self { segments })
    }

    /// Wraps segments read from a stored document without validation.
    ///
    /// Stored keys may still contain the separator until they are flattened.
    pub(crate) const fn from_stored(segments: Vec<String>) -> Self {
        Self { segments }
    }

    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Last segment of the path.
    #[must_use]
    pub fn name(&self) -> &str {
        self.segments.last().map_or("", String::as_str)
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// The enclosing branch path, `None` for top-level keys.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        let (_, init) = self.segments.split_last()?;
        if init.is_empty() { None } else { Some(Self { segments: init.to_vec() }) }
    }

    /// Extends the path by one segment.
    #[must_use]
    pub fn child(&self, segment: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment.to_string());
        Self { segments }
    }

    /// Every proper ancestor, shortest first.
    pub fn ancestors(&self) -> impl Iterator<Item = Self> + '_ {
        (1..self.segments.len()).filter_map(|len| {
            self.segments.get(..len).map(|segments| Self { segments: segments.to_vec() })
        })
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for segment in &self.segments {
            if !first {
                write!(f, "{KEY_SEPARATOR}")?;
            }
            f.write_str(segment)?;
            first = false;
        }
        Ok(())
    }
}

/// The pair of values one entry holds across both stores.
///
/// `None` means the store has no leaf at that path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryValues {
    pub source: Option<String>,
    pub target: Option<String>,
}

impl EntryValues {
    #[must_use]
    pub fn new(source: impl Into<String>, target: Option<String>) -> Self {
        Self { source: Some(source.into()), target }
    }

    /// Neither store holds a leaf.
    #[must_use]
    pub const fn is_absent(&self) -> bool {
        self.source.is_none() && self.target.is_none()
    }
}

/// Identifies one translation request for the lifetime of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(u64);

impl RequestId {
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
