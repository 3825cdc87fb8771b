//! Holds the active editor settings.

use std::path::Path;

use super::{
    ConfigError,
    EditorSettings,
    loader,
};

/// Keeps the validated settings.
#[derive(Default, Debug, Clone)]
pub struct ConfigManager {
    current_settings: EditorSettings,
}

impl ConfigManager {
    #[must_use]
    pub fn new() -> Self {
        Self { current_settings: EditorSettings::default() }
    }

    /// Loads settings from `settings_dir`, falling back to defaults when the
    /// directory is `None` or holds no settings file.
    ///
    /// # Errors
    /// - File read error
    /// - JSON parse error
    /// - Validation errors
    pub fn load_settings(&mut self, settings_dir: Option<&Path>) -> Result<(), ConfigError> {
        tracing::debug!("Loading settings from: {:?}", settings_dir);

        let settings = if let Some(dir) = settings_dir {
            loader::load_from_dir(dir)?.map_or_else(EditorSettings::default, |loaded| {
                tracing::debug!("Loaded settings file: {:?}", loaded);
                loaded
            })
        } else {
            EditorSettings::default()
        };

        settings.validate().map_err(ConfigError::ValidationErrors)?;

        self.current_settings = settings;
        tracing::debug!("Settings loaded successfully: {:?}", self.current_settings);

        Ok(())
    }

    #[must_use]
    pub const fn get_settings(&self) -> &EditorSettings {
        &self.current_settings
    }
}
