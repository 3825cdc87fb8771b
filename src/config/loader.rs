//! Settings file loading.

use std::path::Path;

use super::{
    ConfigError,
    EditorSettings,
};

/// Name of the settings file looked up in the settings directory.
pub const CONFIG_FILE_NAME: &str = ".catalog-editor.json";

/// Reads `.catalog-editor.json` from `dir`.
///
/// # Returns
/// - `Ok(Some(settings))`: the file exists and parsed
/// - `Ok(None)`: there is no settings file
///
/// # Errors
/// - File read error
/// - JSON parse error
pub(super) fn load_from_dir(dir: &Path) -> Result<Option<EditorSettings>, ConfigError> {
    let config_path = dir.join(CONFIG_FILE_NAME);

    if !config_path.exists() {
        tracing::debug!("Configuration file not found: {:?}", config_path);
        return Ok(None);
    }

    tracing::debug!("Loading configuration from: {:?}", config_path);

    let content = std::fs::read_to_string(&config_path)?;
    let settings: EditorSettings = serde_json::from_str(&content)?;

    Ok(Some(settings))
}
