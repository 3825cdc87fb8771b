//! Editor settings: the `.catalog-editor.json` file, its validation and the
//! manager that holds the active settings.

/// Config file loader
mod loader;
/// Configuration manager
mod manager;
/// Configuration types and settings
mod types;

pub use loader::CONFIG_FILE_NAME;
pub use manager::ConfigManager;
pub use types::{
    ConfigError,
    EditorSettings,
    TranslationConfig,
    ValidationError,
};
