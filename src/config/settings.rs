use std::fs;
use std::path::Path;

use serde::Deserialize;
use toml_edit::{DocumentMut, Item, Table};

use crate::util::paths::config_path;

/// Example configuration file contents (bundled with the binary)
pub const EXAMPLE_CONFIG: &str = include_str!("config.toml.example");

/// Settings that `quest config set` accepts, as `section.key`
pub const SETTABLE_KEYS: &[&str] = &["http.user_agent", "editor.command"];

/// Application configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// User agent sent with every quest
    pub user_agent: String,
    /// Editor command for writing spells (None = $VISUAL / $EDITOR)
    pub editor: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            user_agent: format!("quest/{}", env!("CARGO_PKG_VERSION")),
            editor: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlHttpConfig {
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlEditorConfig {
    pub command: Option<String>,
}

/// TOML representation of the config file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    pub http: Option<TomlHttpConfig>,
    pub editor: Option<TomlEditorConfig>,
}

impl Config {
    /// Load configuration from the data directory, merging with defaults
    pub fn load() -> Self {
        let config_file = config_path();

        // Create example config on first run
        if !config_file.exists() {
            Self::create_default_config(&config_file);
        }

        Self::load_from(&config_file)
    }

    /// Load configuration from a specific file, merging with defaults.
    ///
    /// A missing, unreadable or invalid file yields the defaults.
    pub fn load_from(path: &Path) -> Self {
        let mut config = Config::default();

        let Ok(contents) = fs::read_to_string(path) else {
            return config;
        };
        let toml_config = match toml::from_str::<TomlConfig>(&contents) {
            Ok(toml_config) => toml_config,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Ignoring invalid config file");
                return config;
            }
        };

        if let Some(user_agent) = toml_config.http.and_then(|http| http.user_agent) {
            config.user_agent = user_agent;
        }
        if let Some(command) = toml_config.editor.and_then(|editor| editor.command) {
            if !command.trim().is_empty() {
                config.editor = Some(command);
            }
        }

        config
    }

    /// Editor command to launch: config, then $VISUAL, then $EDITOR, then `vi`
    pub fn editor_command(&self) -> String {
        self.editor
            .clone()
            .or_else(|| std::env::var("VISUAL").ok().filter(|v| !v.trim().is_empty()))
            .or_else(|| std::env::var("EDITOR").ok().filter(|v| !v.trim().is_empty()))
            .unwrap_or_else(|| "vi".to_string())
    }

    /// Create the default config file from the bundled example
    fn create_default_config(path: &Path) {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                if let Err(e) = fs::create_dir_all(parent) {
                    tracing::warn!(error = %e, "Failed to create config directory");
                    return;
                }
            }
        }

        if let Err(e) = fs::write(path, EXAMPLE_CONFIG) {
            tracing::warn!(error = %e, "Failed to write default config");
        }
    }
}

/// Save a `section.key` setting to the config file at `path`
///
/// Reads the existing file, sets the value and writes it back while
/// preserving all other content and comments.
pub fn save_setting(path: &Path, key: &str, value: &str) -> std::io::Result<()> {
    let Some((section, field)) = key
        .split_once('.')
        .filter(|_| SETTABLE_KEYS.contains(&key))
    else {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!(
                "unknown setting `{key}` (expected one of: {})",
                SETTABLE_KEYS.join(", ")
            ),
        ));
    };

    // Read existing config or start with empty document
    let contents = if path.exists() {
        fs::read_to_string(path)?
    } else {
        String::new()
    };

    let mut doc: DocumentMut = contents
        .parse()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

    if !doc.contains_key(section) {
        doc[section] = Item::Table(Table::new());
    }
    doc[section][field] = toml_edit::value(value);

    if let Some(parent) = path.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }

    fs::write(path, doc.to_string())?;

    Ok(())
}
