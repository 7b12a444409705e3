//! Locations of everything `quest` keeps on disk
//!
//! All files live under one data directory: `~/.quest` unless `--data-dir`
//! (or `QUEST_DATA_DIR`) names another one.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

const DIR_NAME: &str = ".quest";
const DATABASE_FILE: &str = "quest.db";
const CONFIG_FILE: &str = "config.toml";
const LOGS_DIR: &str = "logs";
const LOG_FILE: &str = "quest.log";

static DATA_DIR: OnceLock<PathBuf> = OnceLock::new();

/// Fix the data directory for the rest of the process and return it.
///
/// Only the first call has an effect; later calls return the directory
/// chosen by the first.
pub fn init_data_dir(custom: Option<PathBuf>) -> &'static Path {
    DATA_DIR.get_or_init(|| custom.unwrap_or_else(home_data_dir))
}

fn home_data_dir() -> PathBuf {
    match dirs::home_dir() {
        Some(home) => home.join(DIR_NAME),
        None => PathBuf::from(DIR_NAME),
    }
}

/// The data directory, falling back to `~/.quest` before [`init_data_dir`]
pub fn data_dir() -> PathBuf {
    match DATA_DIR.get() {
        Some(dir) => dir.clone(),
        None => home_data_dir(),
    }
}

pub fn database_path() -> PathBuf {
    data_dir().join(DATABASE_FILE)
}

pub fn config_path() -> PathBuf {
    data_dir().join(CONFIG_FILE)
}

pub fn logs_dir() -> PathBuf {
    data_dir().join(LOGS_DIR)
}

pub fn log_file_path() -> PathBuf {
    logs_dir().join(LOG_FILE)
}
