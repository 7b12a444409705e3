//! Command-line interface
//!
//! Argument definitions live here; [`commands`] wires them to the stores and
//! the orchestrator.

mod commands;
mod editor;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

pub use commands::run;
pub use editor::edit_spell;

#[derive(Debug, Parser)]
#[command(name = "quest", version, about = "Chain templated HTTP requests through a shared bundle")]
pub struct Cli {
    /// Data directory (default: ~/.quest)
    #[arg(long, global = true, env = "QUEST_DATA_DIR", value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage adventures
    #[command(subcommand)]
    Adventure(AdventureCommand),
    /// Add a quest to an adventure
    Create(QuestArgs),
    /// Replace a quest's method, URL, data and headers
    Update(QuestArgs),
    /// Write a quest's spell
    Spell {
        name: String,
        adventure: String,
        /// Read the spell from a file instead of opening an editor
        #[arg(long, value_name = "PATH")]
        file: Option<PathBuf>,
    },
    /// List the quests of an adventure
    List { adventure: String },
    /// Delete a quest
    Delete { name: String, adventure: String },
    /// Show the bundle variables a quest references
    Vars { name: String, adventure: String },
    /// Call a quest and print the response body
    Call { name: String, adventure: String },
    /// Manage an adventure's bundle
    #[command(subcommand)]
    Bundle(BundleCommand),
    /// Inspect or edit the config file
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Debug, Subcommand)]
pub enum AdventureCommand {
    /// Create an empty adventure
    Create { name: String },
    /// Show an adventure with its quests and bundle
    Get { name: String },
    /// List all adventures
    List,
    /// Call every quest of an adventure in order
    Run { name: String },
}

#[derive(Debug, Subcommand)]
pub enum BundleCommand {
    /// Replace the bundle with the given items
    Create(BundleArgs),
    /// Merge the given items into the bundle
    Update(BundleArgs),
    /// Show the bundle
    Get { adventure: String },
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the config file path
    Path,
    /// Set a config value (http.user_agent, editor.command)
    Set { key: String, value: String },
}

#[derive(Debug, Args)]
pub struct QuestArgs {
    /// HTTP method (GET, POST, ...)
    pub method: String,
    pub name: String,
    /// URL template, e.g. https://{{host}}/login
    pub url: String,
    pub adventure: String,
    /// Form field as 'key: value' (repeatable)
    #[arg(short = 'd', long = "data", value_name = "KEY: VALUE", value_parser = parse_pair)]
    pub data: Vec<(String, String)>,
    /// Header as 'Name: value' (repeatable)
    #[arg(short = 'H', long = "header", value_name = "NAME: VALUE", value_parser = parse_pair)]
    pub headers: Vec<(String, String)>,
}

#[derive(Debug, Args)]
pub struct BundleArgs {
    pub adventure: String,
    /// Bundle item as 'key: value' (repeatable)
    #[arg(short = 'i', long = "item", value_name = "KEY: VALUE", value_parser = parse_pair)]
    pub items: Vec<(String, String)>,
}

/// Parse a `key: value` option, splitting on the first `": "`
pub fn parse_pair(raw: &str) -> Result<(String, String), String> {
    raw.split_once(": ")
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .ok_or_else(|| format!("expected 'key: value', got '{raw}'"))
}
