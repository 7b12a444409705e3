pub mod cli;
pub mod config;
pub mod data;
pub mod engine;
pub mod util;

pub use cli::Cli;
pub use config::Config;
pub use data::{Adventure, AdventureStore, Bundle, BundleStore, Database, Quest, QuestStore};
pub use engine::{
    CallOutcome, Dispatcher, HttpDispatcher, Orchestrator, QuestError, Response, Spell,
    SpellOutcome,
};
