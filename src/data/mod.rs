//! Data persistence layer for quest
//!
//! This module provides SQLite-based storage for adventures, quests and bundles.

mod adventure;
mod bundle;
mod database;
mod migrations;
mod models;
mod quest;

pub use adventure::AdventureStore;
pub use bundle::BundleStore;
pub use database::{Database, DatabaseError};
pub use models::{Adventure, Bundle, Quest, BUNDLE_VERSION};
pub use quest::QuestStore;
