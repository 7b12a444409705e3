//! Quest execution core
//!
//! Renders quest templates against a bundle, dispatches the request and
//! folds the response back into the bundle through the quest's spell.

pub mod dispatch;
pub mod error;
pub mod mock;
pub mod orchestrator;
pub mod spell;
pub mod template;

pub use dispatch::{Dispatcher, HttpDispatcher, RenderedRequest, Response};
pub use error::QuestError;
pub use orchestrator::{render, CallOutcome, Orchestrator, SpellOutcome};
pub use spell::{Spell, SpellError, DEFAULT_SPELL};
