//! Error types for rendering, dispatching and casting quests

use thiserror::Error;

use super::spell::SpellError;

/// Errors raised while calling a quest
#[derive(Error, Debug)]
pub enum QuestError {
    /// A template referenced a variable the bundle does not define
    #[error("undefined variable `{name}`")]
    UndefinedVariable { name: String },

    /// A template could not be parsed
    #[error("invalid template: {reason}")]
    InvalidTemplate { reason: String },

    /// A rendered template is not valid for the position it lands in
    #[error("rendered {field} is malformed: {reason}")]
    MalformedTemplateOutput { field: String, reason: String },

    /// The quest method is not a valid HTTP token
    #[error("invalid HTTP method `{method}`")]
    InvalidMethod { method: String },

    /// The request could not be completed
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    /// The quest's spell failed to run or produced an unusable result
    #[error("spell for quest `{quest}` failed: {source}")]
    TransformExecution {
        quest: String,
        #[source]
        source: SpellError,
    },

    /// No quest with this name exists in the adventure
    #[error("quest `{quest}` not found in adventure `{adventure}`")]
    QuestNotFound { adventure: String, quest: String },
}

impl QuestError {
    /// Short, stable name of the error kind for display
    pub fn kind(&self) -> &'static str {
        match self {
            QuestError::UndefinedVariable { .. } => "UndefinedVariable",
            QuestError::InvalidTemplate { .. } => "InvalidTemplate",
            QuestError::MalformedTemplateOutput { .. } => "MalformedTemplateOutput",
            QuestError::InvalidMethod { .. } => "InvalidMethod",
            QuestError::Transport { .. } => "TransportError",
            QuestError::TransformExecution { .. } => "TransformExecutionError",
            QuestError::QuestNotFound { .. } => "QuestNotFound",
        }
    }

    pub(crate) fn malformed(field: impl Into<String>, reason: impl Into<String>) -> Self {
        QuestError::MalformedTemplateOutput {
            field: field.into(),
            reason: reason.into(),
        }
    }
}
