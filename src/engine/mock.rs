//! Mock dispatcher for deterministic testing
//!
//! Implements the [`Dispatcher`] trait by replaying pre-configured responses
//! and recording every request it receives, without touching the network.
//!
//! # Example
//! ```no_run
//! use quest::engine::mock::MockDispatcher;
//! use quest::engine::{Orchestrator, Response};
//!
//! let dispatcher = MockDispatcher::new().with_response(Response::new(200).with_body("pong"));
//! let orchestrator = Orchestrator::new(dispatcher.clone());
//! // Call quests, then inspect dispatcher.requests()...
//! ```

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::dispatch::{Dispatcher, RenderedRequest, Response};
use super::error::QuestError;

/// What the mock does for one request
#[derive(Clone, Debug)]
pub enum MockReply {
    Respond(Response),
    /// Simulate a transport failure with this message
    Fail(String),
}

#[derive(Default)]
struct MockState {
    replies: VecDeque<MockReply>,
    requests: Vec<RenderedRequest>,
}

/// Dispatcher that replays queued replies in order
///
/// Once the queue is empty every request gets an empty `200`.
#[derive(Clone, Default)]
pub struct MockDispatcher {
    state: Arc<Mutex<MockState>>,
}

impl MockDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response
    pub fn with_response(self, response: Response) -> Self {
        self.state.lock().replies.push_back(MockReply::Respond(response));
        self
    }

    /// Queue a transport failure
    pub fn with_failure(self, message: impl Into<String>) -> Self {
        self.state
            .lock()
            .replies
            .push_back(MockReply::Fail(message.into()));
        self
    }

    /// Requests received so far, oldest first
    pub fn requests(&self) -> Vec<RenderedRequest> {
        self.state.lock().requests.clone()
    }

    pub fn request_count(&self) -> usize {
        self.state.lock().requests.len()
    }
}

#[async_trait]
impl Dispatcher for MockDispatcher {
    async fn dispatch(&self, request: &RenderedRequest) -> Result<Response, QuestError> {
        let mut state = self.state.lock();
        state.requests.push(request.clone());
        match state.replies.pop_front() {
            Some(MockReply::Respond(response)) => Ok(response),
            Some(MockReply::Fail(message)) => Err(QuestError::Transport {
                url: request.url.clone(),
                message,
            }),
            None => Ok(Response::new(200)),
        }
    }
}
