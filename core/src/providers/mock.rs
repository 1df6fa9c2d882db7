use crate::error::TransportError;
use crate::message::Message;
use crate::traits::{Provider, ToolSpec};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

/// What the mock saw on one call.
#[derive(Debug, Clone)]
pub struct MockRequest {
    pub transcript: Vec<Message>,
    pub tools: Vec<ToolSpec>,
}

/// A provider that plays back pre-configured replies and records every
/// request it receives.
#[derive(Default)]
pub struct MockProvider {
    replies: Mutex<VecDeque<Result<Message, TransportError>>>,
    requests: Mutex<Vec<MockRequest>>,
}

impl MockProvider {
    pub fn new(replies: Vec<Message>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().map(Ok).collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a failure to be returned on the next unanswered call.
    pub fn with_failure(self, error: TransportError) -> Self {
        self.replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(Err(error));
        self
    }

    pub fn requests(&self) -> Vec<MockRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn send(
        &self,
        transcript: &[Message],
        tools: &[ToolSpec],
    ) -> Result<Message, TransportError> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(MockRequest {
                transcript: transcript.to_vec(),
                tools: tools.to_vec(),
            });

        self.replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or(Err(TransportError::Exhausted))
    }
}
