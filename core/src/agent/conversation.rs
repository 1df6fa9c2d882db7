use crate::error::{AgentError, AgentResult};
use crate::message::{ContentBlock, Message, Role, ToolInvocation};

/// Append-only transcript of one session.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn push_user_text(&mut self, text: impl Into<String>) {
        self.messages.push(Message::user().with_text(text));
    }

    /// Record a model reply. Whatever role the transport put on it, it is
    /// stored as an assistant turn.
    pub fn push_reply(&mut self, mut reply: Message) {
        reply.role = Role::Assistant;
        self.messages.push(reply);
    }

    /// Invocations from the last message, if that message is a model turn
    /// still waiting for its results.
    pub fn pending_invocations(&self) -> Vec<ToolInvocation<'_>> {
        match self.messages.last() {
            Some(m) if m.role == Role::Assistant => m.tool_invocations().collect(),
            _ => Vec::new(),
        }
    }

    /// Append the results for the last model turn as one user message. The
    /// results must answer every pending invocation, in order, and contain
    /// nothing else.
    pub fn push_tool_results(&mut self, results: Vec<ContentBlock>) -> AgentResult<()> {
        let expected: Vec<&str> = self.pending_invocations().iter().map(|i| i.id).collect();
        if expected.is_empty() {
            return Err(AgentError::ResultMismatch(
                "no tool invocations are pending".to_string(),
            ));
        }

        let mut got = Vec::with_capacity(results.len());
        for block in &results {
            match block {
                ContentBlock::ToolResult { tool_use_id, .. } => got.push(tool_use_id.as_str()),
                other => {
                    return Err(AgentError::ResultMismatch(format!(
                        "unexpected block in tool result turn: {other:?}"
                    )));
                }
            }
        }

        if got != expected {
            return Err(AgentError::ResultMismatch(format!(
                "expected ids {expected:?}, got {got:?}"
            )));
        }

        self.messages.push(Message {
            role: Role::User,
            content: results,
        });
        Ok(())
    }
}
