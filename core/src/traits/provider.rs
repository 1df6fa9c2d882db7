use crate::error::TransportError;
use crate::message::Message;
use crate::traits::ToolSpec;
use async_trait::async_trait;

/// One outbound model call: the whole transcript plus the tool catalog in,
/// one assistant message out.
#[async_trait]
pub trait Provider: Send + Sync {
    fn name(&self) -> &str;

    async fn send(
        &self,
        transcript: &[Message],
        tools: &[ToolSpec],
    ) -> Result<Message, TransportError>;
}
