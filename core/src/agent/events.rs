/// Receives what the human should see while the loop runs.
pub trait AgentObserver: Send + Sync {
    /// A text block of a model reply, delivered as soon as the reply arrives.
    fn on_model_text(&self, _text: &str) {}

    /// A tool is about to run with this raw input.
    fn on_tool_call(&self, _name: &str, _input: &serde_json::Value) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl AgentObserver for NoopObserver {}
