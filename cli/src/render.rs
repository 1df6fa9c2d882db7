use console::style;
use relay_core::AgentObserver;

/// Prints the conversation the way a chat transcript reads.
pub struct ConsoleObserver;

impl AgentObserver for ConsoleObserver {
    fn on_model_text(&self, text: &str) {
        println!("{}: {}", style("Claude").green(), text);
    }

    fn on_tool_call(&self, name: &str, input: &serde_json::Value) {
        println!("{}: {}({})", style("tool").green(), name, input);
    }
}

pub fn user_prompt() -> String {
    format!("{}: ", style("You").blue())
}
