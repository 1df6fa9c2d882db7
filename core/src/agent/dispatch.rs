use crate::agent::{AgentObserver, ToolRegistry};
use crate::error::TOOL_NOT_FOUND;
use crate::message::{ContentBlock, ToolInvocation};
use tracing::{info, warn};

/// Run one invocation and turn the outcome into its `ToolResult` block.
/// Failures become error results; nothing here aborts the loop.
pub async fn dispatch(
    registry: &ToolRegistry,
    observer: &dyn AgentObserver,
    invocation: ToolInvocation<'_>,
) -> ContentBlock {
    let Some(tool) = registry.lookup(invocation.name) else {
        warn!(tool = invocation.name, id = invocation.id, "model requested unknown tool");
        return ContentBlock::tool_result(invocation.id, TOOL_NOT_FOUND, true);
    };

    info!(tool = invocation.name, input = %invocation.input, "dispatching tool");
    observer.on_tool_call(invocation.name, invocation.input);

    match tool.execute(invocation.input.clone()).await {
        Ok(output) => ContentBlock::tool_result(invocation.id, output, false),
        Err(e) => {
            warn!(tool = invocation.name, error = %e, "tool failed");
            ContentBlock::tool_result(invocation.id, format!("{e:#}"), true)
        }
    }
}
