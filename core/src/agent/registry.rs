use crate::error::{AgentError, AgentResult};
use crate::traits::{Tool, ToolSpec};
use std::sync::Arc;

/// Ordered set of tools known to one agent. Built before the loop starts and
/// shared read-only afterwards.
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    /// Append a tool. A second tool under an existing name is refused and the
    /// registry is left unchanged.
    pub fn register(&mut self, tool: Box<dyn Tool>) -> AgentResult<()> {
        if self.lookup(tool.name()).is_some() {
            return Err(AgentError::DuplicateTool(tool.name().to_string()));
        }
        self.tools.push(Arc::from(tool));
        Ok(())
    }

    pub fn register_all(&mut self, tools: impl IntoIterator<Item = Box<dyn Tool>>) -> AgentResult<()> {
        for tool in tools {
            self.register(tool)?;
        }
        Ok(())
    }

    /// First tool whose name matches exactly.
    pub fn lookup(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.name() == name).cloned()
    }

    pub fn specs(&self) -> Vec<ToolSpec> {
        self.tools.iter().map(|t| t.spec()).collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
