use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One block of a message. Tool results travel in `User` messages, tool
/// invocations only ever appear in `Assistant` messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    ToolResult {
        tool_use_id: String,
        content: String,
        #[serde(default)]
        is_error: bool,
    },
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn tool_use(
        id: impl Into<String>,
        name: impl Into<String>,
        input: serde_json::Value,
    ) -> Self {
        Self::ToolUse {
            id: id.into(),
            name: name.into(),
            input,
        }
    }

    pub fn tool_result(id: impl Into<String>, content: impl Into<String>, is_error: bool) -> Self {
        Self::ToolResult {
            tool_use_id: id.into(),
            content: content.into(),
            is_error,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text),
            _ => None,
        }
    }

    pub fn as_tool_invocation(&self) -> Option<ToolInvocation<'_>> {
        match self {
            Self::ToolUse { id, name, input } => Some(ToolInvocation { id, name, input }),
            _ => None,
        }
    }
}

/// Borrowed view of a `ToolUse` block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToolInvocation<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub input: &'a serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: Vec<ContentBlock>,
}

impl Message {
    pub fn user() -> Self {
        Self {
            role: Role::User,
            content: Vec::new(),
        }
    }

    pub fn assistant() -> Self {
        Self {
            role: Role::Assistant,
            content: Vec::new(),
        }
    }

    pub fn with_content(mut self, block: ContentBlock) -> Self {
        self.content.push(block);
        self
    }

    pub fn with_text(self, text: impl Into<String>) -> Self {
        self.with_content(ContentBlock::text(text))
    }

    pub fn with_tool_use(
        self,
        id: impl Into<String>,
        name: impl Into<String>,
        input: serde_json::Value,
    ) -> Self {
        self.with_content(ContentBlock::tool_use(id, name, input))
    }

    pub fn with_tool_result(
        self,
        id: impl Into<String>,
        content: impl Into<String>,
        is_error: bool,
    ) -> Self {
        self.with_content(ContentBlock::tool_result(id, content, is_error))
    }

    pub fn text_blocks(&self) -> impl Iterator<Item = &str> {
        self.content.iter().filter_map(ContentBlock::as_text)
    }

    pub fn tool_invocations(&self) -> impl Iterator<Item = ToolInvocation<'_>> {
        self.content.iter().filter_map(ContentBlock::as_tool_invocation)
    }

    pub fn has_tool_invocations(&self) -> bool {
        self.tool_invocations().next().is_some()
    }
}
