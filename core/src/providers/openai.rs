use crate::error::TransportError;
use crate::message::{ContentBlock, Message, Role};
use crate::traits::{Provider, ToolSpec};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
struct OpenAIRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<OpenAIMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<OpenAITool<'a>>,
}

#[derive(Debug, Serialize)]
struct OpenAIMessage {
    role: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<OpenAIToolCallRequest>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct OpenAIToolCallRequest {
    id: String,
    r#type: &'static str,
    function: OpenAIFunctionRequest,
}

#[derive(Debug, Serialize)]
struct OpenAIFunctionRequest {
    name: String,
    arguments: String,
}

#[derive(Debug, Serialize)]
struct OpenAITool<'a> {
    r#type: &'static str,
    function: OpenAIToolFunction<'a>,
}

#[derive(Debug, Serialize)]
struct OpenAIToolFunction<'a> {
    name: &'a str,
    description: &'a str,
    parameters: &'a serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponseMessage {
    content: Option<String>,
    tool_calls: Option<Vec<OpenAIToolCall>>,
}

#[derive(Debug, Deserialize)]
struct OpenAIToolCall {
    id: String,
    function: OpenAIFunction,
}

#[derive(Debug, Deserialize)]
struct OpenAIFunction {
    name: String,
    arguments: String,
}

/// Chat-completions transport for OpenAI-compatible endpoints.
pub struct OpenAIProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    max_tokens: u32,
    base_url: String,
}

impl OpenAIProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .connect_timeout(std::time::Duration::from_secs(30))
            .build()
            .unwrap_or_default();

        Self {
            client,
            api_key: api_key.into(),
            model: "gpt-4o".to_string(),
            max_tokens: crate::config::DEFAULT_MAX_TOKENS,
            base_url: "https://api.openai.com/v1".to_string(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Chat-completions has no block lists: a user turn full of tool results
    /// becomes one `tool` message per result, and an assistant turn carries
    /// its invocations in `tool_calls`.
    fn convert_messages(&self, messages: &[Message]) -> Vec<OpenAIMessage> {
        let mut converted = Vec::new();

        for m in messages {
            let text = m.text_blocks().collect::<Vec<_>>().join("\n");

            match m.role {
                Role::Assistant => {
                    let tool_calls: Vec<OpenAIToolCallRequest> = m
                        .tool_invocations()
                        .map(|inv| OpenAIToolCallRequest {
                            id: inv.id.to_string(),
                            r#type: "function",
                            function: OpenAIFunctionRequest {
                                name: inv.name.to_string(),
                                arguments: inv.input.to_string(),
                            },
                        })
                        .collect();

                    converted.push(OpenAIMessage {
                        role: "assistant",
                        content: (!text.is_empty()).then_some(text),
                        tool_calls: (!tool_calls.is_empty()).then_some(tool_calls),
                        tool_call_id: None,
                    });
                }
                Role::User => {
                    for block in &m.content {
                        if let ContentBlock::ToolResult {
                            tool_use_id,
                            content,
                            is_error,
                        } = block
                        {
                            let content = if *is_error {
                                format!("Error: {content}")
                            } else {
                                content.clone()
                            };
                            converted.push(OpenAIMessage {
                                role: "tool",
                                content: Some(content),
                                tool_calls: None,
                                tool_call_id: Some(tool_use_id.clone()),
                            });
                        }
                    }

                    if !text.is_empty() {
                        converted.push(OpenAIMessage {
                            role: "user",
                            content: Some(text),
                            tool_calls: None,
                            tool_call_id: None,
                        });
                    }
                }
            }
        }

        converted
    }

    fn convert_tools<'a>(&self, tools: &'a [ToolSpec]) -> Vec<OpenAITool<'a>> {
        tools
            .iter()
            .map(|t| OpenAITool {
                r#type: "function",
                function: OpenAIToolFunction {
                    name: &t.name,
                    description: &t.description,
                    parameters: &t.input_schema,
                },
            })
            .collect()
    }
}

#[async_trait]
impl Provider for OpenAIProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn send(
        &self,
        transcript: &[Message],
        tools: &[ToolSpec],
    ) -> Result<Message, TransportError> {
        let openai_request = OpenAIRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            messages: self.convert_messages(transcript),
            tools: self.convert_tools(tools),
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url.trim_end_matches('/')))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&openai_request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Api {
                provider: "OpenAI",
                status,
                body,
            });
        }

        let openai_response: OpenAIResponse = response
            .json()
            .await
            .map_err(|e| TransportError::InvalidResponse(e.to_string()))?;

        let choice = openai_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| TransportError::InvalidResponse("No choices in response".into()))?;

        let mut reply = Message::assistant();
        if let Some(text) = choice.message.content.filter(|c| !c.trim().is_empty()) {
            reply = reply.with_text(text);
        }

        for call in choice.message.tool_calls.unwrap_or_default() {
            let input = serde_json::from_str(&call.function.arguments)
                .unwrap_or(serde_json::Value::String(call.function.arguments));
            reply = reply.with_tool_use(call.id, call.function.name, input);
        }

        if reply.content.is_empty() {
            return Err(TransportError::InvalidResponse(
                "Empty response from API: no content or tool calls".into(),
            ));
        }

        Ok(reply)
    }
}
