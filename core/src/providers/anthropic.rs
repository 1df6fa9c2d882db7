use crate::config::{DEFAULT_MAX_TOKENS, DEFAULT_MODEL};
use crate::error::TransportError;
use crate::message::{ContentBlock, Message, Role};
use crate::traits::{Provider, ToolSpec};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<AnthropicMessage<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<AnthropicTool<'a>>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage<'a> {
    role: Role,
    content: Vec<AnthropicBlock<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AnthropicBlock<'a> {
    Text {
        text: &'a str,
    },
    ToolUse {
        id: &'a str,
        name: &'a str,
        input: &'a serde_json::Value,
    },
    ToolResult {
        tool_use_id: &'a str,
        content: &'a str,
        #[serde(skip_serializing_if = "std::ops::Not::not")]
        is_error: bool,
    },
}

#[derive(Debug, Serialize)]
struct AnthropicTool<'a> {
    name: &'a str,
    description: &'a str,
    input_schema: &'a serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicResponseBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AnthropicResponseBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    #[serde(other)]
    Other,
}

pub struct AnthropicProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    max_tokens: u32,
    base_url: String,
}

impl AnthropicProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(600))
            .connect_timeout(std::time::Duration::from_secs(30))
            .build()
            .unwrap_or_default();

        Self {
            client,
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            base_url: "https://api.anthropic.com".to_string(),
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

    fn convert_messages<'a>(&self, messages: &'a [Message]) -> Vec<AnthropicMessage<'a>> {
        messages
            .iter()
            .map(|m| AnthropicMessage {
                role: m.role,
                content: m.content.iter().map(convert_block).collect(),
            })
            .collect()
    }

    fn convert_tools<'a>(&self, tools: &'a [ToolSpec]) -> Vec<AnthropicTool<'a>> {
        tools
            .iter()
            .map(|t| AnthropicTool {
                name: &t.name,
                description: &t.description,
                input_schema: &t.input_schema,
            })
            .collect()
    }
}

fn convert_block(block: &ContentBlock) -> AnthropicBlock<'_> {
    match block {
        ContentBlock::Text { text } => AnthropicBlock::Text { text },
        ContentBlock::ToolUse { id, name, input } => AnthropicBlock::ToolUse { id, name, input },
        ContentBlock::ToolResult {
            tool_use_id,
            content,
            is_error,
        } => AnthropicBlock::ToolResult {
            tool_use_id,
            content,
            is_error: *is_error,
        },
    }
}

#[async_trait]
impl Provider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn send(
        &self,
        transcript: &[Message],
        tools: &[ToolSpec],
    ) -> Result<Message, TransportError> {
        let request = AnthropicRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            messages: self.convert_messages(transcript),
            tools: self.convert_tools(tools),
        };

        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url.trim_end_matches('/')))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Api {
                provider: "Anthropic",
                status,
                body,
            });
        }

        let parsed: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| TransportError::InvalidResponse(e.to_string()))?;

        let content = parsed
            .content
            .into_iter()
            .filter_map(|block| match block {
                AnthropicResponseBlock::Text { text } => Some(ContentBlock::Text { text }),
                AnthropicResponseBlock::ToolUse { id, name, input } => {
                    Some(ContentBlock::ToolUse { id, name, input })
                }
                AnthropicResponseBlock::Other => None,
            })
            .collect::<Vec<_>>();

        if content.is_empty() {
            return Err(TransportError::InvalidResponse(
                "Empty response from API: no text or tool_use blocks".into(),
            ));
        }

        Ok(Message {
            role: Role::Assistant,
            content,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn tool_catalog() -> Vec<ToolSpec> {
        vec![ToolSpec {
            name: "read_file".to_string(),
            description: "Reads a file".to_string(),
            input_schema: json!({"type": "object", "properties": {"path": {"type": "string"}}}),
        }]
    }

    #[tokio::test]
    async fn sends_transcript_and_parses_mixed_reply() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header("x-api-key", "test_key"))
            .and(header("anthropic-version", ANTHROPIC_VERSION))
            .and(body_partial_json(json!({
                "model": "claude-test",
                "max_tokens": 1024,
                "messages": [
                    {"role": "user", "content": [{"type": "text", "text": "what is in main.rs?"}]}
                ],
                "tools": [{"name": "read_file", "description": "Reads a file"}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "msg_1",
                "type": "message",
                "role": "assistant",
                "content": [
                    {"type": "text", "text": "Let me look."},
                    {"type": "tool_use", "id": "toolu_1", "name": "read_file", "input": {"path": "main.rs"}}
                ],
                "stop_reason": "tool_use",
                "usage": {"input_tokens": 10, "output_tokens": 5}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let provider = AnthropicProvider::new("test_key")
            .with_model("claude-test")
            .with_base_url(server.uri());
        let transcript = vec![Message::user().with_text("what is in main.rs?")];

        let reply = provider.send(&transcript, &tool_catalog()).await.unwrap();

        assert_eq!(reply.role, Role::Assistant);
        assert_eq!(
            reply.content,
            vec![
                ContentBlock::text("Let me look."),
                ContentBlock::tool_use("toolu_1", "read_file", json!({"path": "main.rs"})),
            ]
        );
    }

    #[tokio::test]
    async fn api_error_becomes_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid x-api-key"))
            .mount(&server)
            .await;

        let provider = AnthropicProvider::new("bad").with_base_url(server.uri());
        let err = provider
            .send(&[Message::user().with_text("hi")], &[])
            .await
            .unwrap_err();

        match err {
            TransportError::Api { status, body, .. } => {
                assert_eq!(status, 401);
                assert_eq!(body, "invalid x-api-key");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn reply_without_usable_blocks_is_invalid() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "role": "assistant",
                "content": [],
                "stop_reason": "end_turn"
            })))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "role": "assistant",
                "content": [{"type": "thinking", "thinking": "hmm", "signature": "abc"}]
            })))
            .mount(&server)
            .await;

        let provider = AnthropicProvider::new("k").with_base_url(server.uri());
        let transcript = [Message::user().with_text("hi")];

        for _ in 0..2 {
            let err = provider.send(&transcript, &[]).await.unwrap_err();
            assert!(matches!(err, TransportError::InvalidResponse(_)), "{err:?}");
        }
    }

    #[test]
    fn tool_results_serialize_with_error_flag_only_when_set() {
        let message = Message::user()
            .with_tool_result("toolu_1", "ok", false)
            .with_tool_result("toolu_2", "tool not found", true);
        let provider = AnthropicProvider::new("k");

        let value = serde_json::to_value(provider.convert_messages(std::slice::from_ref(&message)))
            .unwrap();

        assert_eq!(
            value,
            json!([{
                "role": "user",
                "content": [
                    {"type": "tool_result", "tool_use_id": "toolu_1", "content": "ok"},
                    {"type": "tool_result", "tool_use_id": "toolu_2", "content": "tool not found", "is_error": true}
                ]
            }])
        );
    }

    #[test]
    fn empty_catalog_is_omitted() {
        let provider = AnthropicProvider::new("k");
        let request = AnthropicRequest {
            model: "m",
            max_tokens: 1,
            messages: vec![],
            tools: provider.convert_tools(&[]),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert!(value.get("tools").is_none());
    }
}
