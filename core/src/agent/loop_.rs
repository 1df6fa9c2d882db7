use crate::agent::{AgentObserver, Conversation, NoopObserver, ToolRegistry, dispatch};
use crate::error::{AgentError, AgentResult};
use crate::traits::{InputSource, Provider, ToolSpec};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Where the turn-taking loop currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    AwaitingHumanInput,
    AwaitingModelReply,
    DispatchingTools,
    Terminated,
}

/// Owns one conversation and drives it between the human, the model and the
/// registered tools.
pub struct AgentLoop {
    provider: Arc<dyn Provider>,
    tool_registry: Arc<ToolRegistry>,
    tool_specs: Vec<ToolSpec>,
    observer: Arc<dyn AgentObserver>,
    conversation: Conversation,
}

impl AgentLoop {
    pub fn new(provider: Arc<dyn Provider>, tool_registry: Arc<ToolRegistry>) -> Self {
        let tool_specs = tool_registry.specs();
        Self {
            provider,
            tool_registry,
            tool_specs,
            observer: Arc::new(NoopObserver),
            conversation: Conversation::new(),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn AgentObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn into_conversation(self) -> Conversation {
        self.conversation
    }

    /// Run until the input source is exhausted. Transport failures and
    /// cancellation of a pending model call end the loop with an error.
    pub async fn run(
        &mut self,
        input: &mut dyn InputSource,
        cancel: &CancellationToken,
    ) -> AgentResult<()> {
        let mut state = LoopState::AwaitingHumanInput;
        while state != LoopState::Terminated {
            state = self.step(state, input, cancel).await?;
        }
        Ok(())
    }

    /// Perform the single transition out of `state`.
    pub async fn step(
        &mut self,
        state: LoopState,
        input: &mut dyn InputSource,
        cancel: &CancellationToken,
    ) -> AgentResult<LoopState> {
        match state {
            LoopState::AwaitingHumanInput => self.read_human_input(input, cancel).await,
            LoopState::AwaitingModelReply => self.call_model(cancel).await,
            LoopState::DispatchingTools => self.dispatch_tools().await,
            LoopState::Terminated => Ok(LoopState::Terminated),
        }
    }

    async fn read_human_input(
        &mut self,
        input: &mut dyn InputSource,
        cancel: &CancellationToken,
    ) -> AgentResult<LoopState> {
        let line = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(LoopState::Terminated),
            line = input.next_line() => line.map_err(AgentError::Input)?,
        };

        match line {
            None => Ok(LoopState::Terminated),
            Some(line) if line.trim().is_empty() => Ok(LoopState::AwaitingHumanInput),
            Some(line) => {
                self.conversation.push_user_text(line);
                Ok(LoopState::AwaitingModelReply)
            }
        }
    }

    async fn call_model(&mut self, cancel: &CancellationToken) -> AgentResult<LoopState> {
        debug!(
            provider = self.provider.name(),
            messages = self.conversation.len(),
            tools = self.tool_specs.len(),
            "calling model"
        );

        let reply = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(AgentError::Cancelled),
            reply = self.provider.send(self.conversation.messages(), &self.tool_specs) => reply?,
        };

        for text in reply.text_blocks() {
            self.observer.on_model_text(text);
        }

        let next = if reply.has_tool_invocations() {
            LoopState::DispatchingTools
        } else {
            LoopState::AwaitingHumanInput
        };
        self.conversation.push_reply(reply);
        Ok(next)
    }

    async fn dispatch_tools(&mut self) -> AgentResult<LoopState> {
        let mut results = Vec::new();
        for invocation in self.conversation.pending_invocations() {
            results.push(dispatch(&self.tool_registry, self.observer.as_ref(), invocation).await);
        }

        self.conversation.push_tool_results(results)?;
        Ok(LoopState::AwaitingModelReply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use crate::message::{ContentBlock, Message, Role};
    use crate::providers::MockProvider;
    use crate::traits::{ScriptedInput, Tool};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "Returns its input unchanged"
        }

        fn input_schema(&self) -> serde_json::Value {
            json!({"type": "object", "properties": {}})
        }

        async fn execute(&self, input: serde_json::Value) -> anyhow::Result<String> {
            Ok(input
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|| input.to_string()))
        }
    }

    struct FailingTool;

    #[async_trait]
    impl Tool for FailingTool {
        fn name(&self) -> &str {
            "write"
        }

        fn description(&self) -> &str {
            "Always fails"
        }

        fn input_schema(&self) -> serde_json::Value {
            json!({"type": "object", "properties": {}})
        }

        async fn execute(&self, _input: serde_json::Value) -> anyhow::Result<String> {
            anyhow::bail!("disk full")
        }
    }

    /// Records the global sequence number at which it ran.
    struct SequencedTool {
        name: &'static str,
        counter: Arc<AtomicUsize>,
        log: Arc<Mutex<Vec<(String, usize)>>>,
    }

    #[async_trait]
    impl Tool for SequencedTool {
        fn name(&self) -> &str {
            self.name
        }

        fn description(&self) -> &str {
            "Records execution order"
        }

        fn input_schema(&self) -> serde_json::Value {
            json!({"type": "object", "properties": {}})
        }

        async fn execute(&self, _input: serde_json::Value) -> anyhow::Result<String> {
            let seq = self.counter.fetch_add(1, Ordering::SeqCst);
            self.log.lock().unwrap().push((self.name.to_string(), seq));
            Ok(seq.to_string())
        }
    }

    #[derive(Default)]
    struct RecordingObserver {
        events: Mutex<Vec<String>>,
    }

    impl AgentObserver for RecordingObserver {
        fn on_model_text(&self, text: &str) {
            self.events.lock().unwrap().push(format!("text:{text}"));
        }

        fn on_tool_call(&self, name: &str, input: &serde_json::Value) {
            self.events.lock().unwrap().push(format!("tool:{name}({input})"));
        }
    }

    struct StalledProvider;

    #[async_trait]
    impl Provider for StalledProvider {
        fn name(&self) -> &str {
            "stalled"
        }

        async fn send(
            &self,
            _transcript: &[Message],
            _tools: &[ToolSpec],
        ) -> Result<Message, TransportError> {
            std::future::pending().await
        }
    }

    fn registry(tools: Vec<Box<dyn Tool>>) -> Arc<ToolRegistry> {
        let mut registry = ToolRegistry::new();
        registry.register_all(tools).unwrap();
        Arc::new(registry)
    }

    fn tool_results(message: &Message) -> Vec<(String, String, bool)> {
        message
            .content
            .iter()
            .filter_map(|b| match b {
                ContentBlock::ToolResult {
                    tool_use_id,
                    content,
                    is_error,
                } => Some((tool_use_id.clone(), content.clone(), *is_error)),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn echo_result_goes_back_to_model() {
        let provider = Arc::new(MockProvider::new(vec![
            Message::assistant().with_tool_use("toolu_1", "echo", json!("hi")),
            Message::assistant().with_text("You said hi."),
        ]));
        let mut agent = AgentLoop::new(provider.clone(), registry(vec![Box::new(EchoTool)]));
        let mut input = ScriptedInput::new(["hi"]);

        agent.run(&mut input, &CancellationToken::new()).await.unwrap();

        let requests = provider.requests();
        assert_eq!(requests.len(), 2);

        let second = &requests[1].transcript;
        assert_eq!(second.len(), 3);
        assert_eq!(second[2].role, Role::User);
        assert_eq!(
            tool_results(&second[2]),
            vec![("toolu_1".to_string(), "hi".to_string(), false)]
        );

        assert_eq!(agent.conversation().len(), 4);
    }

    #[tokio::test]
    async fn unknown_tool_reports_not_found_and_continues() {
        let calls = Arc::new(AtomicUsize::new(0));
        let log = Arc::new(Mutex::new(Vec::new()));
        let provider = Arc::new(MockProvider::new(vec![
            Message::assistant().with_tool_use("toolu_1", "bogus", json!({})),
            Message::assistant().with_text("That tool does not exist."),
        ]));
        let tools: Vec<Box<dyn Tool>> = vec![Box::new(SequencedTool {
            name: "real",
            counter: calls.clone(),
            log: log.clone(),
        })];
        let mut agent = AgentLoop::new(provider.clone(), registry(tools));
        let mut input = ScriptedInput::new(["use bogus"]);

        agent.run(&mut input, &CancellationToken::new()).await.unwrap();

        let messages = agent.conversation().messages();
        assert_eq!(
            tool_results(&messages[2]),
            vec![("toolu_1".to_string(), "tool not found".to_string(), true)]
        );
        assert_eq!(provider.call_count(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn end_of_input_before_anything_is_clean() {
        let provider = Arc::new(MockProvider::new(vec![]));
        let mut agent = AgentLoop::new(provider.clone(), registry(vec![]));
        let mut input = ScriptedInput::new(Vec::<String>::new());

        agent.run(&mut input, &CancellationToken::new()).await.unwrap();

        assert!(agent.conversation().is_empty());
        assert_eq!(provider.call_count(), 0);
        assert_eq!(input.reads(), 1);
    }

    #[tokio::test]
    async fn tool_failure_is_data() {
        let provider = Arc::new(MockProvider::new(vec![
            Message::assistant().with_tool_use("toolu_9", "write", json!({"path": "a"})),
            Message::assistant().with_text("The disk is full."),
        ]));
        let mut agent = AgentLoop::new(provider.clone(), registry(vec![Box::new(FailingTool)]));
        let mut input = ScriptedInput::new(["save it"]);

        agent.run(&mut input, &CancellationToken::new()).await.unwrap();

        assert_eq!(
            tool_results(&agent.conversation().messages()[2]),
            vec![("toolu_9".to_string(), "disk full".to_string(), true)]
        );
        assert_eq!(provider.call_count(), 2);
    }

    #[tokio::test]
    async fn tools_run_in_invocation_order() {
        let counter = Arc::new(AtomicUsize::new(0));
        let log = Arc::new(Mutex::new(Vec::new()));
        let tools: Vec<Box<dyn Tool>> = ["a", "b", "c"]
            .into_iter()
            .map(|name| {
                Box::new(SequencedTool {
                    name,
                    counter: counter.clone(),
                    log: log.clone(),
                }) as Box<dyn Tool>
            })
            .collect();
        let provider = Arc::new(MockProvider::new(vec![
            Message::assistant()
                .with_text("Running three tools.")
                .with_tool_use("id_c", "c", json!({}))
                .with_tool_use("id_missing", "zzz", json!({}))
                .with_tool_use("id_a", "a", json!({}))
                .with_tool_use("id_b", "b", json!({})),
            Message::assistant().with_text("Done."),
        ]));
        let mut agent = AgentLoop::new(provider, registry(tools));
        let mut input = ScriptedInput::new(["go"]);

        agent.run(&mut input, &CancellationToken::new()).await.unwrap();

        assert_eq!(
            *log.lock().unwrap(),
            vec![
                ("c".to_string(), 0),
                ("a".to_string(), 1),
                ("b".to_string(), 2)
            ]
        );

        let results = tool_results(&agent.conversation().messages()[2]);
        let ids: Vec<&str> = results.iter().map(|(id, _, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["id_c", "id_missing", "id_a", "id_b"]);
        assert_eq!(results[1].1, "tool not found");
        assert_eq!(results[0].1, "0");
        assert_eq!(results[3].1, "2");
    }

    #[tokio::test]
    async fn text_reply_returns_to_human_once() {
        let provider = Arc::new(MockProvider::new(vec![
            Message::assistant().with_text("Hello!"),
            Message::assistant().with_text("Bye!"),
        ]));
        let mut agent = AgentLoop::new(provider.clone(), registry(vec![]));
        let mut input = ScriptedInput::new(["hello", "bye"]);

        agent.run(&mut input, &CancellationToken::new()).await.unwrap();

        assert_eq!(provider.call_count(), 2);
        assert_eq!(input.reads(), 3);
        let roles: Vec<Role> = agent.conversation().messages().iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![Role::User, Role::Assistant, Role::User, Role::Assistant]
        );
    }

    #[tokio::test]
    async fn chained_tool_rounds_do_not_prompt_human() {
        let provider = Arc::new(MockProvider::new(vec![
            Message::assistant().with_tool_use("t1", "echo", json!("one")),
            Message::assistant().with_tool_use("t2", "echo", json!("two")),
            Message::assistant().with_text("finished"),
        ]));
        let mut agent = AgentLoop::new(provider.clone(), registry(vec![Box::new(EchoTool)]));
        let mut input = ScriptedInput::new(["start"]);

        agent.run(&mut input, &CancellationToken::new()).await.unwrap();

        assert_eq!(provider.call_count(), 3);
        assert_eq!(input.reads(), 2);
        assert_eq!(agent.conversation().len(), 6);
    }

    #[tokio::test]
    async fn every_call_carries_full_catalog() {
        let provider = Arc::new(MockProvider::new(vec![
            Message::assistant().with_tool_use("t1", "echo", json!("x")),
            Message::assistant().with_text("ok"),
        ]));
        let mut agent = AgentLoop::new(
            provider.clone(),
            registry(vec![Box::new(EchoTool), Box::new(FailingTool)]),
        );
        let mut input = ScriptedInput::new(["go"]);

        agent.run(&mut input, &CancellationToken::new()).await.unwrap();

        for request in provider.requests() {
            let names: Vec<&str> = request.tools.iter().map(|t| t.name.as_str()).collect();
            assert_eq!(names, vec!["echo", "write"]);
        }
    }

    #[tokio::test]
    async fn transport_failure_ends_loop() {
        let provider = Arc::new(MockProvider::new(vec![]).with_failure(TransportError::Api {
            provider: "anthropic",
            status: 401,
            body: "invalid x-api-key".to_string(),
        }));
        let mut agent = AgentLoop::new(provider.clone(), registry(vec![]));
        let mut input = ScriptedInput::new(["hi", "never read"]);

        let err = agent
            .run(&mut input, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AgentError::Transport(TransportError::Api { status: 401, .. })
        ));
        assert_eq!(input.reads(), 1);
        assert_eq!(agent.conversation().len(), 1);
    }

    #[tokio::test]
    async fn observer_sees_text_and_dispatched_tools() {
        let observer = Arc::new(RecordingObserver::default());
        let provider = Arc::new(MockProvider::new(vec![
            Message::assistant()
                .with_text("Let me check.")
                .with_tool_use("t1", "echo", json!("ping"))
                .with_tool_use("t2", "nope", json!({})),
            Message::assistant().with_text("pong"),
        ]));
        let mut agent = AgentLoop::new(provider, registry(vec![Box::new(EchoTool)]))
            .with_observer(observer.clone());
        let mut input = ScriptedInput::new(["ping"]);

        agent.run(&mut input, &CancellationToken::new()).await.unwrap();

        assert_eq!(
            *observer.events.lock().unwrap(),
            vec![
                "text:Let me check.".to_string(),
                "tool:echo(\"ping\")".to_string(),
                "text:pong".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn blank_lines_are_skipped() {
        let provider = Arc::new(MockProvider::new(vec![Message::assistant().with_text("hi")]));
        let mut agent = AgentLoop::new(provider.clone(), registry(vec![]));
        let mut input = ScriptedInput::new(["", "   ", "hello"]);

        agent.run(&mut input, &CancellationToken::new()).await.unwrap();

        assert_eq!(provider.call_count(), 1);
        assert_eq!(agent.conversation().len(), 2);
    }

    #[tokio::test]
    async fn step_transitions() {
        let provider = Arc::new(MockProvider::new(vec![
            Message::assistant().with_tool_use("t1", "echo", json!("a")),
            Message::assistant().with_text("done"),
        ]));
        let mut agent = AgentLoop::new(provider, registry(vec![Box::new(EchoTool)]));
        let mut input = ScriptedInput::new(["go"]);
        let cancel = CancellationToken::new();

        let mut state = LoopState::AwaitingHumanInput;
        let mut seen = vec![state];
        while state != LoopState::Terminated {
            state = agent.step(state, &mut input, &cancel).await.unwrap();
            seen.push(state);
        }

        assert_eq!(
            seen,
            vec![
                LoopState::AwaitingHumanInput,
                LoopState::AwaitingModelReply,
                LoopState::DispatchingTools,
                LoopState::AwaitingModelReply,
                LoopState::AwaitingHumanInput,
                LoopState::Terminated,
            ]
        );

        let state = agent
            .step(LoopState::Terminated, &mut input, &cancel)
            .await
            .unwrap();
        assert_eq!(state, LoopState::Terminated);
    }

    #[tokio::test]
    async fn cancel_aborts_pending_model_call() {
        let mut agent = AgentLoop::new(Arc::new(StalledProvider), registry(vec![]));
        let mut input = ScriptedInput::new(["hi"]);
        let cancel = CancellationToken::new();

        let state = agent
            .step(LoopState::AwaitingHumanInput, &mut input, &cancel)
            .await
            .unwrap();
        assert_eq!(state, LoopState::AwaitingModelReply);

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            trigger.cancel();
        });

        let err = agent.step(state, &mut input, &cancel).await.unwrap_err();
        assert!(matches!(err, AgentError::Cancelled));
        assert_eq!(agent.conversation().len(), 1);
    }

    #[tokio::test]
    async fn cancelled_token_stops_before_reading() {
        let provider = Arc::new(MockProvider::new(vec![]));
        let mut agent = AgentLoop::new(provider.clone(), registry(vec![]));
        let mut input = ScriptedInput::new(["hi"]);
        let cancel = CancellationToken::new();
        cancel.cancel();

        agent.run(&mut input, &cancel).await.unwrap();

        assert_eq!(input.reads(), 0);
        assert_eq!(provider.call_count(), 0);
    }
}
