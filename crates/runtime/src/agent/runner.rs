//! The loop driver.

use crate::agent::executor::execute_calls;
use crate::agent::{Decision, RunError, RunErrorKind, route};
use crate::model::{Backend, Message, ModelError, ModelRequest, ModelResponse, ToolSpec, Usage};
use crate::tools::ToolRegistry;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// States of the run state machine.
///
/// `Start` is implicit in seeding the transcript; `End` is the return.
enum State {
    ModelCall,
    Decide,
    ToolExec,
}

/// A completed run: the transcript plus token usage summed over model calls.
#[derive(Debug)]
pub struct RunOutcome {
    pub transcript: Vec<Message>,
    pub usage: Usage,
}

/// Drives one run: model call → routing decision → tool execution → repeat.
///
/// Owns the transcript for the duration of a run. The model-call and
/// tool-execution steps are strictly serialized; only the tool calls within
/// one batch run concurrently.
pub struct Runner<B: Backend> {
    backend: B,
    registry: ToolRegistry,
    system: Option<String>,
    model_timeout: Option<Duration>,
    tool_timeout: Option<Duration>,
    cancel: CancellationToken,
    max_turns: Option<usize>,
}

impl<B: Backend> Runner<B> {
    pub fn new(backend: B, registry: ToolRegistry) -> Self {
        Self {
            backend,
            registry,
            system: None,
            model_timeout: None,
            tool_timeout: None,
            cancel: CancellationToken::new(),
            max_turns: None,
        }
    }

    /// Set the system instruction prepended to every model call.
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Deadline for each model call.
    pub fn with_model_timeout(mut self, timeout: Duration) -> Self {
        self.model_timeout = Some(timeout);
        self
    }

    /// Deadline for each individual tool invocation.
    pub fn with_tool_timeout(mut self, timeout: Duration) -> Self {
        self.tool_timeout = Some(timeout);
        self
    }

    /// External cancellation signal, checked at step boundaries.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Bound the number of model calls per run.
    ///
    /// Off by default: a model that keeps requesting tools loops forever.
    pub fn with_max_turns(mut self, max_turns: usize) -> Self {
        self.max_turns = Some(max_turns);
        self
    }

    /// Run the loop from one user message to termination.
    ///
    /// Returns the full transcript and accumulated token usage on normal
    /// termination. On a fatal model error, cancellation, or turn-limit hit,
    /// returns [`RunError`] carrying the transcript as accumulated.
    pub async fn run(&self, initial: impl Into<String>) -> Result<RunOutcome, RunError> {
        let mut transcript = vec![Message::user(initial)];
        let specs = self.registry.specs();
        let mut usage = Usage::default();
        let mut turns = 0usize;
        let mut state = State::ModelCall;

        loop {
            match state {
                State::ModelCall => {
                    if self.cancel.is_cancelled() {
                        return Err(RunError::new(transcript, RunErrorKind::Cancelled));
                    }
                    if let Some(limit) = self.max_turns
                        && turns >= limit
                    {
                        return Err(RunError::new(transcript, RunErrorKind::TurnLimit(limit)));
                    }
                    turns += 1;
                    debug!(turn = turns, "model call");

                    match self.call_model(&transcript, &specs).await {
                        Ok(response) => {
                            usage += response.usage;
                            transcript.push(response.message);
                        }
                        Err(e) => return Err(RunError::new(transcript, e)),
                    }
                    state = State::Decide;
                }
                State::Decide => {
                    if self.cancel.is_cancelled() {
                        return Err(RunError::new(transcript, RunErrorKind::Cancelled));
                    }
                    let decision = match transcript.last() {
                        Some(latest) => route(latest),
                        None => Decision::End,
                    };
                    match decision {
                        Decision::Continue => state = State::ToolExec,
                        Decision::End => {
                            debug!(messages = transcript.len(), "run finished");
                            return Ok(RunOutcome { transcript, usage });
                        }
                    }
                }
                State::ToolExec => {
                    if self.cancel.is_cancelled() {
                        return Err(RunError::new(transcript, RunErrorKind::Cancelled));
                    }
                    let calls = transcript
                        .last()
                        .map(Message::tool_calls)
                        .unwrap_or_default();
                    let results = execute_calls(&self.registry, &calls, self.tool_timeout).await;
                    transcript.extend(results.into_iter().map(Message::tool_result));
                    state = State::ModelCall;
                }
            }
        }
    }

    /// Model-call step: `[system] ++ transcript`, one appended response.
    async fn call_model(
        &self,
        transcript: &[Message],
        specs: &[ToolSpec],
    ) -> Result<ModelResponse, ModelError> {
        let mut messages = Vec::with_capacity(transcript.len() + 1);
        if let Some(system) = &self.system {
            messages.push(Message::system(system.clone()));
        }
        messages.extend_from_slice(transcript);

        let request = ModelRequest {
            messages: &messages,
            tools: specs,
        };
        match self.model_timeout {
            Some(limit) => tokio::time::timeout(limit, self.backend.call(request))
                .await
                .map_err(|_| ModelError::Timeout(limit.as_millis() as u64))?,
            None => self.backend.call(request).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Part, Role, ToolCall, ToolResult, Usage};
    use crate::tools::{Tool, ToolError};
    use async_trait::async_trait;
    use serde_json::{Value, json};
    use std::collections::HashSet;
    use std::sync::{Arc, Mutex};

    /// Backend that replays a scripted sequence of responses.
    struct MockBackend {
        script: Mutex<Vec<Message>>,
        seen_lens: Arc<Mutex<Vec<usize>>>,
    }

    impl MockBackend {
        fn new(script: Vec<Message>) -> Self {
            Self {
                script: Mutex::new(script),
                seen_lens: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    impl Backend for MockBackend {
        async fn call(&self, request: ModelRequest<'_>) -> Result<ModelResponse, ModelError> {
            self.seen_lens.lock().unwrap().push(request.messages.len());
            let mut script = self.script.lock().unwrap();
            if script.is_empty() {
                return Err(ModelError::Api("script exhausted".into()));
            }
            Ok(ModelResponse {
                message: script.remove(0),
                usage: Usage {
                    input_tokens: 10,
                    output_tokens: 5,
                },
            })
        }
    }

    struct FailingBackend;

    impl Backend for FailingBackend {
        async fn call(&self, _request: ModelRequest<'_>) -> Result<ModelResponse, ModelError> {
            Err(ModelError::Network("connection refused".into()))
        }
    }

    struct AddTool;

    #[async_trait]
    impl Tool for AddTool {
        fn spec(&self) -> crate::model::ToolSpec {
            crate::model::ToolSpec {
                name: "add".into(),
                description: "Add two integers.".into(),
                schema: json!({"type": "object"}),
            }
        }

        async fn invoke(&self, input: Value) -> Result<Value, ToolError> {
            let a = input["a"].as_i64().unwrap_or(0);
            let b = input["b"].as_i64().unwrap_or(0);
            Ok(json!(a + b))
        }
    }

    /// Cancels the given token when invoked.
    struct CancellingTool(CancellationToken);

    #[async_trait]
    impl Tool for CancellingTool {
        fn spec(&self) -> crate::model::ToolSpec {
            crate::model::ToolSpec {
                name: "cancelling".into(),
                description: String::new(),
                schema: json!({"type": "object"}),
            }
        }

        async fn invoke(&self, _input: Value) -> Result<Value, ToolError> {
            self.0.cancel();
            Ok(Value::Null)
        }
    }

    fn tool_call_message(id: &str, name: &str, input: Value) -> Message {
        Message {
            role: Role::Assistant,
            parts: vec![Part::ToolCall(ToolCall {
                id: id.into(),
                name: name.into(),
                input,
            })],
        }
    }

    fn registry_with_add() -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(AddTool)).unwrap();
        registry
    }

    #[tokio::test]
    async fn immediate_answer_ends_after_one_turn() {
        let backend = MockBackend::new(vec![Message::assistant("4")]);
        let runner = Runner::new(backend, registry_with_add());

        let transcript = runner.run("What is 2+2?").await.unwrap().transcript;
        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript[0].role, Role::User);
        assert_eq!(transcript[1].text(), "4");
    }

    #[tokio::test]
    async fn multi_round_tool_use() {
        let backend = MockBackend::new(vec![
            tool_call_message("call-1", "add", json!({"a": 2, "b": 3})),
            Message::assistant("5"),
        ]);
        let runner = Runner::new(backend, registry_with_add());

        let outcome = runner.run("What is 2+3?").await.unwrap();
        // Two model calls' worth of mock usage.
        assert_eq!(
            outcome.usage,
            Usage {
                input_tokens: 20,
                output_tokens: 10,
            }
        );
        let transcript = outcome.transcript;
        assert_eq!(transcript.len(), 4);
        assert_eq!(transcript[0].role, Role::User);
        assert_eq!(transcript[1].role, Role::Assistant);
        assert_eq!(transcript[2].role, Role::Tool);
        assert!(matches!(
            &transcript[2].parts[0],
            Part::ToolResult(ToolResult::Success { tool_call_id, output })
                if tool_call_id == "call-1" && *output == json!(5)
        ));
        assert_eq!(transcript[3].text(), "5");
    }

    #[tokio::test]
    async fn every_result_pairs_with_a_prior_call() {
        let backend = MockBackend::new(vec![
            Message {
                role: Role::Assistant,
                parts: vec![
                    Part::ToolCall(ToolCall {
                        id: "a".into(),
                        name: "add".into(),
                        input: json!({"a": 1, "b": 1}),
                    }),
                    Part::ToolCall(ToolCall {
                        id: "b".into(),
                        name: "add".into(),
                        input: json!({"a": 2, "b": 2}),
                    }),
                ],
            },
            Message::assistant("done"),
        ]);
        let runner = Runner::new(backend, registry_with_add());

        let transcript = runner.run("add twice").await.unwrap().transcript;

        let call_ids: HashSet<String> = transcript
            .iter()
            .flat_map(|m| m.tool_calls())
            .map(|c| c.id)
            .collect();
        let result_ids: Vec<&str> = transcript
            .iter()
            .flat_map(|m| &m.parts)
            .filter_map(|p| match p {
                Part::ToolResult(r) => Some(r.tool_call_id()),
                _ => None,
            })
            .collect();

        assert_eq!(result_ids, ["a", "b"]);
        for id in &result_ids {
            assert!(call_ids.contains(*id));
        }
    }

    #[tokio::test]
    async fn unknown_tool_does_not_abort_the_run() {
        let backend = MockBackend::new(vec![
            tool_call_message("call-1", "subtract", json!({"a": 5, "b": 3})),
            Message::assistant("that tool is unavailable"),
        ]);
        let runner = Runner::new(backend, registry_with_add());

        let transcript = runner.run("subtract").await.unwrap().transcript;
        assert_eq!(transcript.len(), 4);
        assert!(matches!(
            &transcript[2].parts[0],
            Part::ToolResult(ToolResult::Failure { error: ToolError::NotFound(name), .. })
                if name == "subtract"
        ));
    }

    #[tokio::test]
    async fn model_failure_returns_partial_transcript() {
        let runner = Runner::new(FailingBackend, ToolRegistry::new());

        let err = runner.run("hello").await.unwrap_err();
        assert!(matches!(err.kind, RunErrorKind::Model(ModelError::Network(_))));
        assert_eq!(err.transcript.len(), 1);
        assert_eq!(err.transcript[0].role, Role::User);
    }

    #[tokio::test]
    async fn cancellation_between_tool_exec_and_next_model_call() {
        let cancel = CancellationToken::new();
        let mut registry = ToolRegistry::new();
        registry
            .register(Arc::new(CancellingTool(cancel.clone())))
            .unwrap();

        let backend = MockBackend::new(vec![
            tool_call_message("call-1", "cancelling", Value::Null),
            Message::assistant("never reached"),
        ]);
        let runner = Runner::new(backend, registry).with_cancellation(cancel);

        let err = runner.run("go").await.unwrap_err();
        assert!(matches!(err.kind, RunErrorKind::Cancelled));
        // Tool result is recorded, but no further assistant message follows.
        assert_eq!(err.transcript.len(), 3);
        assert_eq!(err.transcript[2].role, Role::Tool);
    }

    #[tokio::test]
    async fn turn_limit_stops_a_tool_happy_model() {
        let backend = MockBackend::new(vec![
            tool_call_message("1", "add", json!({"a": 0, "b": 0})),
            tool_call_message("2", "add", json!({"a": 0, "b": 0})),
            tool_call_message("3", "add", json!({"a": 0, "b": 0})),
        ]);
        let runner = Runner::new(backend, registry_with_add()).with_max_turns(2);

        let err = runner.run("loop").await.unwrap_err();
        assert!(matches!(err.kind, RunErrorKind::TurnLimit(2)));
        // Two full turns: user + 2 * (assistant + tool result).
        assert_eq!(err.transcript.len(), 5);
    }

    #[tokio::test]
    async fn system_prompt_is_prepended_not_recorded() {
        let backend = MockBackend::new(vec![Message::assistant("ok")]);
        let seen_lens = Arc::clone(&backend.seen_lens);
        let runner = Runner::new(backend, ToolRegistry::new()).with_system("Be brief.");

        let transcript = runner.run("hi").await.unwrap().transcript;
        // The backend saw system + user; the transcript records only the run.
        assert_eq!(*seen_lens.lock().unwrap(), [2]);
        assert_eq!(transcript.len(), 2);
        assert!(transcript.iter().all(|m| m.role != Role::System));
    }
}
