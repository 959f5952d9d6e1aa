//! Core agent loop implementation.

use std::sync::Arc;

use crate::llm::{ChatMessage, LlmClient, Role, ToolCall};
use crate::tools::ToolRegistry;

use super::prompt::build_system_prompt;

/// A tool-using agent bound to one model.
pub struct Agent {
    name: String,
    description: String,
    model: String,
    max_iterations: usize,
    llm: Arc<dyn LlmClient>,
    tools: ToolRegistry,
}

impl Agent {
    /// Create a new agent.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        model: impl Into<String>,
        llm: Arc<dyn LlmClient>,
        tools: ToolRegistry,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            model: model.into(),
            max_iterations: crate::config::DEFAULT_MAX_ITERATIONS,
            llm,
            tools,
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Run a task and return the final response.
    pub async fn run(&self, task: &str) -> anyhow::Result<String> {
        let system_prompt = build_system_prompt(&self.name, &self.description, &self.tools);
        let mut messages = vec![ChatMessage::system(system_prompt), ChatMessage::user(task)];

        let tool_schemas = self.tools.get_tool_schemas();

        for iteration in 0..self.max_iterations {
            tracing::debug!("{} iteration {}", self.name, iteration + 1);

            let response = self
                .llm
                .chat_completion(&self.model, &messages, Some(tool_schemas.as_slice()))
                .await?;

            if let Some(tool_calls) = response.tool_calls.filter(|c| !c.is_empty()) {
                messages.push(ChatMessage {
                    role: Role::Assistant,
                    content: response.content.clone(),
                    tool_calls: Some(tool_calls.clone()),
                    tool_call_id: None,
                });

                for tool_call in &tool_calls {
                    tracing::info!(
                        "{} calling tool: {} with args: {}",
                        self.name,
                        tool_call.function.name,
                        tool_call.function.arguments
                    );

                    let result_str = match self.execute_tool_call(tool_call).await {
                        Ok(output) if output.is_success() => output.text(),
                        Ok(output) => format!("Error: {}", output.text()),
                        Err(e) => format!("Error: {}", e),
                    };

                    messages.push(ChatMessage::tool_result(tool_call.id.clone(), result_str));
                }

                continue;
            }

            if let Some(content) = response.content.filter(|c| !c.trim().is_empty()) {
                return Ok(content);
            }

            return Err(anyhow::anyhow!("LLM returned empty response"));
        }

        Err(anyhow::anyhow!(
            "Max iterations ({}) reached without completion",
            self.max_iterations
        ))
    }

    /// Execute a single tool call.
    async fn execute_tool_call(
        &self,
        tool_call: &ToolCall,
    ) -> anyhow::Result<crate::tools::ToolOutput> {
        let args: serde_json::Value = if tool_call.function.arguments.trim().is_empty() {
            serde_json::Value::Object(Default::default())
        } else {
            serde_json::from_str(&tool_call.function.arguments).map_err(|e| {
                anyhow::anyhow!("Invalid arguments for {}: {}", tool_call.function.name, e)
            })?
        };

        self.tools.execute(&tool_call.function.name, args).await
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::llm::{ChatResponse, FunctionCall, LlmError};
    use crate::tools::FindFactors;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays canned responses and records every request.
    pub(crate) struct ScriptedLlm {
        responses: Mutex<VecDeque<ChatResponse>>,
        pub(crate) seen: Mutex<Vec<Vec<ChatMessage>>>,
    }

    impl ScriptedLlm {
        pub(crate) fn new(responses: Vec<ChatResponse>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl LlmClient for ScriptedLlm {
        async fn chat_completion(
            &self,
            _model: &str,
            messages: &[ChatMessage],
            _tools: Option<&[serde_json::Value]>,
        ) -> Result<ChatResponse, LlmError> {
            self.seen.lock().unwrap().push(messages.to_vec());
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| LlmError::InvalidResponse("script exhausted".to_string()))
        }
    }

    pub(crate) fn call(id: &str, name: &str, arguments: &str) -> ChatResponse {
        ChatResponse {
            content: None,
            tool_calls: Some(vec![ToolCall {
                id: id.to_string(),
                kind: "function".to_string(),
                function: FunctionCall {
                    name: name.to_string(),
                    arguments: arguments.to_string(),
                },
            }]),
            finish_reason: Some("tool_calls".to_string()),
        }
    }

    pub(crate) fn answer(text: &str) -> ChatResponse {
        ChatResponse {
            content: Some(text.to_string()),
            tool_calls: None,
            finish_reason: Some("stop".to_string()),
        }
    }

    fn factor_agent(llm: Arc<ScriptedLlm>) -> Agent {
        Agent::new(
            "Factor Agent",
            "Finds factors.",
            "openai/test",
            llm,
            ToolRegistry::new().with(Arc::new(FindFactors)),
        )
    }

    #[tokio::test]
    async fn feeds_tool_results_back() {
        let llm = Arc::new(ScriptedLlm::new(vec![
            call("call_1", "find_factors", r#"{"input_text": "12"}"#),
            answer("The factors of 12 are: 1, 2, 3, 4, 6, 12"),
        ]));
        let agent = factor_agent(llm.clone());

        let reply = agent.run("Factorize 12 please").await.unwrap();
        assert_eq!(reply, "The factors of 12 are: 1, 2, 3, 4, 6, 12");

        let seen = llm.seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        let tool_msg = seen[1].last().unwrap();
        assert_eq!(tool_msg.role, Role::Tool);
        assert_eq!(tool_msg.tool_call_id.as_deref(), Some("call_1"));
        assert_eq!(
            tool_msg.content.as_deref(),
            Some("The factors of 12 are: 1, 2, 3, 4, 6, 12")
        );
    }

    #[tokio::test]
    async fn tool_failures_become_messages() {
        let llm = Arc::new(ScriptedLlm::new(vec![
            call("call_1", "nonexistent", "{}"),
            call("call_2", "find_factors", "not json"),
            answer("sorry"),
        ]));
        let agent = factor_agent(llm.clone());

        assert_eq!(agent.run("hi").await.unwrap(), "sorry");

        let seen = llm.seen.lock().unwrap();
        let first = seen[1].last().unwrap().content.clone().unwrap();
        assert!(first.starts_with("Error: Unknown tool"));
        let second = seen[2].last().unwrap().content.clone().unwrap();
        assert!(second.starts_with("Error: Invalid arguments for find_factors"));
    }

    #[tokio::test]
    async fn tool_reported_errors_are_marked() {
        let llm = Arc::new(ScriptedLlm::new(vec![
            call("call_1", "find_factors", r#"{"input_text": "no digits"}"#),
            call("call_2", "calculator", r#"{"expression": "1/0"}"#),
            answer("done"),
        ]));
        let agent = Agent::new(
            "Mixed",
            "Both tools.",
            "openai/test",
            llm.clone(),
            ToolRegistry::new()
                .with(Arc::new(FindFactors))
                .with(Arc::new(crate::tools::Calculator)),
        );

        assert_eq!(agent.run("hi").await.unwrap(), "done");

        let seen = llm.seen.lock().unwrap();
        assert_eq!(
            seen[1].last().unwrap().content.as_deref(),
            Some("Error: No number found in the input text.")
        );
        assert_eq!(
            seen[2].last().unwrap().content.as_deref(),
            Some("Error: Division by zero")
        );
    }

    #[tokio::test]
    async fn stops_at_iteration_limit() {
        let llm = Arc::new(ScriptedLlm::new(vec![
            call("a", "find_factors", r#"{"input_text": "4"}"#),
            call("b", "find_factors", r#"{"input_text": "4"}"#),
            call("c", "find_factors", r#"{"input_text": "4"}"#),
        ]));
        let agent = factor_agent(llm).with_max_iterations(2);

        let err = agent.run("loop").await.unwrap_err();
        assert!(err.to_string().contains("Max iterations (2)"));
    }

    #[tokio::test]
    async fn empty_reply_is_error() {
        let llm = Arc::new(ScriptedLlm::new(vec![answer("  ")]));
        let err = factor_agent(llm).run("hi").await.unwrap_err();
        assert!(err.to_string().contains("empty response"));
    }
}
