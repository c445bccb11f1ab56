//! Ollama chat API backend.

use crate::model::{
    Backend, Message, ModelError, ModelRequest, ModelResponse, Part, Role, ToolCall, ToolResult,
    ToolSpec, Usage,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

const DEFAULT_BASE_URL: &str = "http://localhost:11434";

// ─────────────────────────────────────────────────────────────────────────────
// API Wire Types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ApiRequest {
    model: String,
    messages: Vec<ApiMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ApiTool>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ApiMessage {
    role: &'static str,
    content: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<ApiToolCall>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolCall {
    // Ollama's wire format carries no call id; older servers omit the field
    // entirely, so pairing relies on a locally minted id (see below).
    #[serde(skip_serializing_if = "Option::is_none", default)]
    id: Option<String>,
    function: ApiFunctionCall,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiFunctionCall {
    name: String,
    arguments: Value,
}

#[derive(Debug, Serialize)]
struct ApiTool {
    #[serde(rename = "type")]
    tool_type: &'static str,
    function: ApiFunction,
}

#[derive(Debug, Serialize)]
struct ApiFunction {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    message: ApiResponseMessage,
    #[serde(default)]
    prompt_eval_count: u32,
    #[serde(default)]
    eval_count: u32,
}

#[derive(Debug, Deserialize)]
struct ApiResponseMessage {
    #[serde(default)]
    content: String,
    #[serde(default)]
    tool_calls: Vec<ApiToolCall>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Backend Implementation
// ─────────────────────────────────────────────────────────────────────────────

/// Builder for creating an Ollama backend.
#[derive(Debug, Clone)]
pub struct OllamaBackendBuilder {
    base_url: String,
    model: String,
}

impl OllamaBackendBuilder {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: model.into(),
        }
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn build(self) -> OllamaBackend {
        OllamaBackend {
            client: reqwest::Client::new(),
            base_url: self.base_url.trim_end_matches('/').to_string(),
            model: self.model,
        }
    }
}

/// Ollama `/api/chat` backend.
pub struct OllamaBackend {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl OllamaBackend {
    pub fn builder(model: impl Into<String>) -> OllamaBackendBuilder {
        OllamaBackendBuilder::new(model)
    }

    fn role_to_api(role: Role) -> &'static str {
        match role {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        }
    }

    fn message_to_api(msg: &Message) -> ApiMessage {
        let mut content = String::new();
        let mut tool_calls = Vec::new();

        for part in &msg.parts {
            match part {
                Part::Text(text) => content.push_str(text),
                Part::ToolCall(call) => tool_calls.push(ApiToolCall {
                    id: Some(call.id.clone()),
                    function: ApiFunctionCall {
                        name: call.name.clone(),
                        arguments: call.input.clone(),
                    },
                }),
                // Tool results travel as the content of a `tool` message;
                // failures are rendered so the model can read the error.
                Part::ToolResult(result) => match result {
                    ToolResult::Success { output, .. } => content.push_str(&output.to_string()),
                    ToolResult::Failure { error, .. } => {
                        content.push_str(
                            &serde_json::json!({ "error": error.to_string() }).to_string(),
                        );
                    }
                },
            }
        }

        ApiMessage {
            role: Self::role_to_api(msg.role),
            content,
            tool_calls,
        }
    }

    fn tool_to_api(spec: &ToolSpec) -> ApiTool {
        ApiTool {
            tool_type: "function",
            function: ApiFunction {
                name: spec.name.clone(),
                description: spec.description.clone(),
                parameters: spec.schema.clone(),
            },
        }
    }

    fn response_to_message(msg: ApiResponseMessage) -> Message {
        let mut parts = Vec::new();
        if !msg.content.is_empty() {
            parts.push(Part::Text(msg.content));
        }
        for call in msg.tool_calls {
            parts.push(Part::ToolCall(ToolCall {
                id: call
                    .id
                    .unwrap_or_else(|| Uuid::new_v4().to_string()),
                name: call.function.name,
                input: call.function.arguments,
            }));
        }

        Message {
            role: Role::Assistant,
            parts,
        }
    }
}

impl Backend for OllamaBackend {
    async fn call(&self, request: ModelRequest<'_>) -> Result<ModelResponse, ModelError> {
        let api_request = ApiRequest {
            model: self.model.clone(),
            messages: request.messages.iter().map(Self::message_to_api).collect(),
            tools: request.tools.iter().map(Self::tool_to_api).collect(),
            stream: false,
        };

        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&api_request)
            .send()
            .await
            .map_err(|e| ModelError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ModelError::Api(format!("{status}: {body}")));
        }

        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| ModelError::InvalidResponse(e.to_string()))?;

        Ok(ModelResponse {
            message: Self::response_to_message(api_response.message),
            usage: Usage {
                input_tokens: api_response.prompt_eval_count,
                output_tokens: api_response.eval_count,
            },
        })
    }
}
