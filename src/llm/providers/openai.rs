//! `OpenAI` provider implementation using the `async-openai` crate.
//!
//! Serves any `OpenAI`-compatible API (`OpenAI`, Azure, OpenRouter, Ollama,
//! local proxies) via the base URL in [`ProviderConfig`]. Several
//! instances with different endpoints can sit in one fallback chain.

use async_openai::Client;
use async_openai::config::OpenAIConfig;
use async_openai::error::OpenAIError;
use async_openai::types::{
    ChatCompletionMessageToolCall, ChatCompletionRequestAssistantMessage,
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessage,
    ChatCompletionRequestToolMessage, ChatCompletionRequestUserMessage, ChatCompletionTool,
    ChatCompletionToolType, CreateChatCompletionRequest, CreateChatCompletionStreamResponse,
    FunctionCall, FunctionObject, ResponseFormat,
};
use async_trait::async_trait;
use futures_util::StreamExt;

use crate::agent::tool::ToolCall;
use crate::config::ProviderConfig;
use crate::error::EngineError;
use crate::llm::message::{ChatMessage, ChatRequest, ChatResponse, Role, TokenUsage};
use crate::llm::provider::{ChunkStream, LlmProvider};

/// API error codes that clear up on their own.
const RETRYABLE_CODES: &[&str] = &[
    "rate_limit_exceeded",
    "server_error",
    "context_length_exceeded",
    "insufficient_quota",
];

/// API error codes caused by the request or credentials.
const FATAL_CODES: &[&str] = &["invalid_api_key", "invalid_request_error", "model_not_found"];

/// `OpenAI`-compatible LLM provider.
pub struct OpenAiProvider {
    name: String,
    model: String,
    client: Client<OpenAIConfig>,
}

impl OpenAiProvider {
    /// Creates a new provider from its chain entry.
    #[must_use]
    pub fn new(config: &ProviderConfig) -> Self {
        let mut openai_config = OpenAIConfig::new().with_api_key(&config.api_key);

        if let Some(ref base_url) = config.base_url {
            openai_config = openai_config.with_api_base(base_url);
        }

        Self {
            name: config.name.clone(),
            model: config.model.clone(),
            client: Client::with_config(openai_config),
        }
    }

    /// Converts our message type to the `OpenAI` SDK type.
    fn convert_message(msg: &ChatMessage) -> ChatCompletionRequestMessage {
        match msg.role {
            Role::System => {
                ChatCompletionRequestMessage::System(ChatCompletionRequestSystemMessage {
                    content: async_openai::types::ChatCompletionRequestSystemMessageContent::Text(
                        msg.content.clone(),
                    ),
                    name: None,
                })
            }
            Role::User => ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage {
                content: async_openai::types::ChatCompletionRequestUserMessageContent::Text(
                    msg.content.clone(),
                ),
                name: None,
            }),
            Role::Assistant => {
                let tool_calls = if msg.tool_calls.is_empty() {
                    None
                } else {
                    Some(
                        msg.tool_calls
                            .iter()
                            .map(|tc| ChatCompletionMessageToolCall {
                                id: tc.id.clone(),
                                r#type: ChatCompletionToolType::Function,
                                function: FunctionCall {
                                    name: tc.name.clone(),
                                    arguments: tc.arguments.clone(),
                                },
                            })
                            .collect(),
                    )
                };

                let content = if msg.content.is_empty() {
                    None
                } else {
                    Some(
                        async_openai::types::ChatCompletionRequestAssistantMessageContent::Text(
                            msg.content.clone(),
                        ),
                    )
                };

                #[allow(deprecated)]
                ChatCompletionRequestMessage::Assistant(ChatCompletionRequestAssistantMessage {
                    content,
                    name: None,
                    tool_calls,
                    refusal: None,
                    audio: None,
                    function_call: None,
                })
            }
            Role::Tool => ChatCompletionRequestMessage::Tool(ChatCompletionRequestToolMessage {
                content: async_openai::types::ChatCompletionRequestToolMessageContent::Text(
                    msg.content.clone(),
                ),
                tool_call_id: msg.tool_call_id.clone().unwrap_or_default(),
            }),
        }
    }

    /// Builds an `OpenAI` chat completion request from our generic request.
    ///
    /// `max_tokens` is sent as `max_completion_tokens`, and a zero
    /// temperature is omitted because reasoning models reject it.
    fn build_request(&self, request: &ChatRequest) -> CreateChatCompletionRequest {
        let messages: Vec<_> = request.messages.iter().map(Self::convert_message).collect();

        let response_format = if request.json_mode {
            Some(ResponseFormat::JsonObject)
        } else {
            None
        };

        let tools = if request.tools.is_empty() {
            None
        } else {
            Some(
                request
                    .tools
                    .iter()
                    .map(|td| ChatCompletionTool {
                        r#type: ChatCompletionToolType::Function,
                        function: FunctionObject {
                            name: td.name.clone(),
                            description: Some(td.description.clone()),
                            parameters: Some(td.parameters.clone()),
                            strict: None,
                        },
                    })
                    .collect(),
            )
        };

        CreateChatCompletionRequest {
            model: self.model.clone(),
            messages,
            temperature: request.temperature.filter(|&t| t != 0.0),
            max_completion_tokens: request.max_tokens,
            stream: if request.stream { Some(true) } else { None },
            response_format,
            tools,
            ..Default::default()
        }
    }

    /// Maps an SDK error to an [`EngineError`] with an explicit retry verdict.
    fn map_error(&self, error: OpenAIError) -> EngineError {
        match error {
            OpenAIError::Reqwest(e) => {
                let status = e.status().map(|s| s.as_u16());
                EngineError::Provider {
                    provider: self.name.clone(),
                    message: e.to_string(),
                    status,
                    retryable: Some(status.is_none_or(|s| s == 429 || s >= 500)),
                }
            }
            OpenAIError::ApiError(api) => {
                let code = api
                    .code
                    .clone()
                    .or_else(|| api.r#type.clone())
                    .unwrap_or_default();
                let retryable = if RETRYABLE_CODES.contains(&code.as_str()) {
                    Some(true)
                } else if FATAL_CODES.contains(&code.as_str()) {
                    Some(false)
                } else {
                    None
                };
                EngineError::Provider {
                    provider: self.name.clone(),
                    message: if code.is_empty() {
                        api.message
                    } else {
                        format!("{} ({code})", api.message)
                    },
                    status: None,
                    retryable,
                }
            }
            OpenAIError::StreamError(message) => EngineError::Stream {
                message,
                retryable: None,
            },
            OpenAIError::InvalidArgument(message) => EngineError::InvalidRequest { message },
            other => EngineError::Provider {
                provider: self.name.clone(),
                message: other.to_string(),
                status: None,
                retryable: Some(false),
            },
        }
    }
}

impl std::fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("name", &self.name)
            .field("model", &self.model)
            .field("client", &"<async-openai::Client>")
            .finish()
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(&self, request: &ChatRequest) -> Result<ChatResponse, EngineError> {
        let openai_request = self.build_request(request);

        let response = self
            .client
            .chat()
            .create(openai_request)
            .await
            .map_err(|e| self.map_error(e))?;

        let choice = response.choices.first();

        let content = choice
            .and_then(|c| c.message.content.as_ref())
            .cloned()
            .unwrap_or_default();

        let tool_calls = choice
            .and_then(|c| c.message.tool_calls.as_ref())
            .map(|tcs| {
                tcs.iter()
                    .map(|tc| ToolCall {
                        id: tc.id.clone(),
                        name: tc.function.name.clone(),
                        arguments: tc.function.arguments.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        let finish_reason = choice.and_then(|c| {
            c.finish_reason
                .as_ref()
                .map(|fr| format!("{fr:?}").to_lowercase())
        });

        let usage = response
            .usage
            .map_or_else(TokenUsage::default, |u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            });

        Ok(ChatResponse {
            content,
            usage,
            tool_calls,
            finish_reason,
        })
    }

    async fn generate_stream(&self, request: &ChatRequest) -> Result<ChunkStream, EngineError> {
        let mut stream_request = request.clone();
        stream_request.stream = true;
        let openai_request = self.build_request(&stream_request);

        let stream = self
            .client
            .chat()
            .create_stream(openai_request)
            .await
            .map_err(|e| self.map_error(e))?;

        let mapped = stream.filter_map(
            |result: Result<CreateChatCompletionStreamResponse, OpenAIError>| async move {
                match result {
                    Ok(response) => response
                        .choices
                        .first()
                        .and_then(|c| c.delta.content.clone())
                        .filter(|text| !text.is_empty())
                        .map(Ok),
                    Err(e) => Some(Err(EngineError::Stream {
                        message: e.to_string(),
                        retryable: None,
                    })),
                }
            },
        );

        Ok(Box::pin(mapped))
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::agent::tool::ToolDefinition;
    use crate::error::ErrorCategory;
    use crate::llm::message;
    use crate::resilience::{classify, is_retryable};

    fn provider() -> OpenAiProvider {
        OpenAiProvider::new(&ProviderConfig {
            name: "primary".to_string(),
            kind: "openai".to_string(),
            api_key: "test".to_string(),
            base_url: None,
            model: "gpt-4o-mini".to_string(),
        })
    }

    #[test]
    fn test_convert_system_message() {
        let msg = message::system_message("test");
        let converted = OpenAiProvider::convert_message(&msg);
        assert!(matches!(converted, ChatCompletionRequestMessage::System(_)));
    }

    #[test]
    fn test_convert_assistant_with_tool_calls() {
        let msg = message::assistant_tool_calls_message(vec![ToolCall {
            id: "call_1".to_string(),
            name: "code_execute".to_string(),
            arguments: r#"{"code":"print(1)"}"#.to_string(),
        }]);
        let converted = OpenAiProvider::convert_message(&msg);
        if let ChatCompletionRequestMessage::Assistant(a) = converted {
            assert_eq!(a.tool_calls.as_ref().map_or(0, Vec::len), 1);
        } else {
            panic!("Expected Assistant message");
        }
    }

    #[test]
    fn test_build_request_uses_adapter_model() {
        let request = ChatRequest {
            max_tokens: Some(100),
            json_mode: true,
            ..ChatRequest::from_prompt("test")
        };
        let built = provider().build_request(&request);
        assert_eq!(built.model, "gpt-4o-mini");
        assert_eq!(built.max_completion_tokens, Some(100));
        assert!(built.response_format.is_some());
        assert!(built.tools.is_none());
    }

    #[test]
    fn test_build_request_drops_zero_temperature() {
        let request = ChatRequest {
            temperature: Some(0.0),
            ..ChatRequest::from_prompt("test")
        };
        assert!(provider().build_request(&request).temperature.is_none());
    }

    #[test]
    fn test_build_request_with_tools() {
        let request = ChatRequest::from_prompt("test").with_tools(vec![ToolDefinition {
            name: "web_search".to_string(),
            description: "Search the web".to_string(),
            parameters: serde_json::json!({"type": "object", "properties": {}}),
        }]);
        let built = provider().build_request(&request);
        assert_eq!(built.tools.as_ref().map_or(0, Vec::len), 1);
    }

    #[test]
    fn test_map_invalid_argument_is_business() {
        let err = provider().map_error(OpenAIError::InvalidArgument("bad model".to_string()));
        assert_eq!(classify(&err), ErrorCategory::Business);
        assert!(!is_retryable(&err));
    }

    #[test]
    fn test_map_rate_limit_is_retryable() {
        let err = provider().map_error(OpenAIError::ApiError(async_openai::error::ApiError {
            message: "Rate limit reached".to_string(),
            r#type: Some("requests".to_string()),
            param: None,
            code: Some("rate_limit_exceeded".to_string()),
        }));
        assert!(is_retryable(&err));
        assert_eq!(classify(&err), ErrorCategory::Provider);
    }

    #[test]
    fn test_map_invalid_key_is_not_retryable() {
        let err = provider().map_error(OpenAIError::ApiError(async_openai::error::ApiError {
            message: "Incorrect API key provided".to_string(),
            r#type: Some("invalid_request_error".to_string()),
            param: None,
            code: Some("invalid_api_key".to_string()),
        }));
        assert!(!is_retryable(&err));
    }
}
