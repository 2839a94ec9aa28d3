//! `OpenAI`-compatible provider built on `async-openai`.
//!
//! One client serves both `OpenAI` and Gemini's compatible endpoint; the
//! base URL in [`AgentConfig`] picks the endpoint and the provider label
//! only affects logging.

use async_openai::Client;
use async_openai::config::OpenAIConfig;
use async_openai::error::OpenAIError;
use async_openai::types::{
    ChatCompletionRequestAssistantMessage, ChatCompletionRequestAssistantMessageContent,
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessage,
    ChatCompletionRequestSystemMessageContent, ChatCompletionRequestUserMessage,
    ChatCompletionRequestUserMessageContent, CreateChatCompletionRequest, FinishReason,
    ResponseFormat,
};
use async_trait::async_trait;
use tracing::{debug, warn};

use crate::agent::config::{AgentConfig, GEMINI_BASE_URL};
use crate::agent::message::{ChatMessage, ChatRequest, ChatResponse, Role, TokenUsage};
use crate::agent::provider::LlmProvider;
use crate::error::AgentError;

/// Chat completions over an `OpenAI`-compatible API.
pub struct OpenAiProvider {
    client: Client<OpenAIConfig>,
    label: &'static str,
}

impl OpenAiProvider {
    /// Creates a provider from agent configuration.
    #[must_use]
    pub fn new(config: &AgentConfig) -> Self {
        let mut openai_config = OpenAIConfig::new().with_api_key(&config.api_key);

        if let Some(ref base_url) = config.base_url {
            openai_config = openai_config.with_api_base(base_url.trim_end_matches('/'));
        }

        Self {
            client: Client::with_config(openai_config),
            label: Self::label_for(config),
        }
    }

    /// `"gemini"` when the provider or endpoint is Gemini, else `"openai"`.
    fn label_for(config: &AgentConfig) -> &'static str {
        let gemini_endpoint = config
            .base_url
            .as_deref()
            .is_some_and(|url| url.trim_end_matches('/') == GEMINI_BASE_URL.trim_end_matches('/'));
        if config.provider == "gemini" || gemini_endpoint {
            "gemini"
        } else {
            "openai"
        }
    }

    /// Maps SDK errors, keeping the HTTP status when the transport knows it.
    fn map_error(error: OpenAIError) -> AgentError {
        match error {
            OpenAIError::ApiError(api) => AgentError::ApiRequest {
                message: api.message,
                status: None,
            },
            OpenAIError::Reqwest(e) => AgentError::ApiRequest {
                status: e.status().map(|s| s.as_u16()),
                message: e.to_string(),
            },
            OpenAIError::JSONDeserialize(e) => AgentError::ResponseParse {
                message: format!("completion body: {e}"),
                content: String::new(),
            },
            other => AgentError::ApiRequest {
                message: other.to_string(),
                status: None,
            },
        }
    }

    /// Converts our message type to the `OpenAI` SDK type.
    fn convert_message(msg: &ChatMessage) -> ChatCompletionRequestMessage {
        match msg.role {
            Role::System => {
                ChatCompletionRequestMessage::System(ChatCompletionRequestSystemMessage {
                    content: ChatCompletionRequestSystemMessageContent::Text(msg.content.clone()),
                    name: None,
                })
            }
            Role::User => ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage {
                content: ChatCompletionRequestUserMessageContent::Text(msg.content.clone()),
                name: None,
            }),
            Role::Assistant => {
                #[allow(deprecated)]
                ChatCompletionRequestMessage::Assistant(ChatCompletionRequestAssistantMessage {
                    content: Some(ChatCompletionRequestAssistantMessageContent::Text(
                        msg.content.clone(),
                    )),
                    name: None,
                    tool_calls: None,
                    refusal: None,
                    audio: None,
                    function_call: None,
                })
            }
        }
    }

    /// Builds an `OpenAI` chat completion request from our generic request.
    fn build_request(request: &ChatRequest) -> CreateChatCompletionRequest {
        let messages: Vec<_> = request.messages.iter().map(Self::convert_message).collect();

        let response_format = if request.json_mode {
            Some(ResponseFormat::JsonObject)
        } else {
            None
        };

        CreateChatCompletionRequest {
            model: request.model.clone(),
            messages,
            temperature: request.temperature.filter(|&t| t != 0.0),
            max_completion_tokens: request.max_tokens,
            response_format,
            ..Default::default()
        }
    }
}

impl std::fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &'static str {
        self.label
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, AgentError> {
        let response = self
            .client
            .chat()
            .create(Self::build_request(request))
            .await
            .map_err(Self::map_error)?;

        let usage = response
            .usage
            .map_or_else(TokenUsage::default, |u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            });

        let Some(choice) = response.choices.into_iter().next() else {
            return Err(AgentError::ResponseParse {
                message: "completion had no choices".to_string(),
                content: String::new(),
            });
        };

        if let Some(refusal) = choice.message.refusal.filter(|r| !r.trim().is_empty()) {
            return Err(AgentError::ApiRequest {
                message: format!("model refused the request: {refusal}"),
                status: None,
            });
        }

        if request.json_mode && matches!(choice.finish_reason, Some(FinishReason::Length)) {
            warn!(
                model = %request.model,
                max_tokens = ?request.max_tokens,
                "JSON reply hit the token limit and may be truncated"
            );
        }

        let finish_reason = choice
            .finish_reason
            .map(|fr| format!("{fr:?}").to_lowercase());

        debug!(
            provider = self.label,
            model = %request.model,
            tokens = usage.total_tokens,
            finish_reason = finish_reason.as_deref().unwrap_or("unknown"),
            "chat completion received"
        );

        Ok(ChatResponse {
            content: choice.message.content.unwrap_or_default(),
            usage,
            finish_reason,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::message;

    fn request(json_mode: bool, temperature: Option<f32>) -> ChatRequest {
        ChatRequest {
            model: "gpt-4o".to_string(),
            messages: vec![message::system_message("sys"), message::user_message("test")],
            temperature,
            max_tokens: Some(100),
            json_mode,
        }
    }

    #[test]
    fn test_convert_system_message() {
        let converted = OpenAiProvider::convert_message(&message::system_message("test"));
        assert!(matches!(converted, ChatCompletionRequestMessage::System(_)));
    }

    #[test]
    fn test_convert_user_message() {
        let converted = OpenAiProvider::convert_message(&message::user_message("hello"));
        assert!(matches!(converted, ChatCompletionRequestMessage::User(_)));
    }

    #[test]
    fn test_convert_assistant_message() {
        let converted = OpenAiProvider::convert_message(&message::assistant_message("earlier"));
        assert!(matches!(converted, ChatCompletionRequestMessage::Assistant(_)));
    }

    #[test]
    fn test_build_request_json_mode() {
        let built = OpenAiProvider::build_request(&request(true, Some(0.0)));
        assert!(built.response_format.is_some());
        assert_eq!(built.messages.len(), 2);
        assert_eq!(built.max_completion_tokens, Some(100));
    }

    #[test]
    fn test_build_request_zero_temperature_omitted() {
        assert!(
            OpenAiProvider::build_request(&request(false, Some(0.0)))
                .temperature
                .is_none()
        );
        assert_eq!(
            OpenAiProvider::build_request(&request(false, Some(0.7))).temperature,
            Some(0.7)
        );
    }

    fn config(provider: &str, base_url: Option<&str>) -> AgentConfig {
        let mut builder = AgentConfig::builder()
            .api_key("k")
            .search_api_key("t")
            .provider(provider);
        if let Some(url) = base_url {
            builder = builder.base_url(url);
        }
        builder.build().unwrap_or_else(|_| unreachable!())
    }

    #[test]
    fn test_label_follows_provider_and_endpoint() {
        assert_eq!(OpenAiProvider::label_for(&config("openai", None)), "openai");
        assert_eq!(OpenAiProvider::label_for(&config("gemini", None)), "gemini");
        assert_eq!(
            OpenAiProvider::label_for(&config("openai", Some(GEMINI_BASE_URL))),
            "gemini"
        );
        assert_eq!(
            OpenAiProvider::label_for(&config("openai", Some("http://localhost:8080/v1/"))),
            "openai"
        );
    }

    #[test]
    fn test_invalid_argument_maps_to_api_request() {
        let err = OpenAiProvider::map_error(OpenAIError::InvalidArgument("bad model".into()));
        assert!(matches!(err, AgentError::ApiRequest { status: None, .. }));
    }

    #[test]
    fn test_undecodable_body_maps_to_response_parse() {
        let json_err = match serde_json::from_str::<serde_json::Value>("{\"choices\":") {
            Err(e) => e,
            Ok(_) => unreachable!(),
        };
        let err = OpenAiProvider::map_error(OpenAIError::JSONDeserialize(json_err));
        assert!(matches!(
            err,
            AgentError::ResponseParse { ref message, ref content }
                if message.starts_with("completion body:") && content.is_empty()
        ));
    }

    #[test]
    fn test_build_request_text_mode() {
        let built = OpenAiProvider::build_request(&request(false, None));
        assert!(built.response_format.is_none());
        assert!(built.tools.is_none());
    }
}
