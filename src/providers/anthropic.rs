use super::http_client::build_http_client;
use super::scrub::{api_error, sanitize_api_error};
use super::traits::Generator;
use crate::config::GenerationConfig;
use crate::error::GenerationError;
use crate::session::{Turn, TurnRole};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const PROVIDER: &str = "anthropic";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic Messages API client used as the reply generator.
pub struct AnthropicGenerator {
    api_key: Option<String>,
    cached_messages_url: String,
    model: String,
    max_tokens: u32,
    temperature: f64,
    system_prompt: Option<String>,
    client: Client,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: Vec<Message<'a>>,
    temperature: f64,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    content: Vec<ResponseContentBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ResponseContentBlock {
    Text {
        text: String,
    },
    #[serde(other)]
    Unsupported,
}

impl AnthropicGenerator {
    pub fn new(config: &GenerationConfig) -> Self {
        let base = config
            .base_url
            .as_deref()
            .map_or("https://api.anthropic.com", |u| u.trim_end_matches('/'));
        Self {
            api_key: config
                .api_key
                .as_deref()
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(ToString::to_string),
            cached_messages_url: format!("{base}/v1/messages"),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            system_prompt: config
                .system_prompt
                .as_deref()
                .filter(|p| !p.trim().is_empty())
                .map(ToString::to_string),
            client: build_http_client(Duration::from_secs(config.timeout_secs)),
        }
    }

    fn build_request<'a>(&'a self, history: &'a [Turn]) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            system: self.system_prompt.as_deref(),
            messages: history
                .iter()
                .map(|turn| Message {
                    role: match turn.role {
                        TurnRole::User => "user",
                        TurnRole::Assistant => "assistant",
                    },
                    content: &turn.content,
                })
                .collect(),
            temperature: self.temperature,
        }
    }

    fn extract_text(response: ChatResponse) -> Result<String, GenerationError> {
        let text = response
            .content
            .into_iter()
            .filter_map(|block| match block {
                ResponseContentBlock::Text { text } => Some(text),
                ResponseContentBlock::Unsupported => None,
            })
            .collect::<Vec<_>>()
            .join("\n");

        if text.trim().is_empty() {
            Err(GenerationError::Empty {
                provider: PROVIDER.into(),
            })
        } else {
            Ok(text)
        }
    }

    fn request_error(error: &reqwest::Error) -> GenerationError {
        GenerationError::Request {
            provider: PROVIDER.into(),
            message: sanitize_api_error(&error.to_string()),
        }
    }
}

#[async_trait]
impl Generator for AnthropicGenerator {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn generate(&self, history: &[Turn]) -> Result<String, GenerationError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| GenerationError::Credentials {
                provider: PROVIDER.into(),
            })?;

        let request = self.build_request(history);
        let response = self
            .client
            .post(&self.cached_messages_url)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .header("x-api-key", api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| Self::request_error(&e))?;

        if !response.status().is_success() {
            return Err(api_error(PROVIDER, response).await);
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| Self::request_error(&e))?;
        Self::extract_text(chat_response)
    }

    async fn warmup(&self) -> Result<(), GenerationError> {
        let base = self
            .cached_messages_url
            .trim_end_matches("/v1/messages")
            .to_string();
        self.client
            .head(base)
            .send()
            .await
            .map_err(|e| Self::request_error(&e))?;
        Ok(())
    }
}
