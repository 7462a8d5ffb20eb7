//! OpenRouter chat-completions backend (Bearer auth, OpenAI-style response).

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::llm_client::{error_from_response, ProviderError, TextProvider};

pub const PROVIDER_NAME: &str = "openrouter";
pub const DEFAULT_MODEL: &str = "openai/gpt-oss-20b:free";

const OPENROUTER_API_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    /// OpenRouter reports some upstream failures inside a 200 body.
    error: Option<ChatError>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatError {
    message: String,
}

impl ChatResponse {
    fn into_text(self) -> Result<String, ProviderError> {
        if let Some(error) = self.error {
            return Err(ProviderError::Transient(format!(
                "OpenRouter upstream error: {}",
                error.message
            )));
        }

        let choice = self
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::Transient("OpenRouter returned no choices".to_string()))?;

        match choice.message.content {
            Some(text) if !text.trim().is_empty() => Ok(text),
            _ => Err(ProviderError::Transient(format!(
                "OpenRouter returned empty content (finish_reason: {})",
                choice.finish_reason.as_deref().unwrap_or("unknown")
            ))),
        }
    }
}

pub struct OpenRouterProvider {
    client: Client,
    api_key: String,
    model: String,
}

impl OpenRouterProvider {
    pub fn new(client: Client, api_key: String, model: String) -> Self {
        Self {
            client,
            api_key,
            model,
        }
    }
}

#[async_trait]
impl TextProvider for OpenRouterProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        let request_body = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(OPENROUTER_API_URL)
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let body: ChatResponse = response.json().await.map_err(|e| {
            ProviderError::Transient(format!("Malformed response from OpenRouter: {e}"))
        })?;

        let text = body.into_text()?;
        debug!("OpenRouter ({}) returned {} chars", self.model, text.len());
        Ok(text)
    }
}
