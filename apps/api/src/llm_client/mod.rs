//! LLM Client: the single point of entry for all text-generation calls.
//!
//! ARCHITECTURAL RULE: No other module may call a provider API directly.
//! Interview and feedback code talk to `AiClient`, which goes through the
//! provider router, the per-provider retry wrapper, and the output parser.
//!
//! Layering (outermost first):
//!   AiClient → ProviderRouter (circuit breaker) → ResilientProvider (retry) → TextProvider
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::Config;
use crate::models::feedback::NewFeedback;

pub mod anthropic;
pub mod gemini;
pub mod openrouter;
pub mod parser;
pub mod prompts;
pub mod retry;
pub mod router;

#[cfg(test)]
pub mod testing;

use self::anthropic::AnthropicProvider;
use self::gemini::GeminiProvider;
use self::openrouter::OpenRouterProvider;
use self::parser::{extract_question, parse_feedback, ParseError};
use self::retry::RetryPolicy;
use self::router::{ProviderRouter, RouterError};

/// Longest slice of an upstream error body kept in error messages.
const MAX_ERROR_BODY_CHARS: usize = 300;

/// Failure of a single provider call, tagged by retry eligibility.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    /// Timeout, connection failure, 5xx, rate limiting, empty or blocked output.
    #[error("transient error: {0}")]
    Transient(String),

    /// Bad credentials, malformed request, unsupported input.
    #[error("permanent error: {0}")]
    Permanent(String),
}

impl ProviderError {
    pub fn is_transient(&self) -> bool {
        matches!(self, ProviderError::Transient(_))
    }

    /// Classifies a non-success HTTP status. 408, 429 and 5xx are worth retrying.
    pub fn from_status(status: StatusCode, message: &str) -> Self {
        let detail = format!("HTTP {}: {}", status.as_u16(), truncate(message));
        if status == StatusCode::REQUEST_TIMEOUT
            || status == StatusCode::TOO_MANY_REQUESTS
            || status.is_server_error()
        {
            ProviderError::Transient(detail)
        } else {
            ProviderError::Permanent(detail)
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_builder() {
            ProviderError::Permanent(format!("invalid request: {e}"))
        } else {
            ProviderError::Transient(format!("transport error: {e}"))
        }
    }
}

/// A single text-generation backend.
///
/// Implement this to add a backend. The router only sees this trait, so adding
/// or removing a backend never touches routing code.
#[async_trait]
pub trait TextProvider: Send + Sync {
    /// Stable identity used in logs, health output and `ACTIVE_PROVIDERS`.
    fn name(&self) -> &str;

    async fn generate(&self, prompt: &str) -> Result<String, ProviderError>;
}

/// Error envelope shared by OpenRouter, Gemini and Anthropic: `{"error": {"message": ..}}`.
#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// Turns a non-success HTTP response into a tagged provider error.
pub(crate) async fn error_from_response(response: reqwest::Response) -> ProviderError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ApiErrorEnvelope>(&body)
        .map(|e| e.error.message)
        .unwrap_or(body);
    ProviderError::from_status(status, &message)
}

fn truncate(text: &str) -> String {
    text.chars().take(MAX_ERROR_BODY_CHARS).collect()
}

/// Service-level failure of a generation request.
#[derive(Debug, Error)]
pub enum AiError {
    #[error(transparent)]
    Router(#[from] RouterError),

    #[error("model output rejected after {attempts} attempts: {source}")]
    InvalidOutput { attempts: u32, source: ParseError },
}

/// The client used by the interview orchestrator and the feedback gate.
///
/// A parse failure means the model answered but not usefully, so the only remedy
/// is a fresh sample. Those re-samples follow the same bounded policy as the
/// per-provider retries. A router failure is returned immediately: every provider
/// has already been tried.
#[derive(Clone)]
pub struct AiClient {
    router: Arc<ProviderRouter>,
    policy: RetryPolicy,
}

impl AiClient {
    pub fn new(router: Arc<ProviderRouter>) -> Self {
        Self::with_policy(router, RetryPolicy::default())
    }

    pub fn with_policy(router: Arc<ProviderRouter>, policy: RetryPolicy) -> Self {
        Self { router, policy }
    }

    /// Generates a single interview question (plain-question mode).
    pub async fn generate_question(&self, prompt: &str) -> Result<String, AiError> {
        self.generate_validated(prompt, "question", extract_question)
            .await
    }

    /// Generates a schema-checked feedback object (structured mode).
    pub async fn generate_feedback(&self, prompt: &str) -> Result<NewFeedback, AiError> {
        self.generate_validated(prompt, "feedback", parse_feedback)
            .await
    }

    async fn generate_validated<T, F>(
        &self,
        prompt: &str,
        kind: &str,
        parse: F,
    ) -> Result<T, AiError>
    where
        F: Fn(&str) -> Result<T, ParseError>,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            let raw = self.router.generate(prompt).await?;
            attempt += 1;

            let err = match parse(&raw) {
                Ok(value) => {
                    debug!("Parsed {kind} on attempt {attempt}");
                    return Ok(value);
                }
                Err(err) => err,
            };

            match &err {
                ParseError::SchemaViolation(detail) => {
                    warn!("Attempt {attempt}/{max_attempts}: {kind} output violated schema: {detail}")
                }
                other => warn!("Attempt {attempt}/{max_attempts}: unusable {kind} output: {other}"),
            }

            if attempt >= max_attempts {
                return Err(AiError::InvalidOutput {
                    attempts: attempt,
                    source: err,
                });
            }

            tokio::time::sleep(self.policy.delay_after(attempt - 1)).await;
        }
    }
}

/// Builds the provider router from `ACTIVE_PROVIDERS`, in declared priority order.
pub fn build_provider_router(config: &Config) -> Result<ProviderRouter> {
    let client = Client::builder()
        .timeout(Duration::from_secs(config.provider_timeout_secs))
        .build()
        .context("Failed to build HTTP client")?;

    let mut providers: Vec<Arc<dyn TextProvider>> = Vec::new();
    for name in &config.active_providers {
        let provider: Arc<dyn TextProvider> = match name.as_str() {
            openrouter::PROVIDER_NAME => Arc::new(OpenRouterProvider::new(
                client.clone(),
                require_key(&config.openrouter_api_key, "OPENROUTER_API_KEY")?,
                config.openrouter_model.clone(),
            )),
            gemini::PROVIDER_NAME => Arc::new(GeminiProvider::new(
                client.clone(),
                require_key(&config.gemini_api_key, "GEMINI_API_KEY")?,
                config.gemini_model.clone(),
            )),
            anthropic::PROVIDER_NAME => Arc::new(AnthropicProvider::new(
                client.clone(),
                require_key(&config.anthropic_api_key, "ANTHROPIC_API_KEY")?,
                config.anthropic_model.clone(),
            )),
            other => bail!("Unknown provider '{other}' in ACTIVE_PROVIDERS"),
        };
        providers.push(provider);
    }

    if providers.is_empty() {
        bail!("ACTIVE_PROVIDERS must name at least one provider");
    }

    Ok(ProviderRouter::new(providers, RetryPolicy::default()))
}

fn require_key(value: &Option<String>, var: &str) -> Result<String> {
    value
        .clone()
        .with_context(|| format!("Provider is active but '{var}' is not set"))
}
