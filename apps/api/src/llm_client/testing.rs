//! Scripted in-process provider for tests. Never compiled into the binary.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::llm_client::{ProviderError, TextProvider};

pub fn ok(text: &str) -> Result<String, ProviderError> {
    Ok(text.to_string())
}

pub fn transient(message: &str) -> Result<String, ProviderError> {
    Err(ProviderError::Transient(message.to_string()))
}

pub fn permanent(message: &str) -> Result<String, ProviderError> {
    Err(ProviderError::Permanent(message.to_string()))
}

/// Replays queued results, then repeats `fallback` forever. Counts every call.
pub struct ScriptedProvider {
    name: String,
    script: Mutex<VecDeque<Result<String, ProviderError>>>,
    fallback: Result<String, ProviderError>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
    latency: Duration,
}

impl ScriptedProvider {
    pub fn always(name: &str, result: Result<String, ProviderError>) -> Arc<Self> {
        Self::scripted(name, Vec::new(), result)
    }

    pub fn scripted(
        name: &str,
        script: Vec<Result<String, ProviderError>>,
        fallback: Result<String, ProviderError>,
    ) -> Arc<Self> {
        Self::build(name, script, fallback, Duration::ZERO)
    }

    /// Like `always`, but each call takes `latency` (virtual time under `start_paused`).
    pub fn slow(
        name: &str,
        latency: Duration,
        result: Result<String, ProviderError>,
    ) -> Arc<Self> {
        Self::build(name, Vec::new(), result, latency)
    }

    fn build(
        name: &str,
        script: Vec<Result<String, ProviderError>>,
        fallback: Result<String, ProviderError>,
        latency: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            script: Mutex::new(script.into()),
            fallback,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
            latency,
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl TextProvider for ScriptedProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        let next = self.script.lock().unwrap().pop_front();
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        next.unwrap_or_else(|| self.fallback.clone())
    }
}
