// Interview progression engine.
// All LLM calls go through llm_client::AiClient; no provider is called directly here.

pub mod handlers;
pub mod orchestrator;
pub mod progress;
pub mod prompts;
