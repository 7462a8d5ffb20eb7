// Feedback gate: exactly one evaluation per session.
// All LLM calls go through llm_client::AiClient.

pub mod gate;
pub mod handlers;
pub mod prompts;
