//! LLM endpoint client and response normalisation

mod client;
mod extract;

pub use client::{
    ConfiguredLlmRouter, DEFAULT_TIMEOUT, LlmClient, LlmQueryOptions, LlmRequest, LlmResponse,
    LlmRouter, prepare_payload, query_llm,
};
pub use extract::{extract_text, extract_text_value};
