//! Sigma - voice assistant toolkit
//!
//! This library provides the building blocks of the Sigma assistant:
//! - LLM endpoint registry parsed from `llms.txt`
//! - HTTP LLM client with response text normalisation
//! - Whisper speech-to-text client and a local formant synthesiser
//! - A speech → LLM → speech conversation loop
//! - A pre-commit diff scanner for leaked secrets
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │            push-to-talk / audio file         │
//! └──────────────────────┬───────────────────────┘
//!                        │
//! ┌──────────────────────▼───────────────────────┐
//! │  voice::stt  →  llm (registry, extract)  →   │
//! │                 voice::tts                   │
//! └──────────────────────────────────────────────┘
//! ```

pub mod auth;
pub mod config;
pub mod conversation;
pub mod error;
mod http;
pub mod llm;
pub mod registry;
pub mod scan;
pub mod stats;
pub mod voice;

pub use config::Config;
pub use conversation::{
    ConversationComponents, ConversationOptions, ConversationResult, run_conversation,
};
pub use error::{Error, Result};
pub use llm::{LlmResponse, LlmRouter, extract_text, extract_text_value, query_llm};
pub use registry::{Endpoint, get_llm_endpoints, resolve_llm_endpoint};
