//! # thot-provider
//!
//! AI provider abstraction layer for Thot.
//! Every backend implements [`ProviderAdapter`]; the [`Gateway`] picks one
//! per request by name.
//!
//! ## Features
//! - Normalized chat / code / project-structure generation
//! - Best-effort projection of [`ModelConfig`](thot_foundation::ModelConfig)
//!   onto each backend's request format
//! - Automatic retry with exponential backoff inside each adapter
//! - Four backends: OpenAI, Anthropic, Groq, Gemini

pub mod error;
pub mod gateway;
pub mod message;
pub mod project;
pub mod prompts;
pub mod providers;
pub mod retry;
pub mod r#trait;

// Core traits and types
pub use gateway::Gateway;
pub use message::{Message, MessageRole};
pub use project::{ProjectEntry, ProjectSpec};
pub use r#trait::ProviderAdapter;

// Error and retry
pub use error::{GatewayError, ProviderError};
pub use retry::RetryConfig;

// Provider implementations
pub use providers::anthropic::AnthropicAdapter;
pub use providers::gemini::GeminiAdapter;
pub use providers::groq::GroqAdapter;
pub use providers::openai::OpenAiAdapter;
