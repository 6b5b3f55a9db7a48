//! Conversation sessions against OpenAI-compatible chat servers.
//!
//! A [`ConversationManager`] owns one session: its ordered message log and
//! the configuration used for the next turn. Completions come from any
//! [`CompletionProvider`]; [`OpenAiClient`] talks to OpenAI and to local
//! servers such as LM Studio.

pub mod config;
pub mod error;
pub mod provider;
pub mod session;

pub use config::AppConfig;
pub use error::{ChatError, ConfigError, ProviderError, ValidationError};
pub use provider::{CompletionProvider, CompletionRequest, FragmentStream, OpenAiClient};
pub use session::{
    Configuration, ConfigurationUpdate, ContextWindow, ConversationManager, Message, ModelCatalog, Role,
};
