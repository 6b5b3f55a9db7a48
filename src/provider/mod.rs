//! The completion provider seam.
//!
//! A provider is stateless across calls: every request carries the full
//! message list the model should see, system instruction first.

pub mod openai;
pub mod sse;

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use serde::Serialize;

use crate::error::ProviderError;
use crate::session::{Message, Role};

pub use openai::OpenAiClient;

/// Incremental text fragments of one completion, in arrival order. Ends when
/// the completion is done.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<String, ProviderError>> + Send>>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestMessage {
    pub role: &'static str,
    pub content: String,
}

impl From<&Message> for RequestMessage {
    fn from(message: &Message) -> Self {
        Self {
            role: message.role.as_str(),
            content: message.content.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub model: String,
    pub temperature: f32,
    pub messages: Vec<RequestMessage>,
}

impl CompletionRequest {
    /// Builds a request from the configured system instruction followed by
    /// `history` in order. A blank instruction is omitted.
    pub fn new(model: &str, temperature: f32, system_message: &str, history: &[Message]) -> Self {
        let mut messages = Vec::with_capacity(history.len() + 1);
        if !system_message.trim().is_empty() {
            messages.push(RequestMessage {
                role: Role::System.as_str(),
                content: system_message.to_string(),
            });
        }
        messages.extend(history.iter().map(RequestMessage::from));

        Self {
            model: model.to_string(),
            temperature,
            messages,
        }
    }

    pub fn system_message(&self) -> Option<&str> {
        self.messages
            .first()
            .filter(|m| m.role == Role::System.as_str())
            .map(|m| m.content.as_str())
    }
}

#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Returns the whole assistant reply.
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError>;

    /// Starts a completion and returns its fragments as they arrive.
    async fn stream(&self, request: &CompletionRequest) -> Result<FragmentStream, ProviderError>;

    /// Model identifiers the provider currently serves.
    async fn list_models(&self) -> Result<Vec<String>, ProviderError>;
}
