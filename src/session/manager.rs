use futures::StreamExt;
use tracing::{debug, error, info, warn};

use super::configuration::{Configuration, ConfigurationUpdate, ModelCatalog};
use super::conversation_state::{ConversationState, ConversationStats};
use super::history::ContextWindow;
use super::message::Message;
use crate::error::{ChatError, ProviderError, ValidationError};
use crate::provider::{CompletionProvider, CompletionRequest};

/// Owns one session's conversation and mediates each turn with the provider.
///
/// Turns take `&mut self`, so a session can never run two turns at once.
pub struct ConversationManager<P> {
    provider: P,
    state: ConversationState,
    catalog: ModelCatalog,
    window: ContextWindow,
}

impl<P: CompletionProvider> ConversationManager<P> {
    /// Starts a session with an empty log. `configuration` must be valid for
    /// `catalog`; its model is accepted into the catalog if missing.
    pub fn new(
        provider: P,
        configuration: Configuration,
        mut catalog: ModelCatalog,
    ) -> Result<Self, ValidationError> {
        super::configuration::validate_temperature(configuration.temperature)?;
        catalog.insert(configuration.model.clone());

        Ok(Self {
            provider,
            state: ConversationState::new(configuration),
            catalog,
            window: ContextWindow::unbounded(),
        })
    }

    #[must_use]
    pub fn with_context_window(mut self, window: ContextWindow) -> Self {
        self.window = window;
        self
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn history(&self) -> &[Message] {
        self.state.messages()
    }

    pub fn configuration(&self) -> &Configuration {
        self.state.configuration()
    }

    pub fn catalog(&self) -> &ModelCatalog {
        &self.catalog
    }

    pub fn context_window(&self) -> ContextWindow {
        self.window
    }

    pub fn stats(&self) -> ConversationStats {
        self.state.stats()
    }

    /// Empties the log. Configuration is kept.
    pub fn clear(&mut self) {
        self.state.clear();
        info!("Conversation cleared");
    }

    /// Applies the supplied fields, or none of them if any is invalid.
    pub fn update_configuration(&mut self, update: ConfigurationUpdate) -> Result<(), ValidationError> {
        match self.state.configuration().merged(&update, &self.catalog) {
            Ok(next) => {
                info!(
                    model = %next.model,
                    temperature = next.temperature,
                    "Configuration updated"
                );
                self.state.set_configuration(next);
                Ok(())
            }
            Err(e) => {
                warn!("Rejected configuration update: {}", e);
                Err(e)
            }
        }
    }

    /// Replaces the model catalog with what the provider currently serves.
    /// The active model stays selectable. On failure or an empty listing the
    /// catalog is left as it was.
    pub async fn refresh_models(&mut self) -> Result<&ModelCatalog, ProviderError> {
        let listed = self.provider.list_models().await?;
        match ModelCatalog::new(listed) {
            Ok(mut catalog) => {
                catalog.insert(self.state.configuration().model.clone());
                info!("Model catalog refreshed with {} models", catalog.models().len());
                self.catalog = catalog;
            }
            Err(_) => warn!("Provider listed no models, keeping current catalog"),
        }
        Ok(&self.catalog)
    }

    /// Runs one turn and returns the appended assistant message.
    pub async fn submit(&mut self, user_text: &str) -> Result<&Message, ChatError> {
        let request = self.begin_turn(user_text)?;

        match self.provider.complete(&request).await {
            Ok(reply) => Ok(self.finish_turn(&reply)),
            Err(e) => Err(self.fail_turn(e)),
        }
    }

    /// Runs one turn with a streamed reply. `on_fragment` sees each fragment
    /// in arrival order; the concatenation becomes one assistant message once
    /// the stream ends. Any stream error discards the partial reply.
    pub async fn submit_streaming<F>(&mut self, user_text: &str, mut on_fragment: F) -> Result<&Message, ChatError>
    where
        F: FnMut(&str),
    {
        let request = self.begin_turn(user_text)?;

        let mut fragments = match self.provider.stream(&request).await {
            Ok(fragments) => fragments,
            Err(e) => return Err(self.fail_turn(e)),
        };

        let mut reply = String::new();
        while let Some(fragment) = fragments.next().await {
            match fragment {
                Ok(text) => {
                    on_fragment(&text);
                    reply.push_str(&text);
                }
                Err(e) => return Err(self.fail_turn(e)),
            }
        }

        if reply.is_empty() {
            let e = ProviderError::MalformedResponse("stream ended without any content".to_string());
            return Err(self.fail_turn(e));
        }

        Ok(self.finish_turn(&reply))
    }

    fn begin_turn(&mut self, user_text: &str) -> Result<CompletionRequest, ChatError> {
        if user_text.trim().is_empty() {
            return Err(ValidationError::EmptyInput.into());
        }

        self.state.add_user_message(user_text);

        let config = self.state.configuration();
        let selected = self.window.select(self.state.messages());
        if selected.len() < self.state.messages().len() {
            debug!(
                "Context window dropped {} oldest messages",
                self.state.messages().len() - selected.len()
            );
        }

        Ok(CompletionRequest::new(
            &config.model,
            config.temperature,
            &config.system_message,
            selected,
        ))
    }

    fn finish_turn(&mut self, reply: &str) -> &Message {
        self.state.add_assistant_message(reply);
        info!(
            messages = self.state.messages().len(),
            "Turn completed with {} characters",
            reply.len()
        );
        // the log is non-empty: a message was just pushed
        &self.state.messages()[self.state.messages().len() - 1]
    }

    fn fail_turn(&self, e: ProviderError) -> ChatError {
        error!("Provider failed during turn: {}", e);
        e.into()
    }
}
