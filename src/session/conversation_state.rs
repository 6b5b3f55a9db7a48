use super::configuration::Configuration;
use super::message::{Message, Role};

/// Counts over the message log, shown by `/stats`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConversationStats {
    pub total_messages: usize,
    pub user_messages: usize,
    pub assistant_messages: usize,
    pub total_words: usize,
}

/// Per-session state: the message log and the active configuration.
#[derive(Debug, Clone, Default)]
pub struct ConversationState {
    messages: Vec<Message>,
    configuration: Configuration,
}

impl ConversationState {
    pub fn new(configuration: Configuration) -> Self {
        Self {
            messages: Vec::new(),
            configuration,
        }
    }

    pub fn add_user_message(&mut self, message: &str) {
        self.messages.push(Message::user(message));
    }

    pub fn add_assistant_message(&mut self, message: &str) {
        self.messages.push(Message::assistant(message));
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    pub(crate) fn set_configuration(&mut self, configuration: Configuration) {
        self.configuration = configuration;
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn stats(&self) -> ConversationStats {
        self.messages
            .iter()
            .fold(ConversationStats::default(), |mut stats, message| {
                stats.total_messages += 1;
                match message.role {
                    Role::User => stats.user_messages += 1,
                    Role::Assistant => stats.assistant_messages += 1,
                    Role::System => {}
                }
                stats.total_words += message.content.split_whitespace().count();
                stats
            })
    }
}
