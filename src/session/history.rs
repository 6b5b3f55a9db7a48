//! Selection of the history sent with each provider request.
//!
//! By default every prior message is sent. When limits are set, the oldest
//! messages are evicted first: by count, then by total characters. The
//! newest message is always kept so the current turn reaches the provider.
//! Eviction only shapes the request; the session log is never touched.

use super::message::Message;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContextWindow {
    /// Maximum number of history messages per request.
    pub max_messages: Option<usize>,
    /// Maximum total characters of history content per request.
    pub max_chars: Option<usize>,
}

impl ContextWindow {
    pub const fn unbounded() -> Self {
        Self {
            max_messages: None,
            max_chars: None,
        }
    }

    #[must_use]
    pub const fn with_max_messages(mut self, max: usize) -> Self {
        self.max_messages = Some(max);
        self
    }

    #[must_use]
    pub const fn with_max_chars(mut self, max: usize) -> Self {
        self.max_chars = Some(max);
        self
    }

    pub fn is_unbounded(&self) -> bool {
        self.max_messages.is_none() && self.max_chars.is_none()
    }

    /// Returns the suffix of `messages` that fits the window.
    pub fn select<'a>(&self, messages: &'a [Message]) -> &'a [Message] {
        if messages.is_empty() {
            return messages;
        }

        let mut start = match self.max_messages {
            Some(max) => messages.len().saturating_sub(max.max(1)),
            None => 0,
        };

        if let Some(max_chars) = self.max_chars {
            let mut total: usize = messages[start..].iter().map(|m| m.content.chars().count()).sum();
            while total > max_chars && start + 1 < messages.len() {
                total -= messages[start].content.chars().count();
                start += 1;
            }
        }

        &messages[start..]
    }
}
