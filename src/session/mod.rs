//! Per-session conversation state and the turn-taking around it.

pub mod configuration;
pub mod conversation_state;
pub mod history;
pub mod manager;
pub mod message;

pub use configuration::{Configuration, ConfigurationUpdate, ModelCatalog};
pub use conversation_state::{ConversationState, ConversationStats};
pub use history::ContextWindow;
pub use manager::ConversationManager;
pub use message::{Message, Role};
