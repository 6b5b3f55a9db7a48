use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use futures::stream;
use lmchat::provider::{CompletionRequest, FragmentStream};
use lmchat::{
    ChatError, CompletionProvider, Configuration, ConfigurationUpdate, ContextWindow, ConversationManager,
    ModelCatalog, ProviderError, Role, ValidationError,
};

enum Reply {
    Text(&'static str),
    Fragments(Vec<Result<&'static str, ProviderError>>),
    Fail(ProviderError),
}

/// Plays back queued replies and records every request it receives.
#[derive(Default)]
struct ScriptedProvider {
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<CompletionRequest>>,
    models: Vec<String>,
}

impl ScriptedProvider {
    fn new(replies: Vec<Reply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            ..Self::default()
        }
    }

    fn next_reply(&self, request: &CompletionRequest) -> Reply {
        self.requests.lock().unwrap().push(request.clone());
        self.replies.lock().unwrap().pop_front().unwrap_or(Reply::Text("ok"))
    }

    fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionProvider for ScriptedProvider {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError> {
        match self.next_reply(request) {
            Reply::Text(text) => Ok(text.to_string()),
            Reply::Fragments(parts) => parts.into_iter().map(|p| p.map(str::to_string)).collect(),
            Reply::Fail(e) => Err(e),
        }
    }

    async fn stream(&self, request: &CompletionRequest) -> Result<FragmentStream, ProviderError> {
        let parts = match self.next_reply(request) {
            Reply::Text(text) => vec![Ok(text)],
            Reply::Fragments(parts) => parts,
            Reply::Fail(e) => return Err(e),
        };
        let owned: Vec<_> = parts.into_iter().map(|p| p.map(str::to_string)).collect();
        Ok(Box::pin(stream::iter(owned)))
    }

    async fn list_models(&self) -> Result<Vec<String>, ProviderError> {
        if self.models.is_empty() {
            Err(ProviderError::Network("connection refused".into()))
        } else {
            Ok(self.models.clone())
        }
    }
}

fn catalog() -> ModelCatalog {
    ModelCatalog::new(["local-model", "gpt-4o-mini"]).unwrap()
}

fn session(replies: Vec<Reply>) -> ConversationManager<ScriptedProvider> {
    ConversationManager::new(ScriptedProvider::new(replies), Configuration::default(), catalog()).unwrap()
}

#[tokio::test]
async fn history_grows_two_per_success_and_one_per_failure() {
    let mut manager = session(vec![
        Reply::Text("first"),
        Reply::Fail(ProviderError::RateLimited),
        Reply::Text("second"),
        Reply::Fail(ProviderError::Timeout),
        Reply::Text("third"),
    ]);

    let mut succeeded = 0;
    let mut failed = 0;
    for text in ["a", "b", "c", "d", "e"] {
        match manager.submit(text).await {
            Ok(_) => succeeded += 1,
            Err(_) => failed += 1,
        }
    }

    assert_eq!((succeeded, failed), (3, 2));
    assert_eq!(manager.history().len(), 2 * succeeded + failed);
}

#[tokio::test]
async fn clear_empties_history_and_keeps_configuration() {
    let mut manager = session(vec![]);
    manager
        .update_configuration(ConfigurationUpdate::default().temperature(1.5).model("gpt-4o-mini"))
        .unwrap();
    manager.submit("hello").await.unwrap();
    let before = manager.configuration().clone();

    manager.clear();

    assert!(manager.history().is_empty());
    assert_eq!(manager.configuration(), &before);

    manager.clear();
    assert!(manager.history().is_empty());
}

#[tokio::test]
async fn out_of_range_temperature_leaves_configuration_unchanged() {
    let mut manager = session(vec![]);
    let before = manager.configuration().clone();

    let err = manager
        .update_configuration(ConfigurationUpdate::default().temperature(3.0))
        .unwrap_err();

    assert_eq!(err, ValidationError::TemperatureOutOfRange(3.0));
    assert_eq!(manager.configuration(), &before);
    assert_eq!(manager.configuration().temperature.to_bits(), before.temperature.to_bits());
}

#[tokio::test]
async fn unsupported_model_is_rejected() {
    let mut manager = session(vec![]);
    let err = manager
        .update_configuration(ConfigurationUpdate::default().model("gpt-9000"))
        .unwrap_err();

    assert!(matches!(err, ValidationError::UnsupportedModel { .. }));
    assert_eq!(manager.configuration().model, "local-model");
}

#[tokio::test]
async fn updated_temperature_is_used_on_next_turn() {
    let mut manager = session(vec![]);
    manager.submit("before").await.unwrap();
    manager
        .update_configuration(ConfigurationUpdate::default().temperature(0.5))
        .unwrap();
    manager.submit("hi").await.unwrap();

    let requests = manager.provider().requests();
    assert_eq!(requests[0].temperature, Configuration::default().temperature);
    assert_eq!(requests[1].temperature, 0.5);
}

#[tokio::test]
async fn system_message_change_applies_forward_only() {
    let mut manager = session(vec![]);
    manager.submit("one").await.unwrap();
    manager
        .update_configuration(ConfigurationUpdate::default().system_message("Answer in French."))
        .unwrap();
    manager.submit("two").await.unwrap();

    let requests = manager.provider().requests();
    assert_eq!(requests[0].system_message(), Some(Configuration::default().system_message.as_str()));
    assert_eq!(requests[1].system_message(), Some("Answer in French."));
    // earlier turns are resent verbatim
    assert_eq!(requests[1].messages[1].content, "one");
    assert_eq!(requests[1].messages[2].content, "ok");
}

#[tokio::test]
async fn empty_input_is_a_validation_error() {
    let mut manager = session(vec![]);
    manager.submit("kept").await.unwrap();

    for text in ["", "   ", "\n\t"] {
        let err = manager.submit(text).await.unwrap_err();
        assert_eq!(err, ChatError::Validation(ValidationError::EmptyInput));
    }

    assert_eq!(manager.history().len(), 2);
    assert_eq!(manager.provider().requests().len(), 1);
}

#[tokio::test]
async fn provider_failure_keeps_only_the_user_message() {
    let mut manager = session(vec![Reply::Fail(ProviderError::Authentication)]);

    let err = manager.submit("hello").await.unwrap_err();

    assert!(err.is_provider());
    assert!(!err.is_validation());
    assert_eq!(err, ChatError::Provider(ProviderError::Authentication));

    let history = manager.history();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].role, Role::User);
    assert_eq!(history[0].content, "hello");
}

#[tokio::test]
async fn streamed_fragments_fold_in_arrival_order() {
    let mut manager = session(vec![Reply::Fragments(vec![Ok("The "), Ok("quick "), Ok("fox")])]);
    let mut seen = Vec::new();

    let message = manager
        .submit_streaming("tell me", |fragment| seen.push(fragment.to_string()))
        .await
        .unwrap();

    assert_eq!(message.role, Role::Assistant);
    assert_eq!(message.content, "The quick fox");
    assert_eq!(seen, ["The ", "quick ", "fox"]);
    assert_eq!(manager.history().len(), 2);
}

#[tokio::test]
async fn mid_stream_failure_discards_partial_reply() {
    let mut manager = session(vec![Reply::Fragments(vec![
        Ok("partial"),
        Err(ProviderError::Network("reset by peer".into())),
        Ok("never"),
    ])]);
    let mut seen = Vec::new();

    let err = manager
        .submit_streaming("hello", |fragment| seen.push(fragment.to_string()))
        .await
        .unwrap_err();

    assert!(err.is_provider());
    assert_eq!(seen, ["partial"]);
    assert_eq!(manager.history().len(), 1);
    assert_eq!(manager.history()[0].content, "hello");
}

#[tokio::test]
async fn stream_without_content_is_a_provider_error() {
    let mut manager = session(vec![Reply::Fragments(vec![])]);

    let err = manager.submit_streaming("hi", |_| {}).await.unwrap_err();

    assert!(matches!(err, ChatError::Provider(ProviderError::MalformedResponse(_))));
    assert_eq!(manager.history().len(), 1);
    assert_eq!(manager.history()[0].role, Role::User);
}

#[tokio::test]
async fn stream_that_fails_to_start_keeps_user_message() {
    let mut manager = session(vec![Reply::Fail(ProviderError::ModelNotFound("nope".into()))]);

    let err = manager.submit_streaming("hello", |_| {}).await.unwrap_err();

    assert!(matches!(err, ChatError::Provider(ProviderError::ModelNotFound(_))));
    assert_eq!(manager.history().len(), 1);
}

#[tokio::test]
async fn context_window_evicts_oldest_from_requests_only() {
    let mut manager = session(vec![]).with_context_window(ContextWindow::default().with_max_messages(3));

    for text in ["one", "two", "three"] {
        manager.submit(text).await.unwrap();
    }

    let last = manager.provider().requests().pop().unwrap();
    let contents: Vec<_> = last.messages.iter().map(|m| m.content.as_str()).collect();
    let system = Configuration::default().system_message;
    assert_eq!(contents, [system.as_str(), "two", "ok", "three"]);
    assert_eq!(manager.history().len(), 6);
}

#[tokio::test]
async fn refresh_models_replaces_catalog_but_not_active_model() {
    let provider = ScriptedProvider {
        models: vec!["qwen2.5-7b-instruct".into(), "llama-3.1-8b".into()],
        ..ScriptedProvider::default()
    };
    let mut manager = ConversationManager::new(provider, Configuration::default(), catalog()).unwrap();

    let models = manager.refresh_models().await.unwrap().models().to_vec();

    assert_eq!(models, ["qwen2.5-7b-instruct", "llama-3.1-8b", "local-model"]);
    assert_eq!(manager.configuration().model, "local-model");
    manager
        .update_configuration(ConfigurationUpdate::default().model("local-model").temperature(0.3))
        .unwrap();
    assert_eq!(manager.configuration().temperature, 0.3);
    manager
        .update_configuration(ConfigurationUpdate::default().model("llama-3.1-8b"))
        .unwrap();
    assert_eq!(manager.configuration().model, "llama-3.1-8b");
}

#[tokio::test]
async fn failed_refresh_keeps_catalog() {
    let mut manager = session(vec![]);

    let err = manager.refresh_models().await.unwrap_err();

    assert!(matches!(err, ProviderError::Network(_)));
    assert_eq!(manager.catalog(), &catalog());
}

#[tokio::test]
async fn stats_follow_the_log() {
    let mut manager = session(vec![Reply::Text("two words")]);
    manager.submit("three short words").await.unwrap();

    let stats = manager.stats();
    assert_eq!(stats.total_messages, 2);
    assert_eq!(stats.user_messages, 1);
    assert_eq!(stats.assistant_messages, 1);
    assert_eq!(stats.total_words, 5);
}
