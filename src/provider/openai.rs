use std::collections::VecDeque;
use std::io;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Buf;
use futures::stream::{self, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::io::StreamReader;
use tracing::{debug, error, info};

use super::sse::{SseDecoder, SseEvent};
use super::{CompletionProvider, CompletionRequest, FragmentStream, RequestMessage};
use crate::error::ProviderError;

/// Client for servers speaking the OpenAI chat-completions API, including
/// local ones such as LM Studio.
pub struct OpenAiClient {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct ChatCompletionBody<'a> {
    model: &'a str,
    messages: &'a [RequestMessage],
    temperature: f32,
    stream: bool,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct StreamChunk {
    choices: Vec<StreamChoice>,
}

#[derive(Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: Delta,
}

#[derive(Default, Deserialize)]
struct Delta {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ModelList {
    data: Vec<ModelEntry>,
}

#[derive(Deserialize)]
struct ModelEntry {
    id: String,
}

impl OpenAiClient {
    pub fn new(api_key: impl Into<String>, base_url: &str, timeout: Duration) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            api_key: api_key.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/v1/{}", self.base_url, path)
    }

    async fn post_completion(
        &self,
        request: &CompletionRequest,
        stream: bool,
    ) -> Result<reqwest::Response, ProviderError> {
        let body = ChatCompletionBody {
            model: &request.model,
            messages: &request.messages,
            temperature: request.temperature,
            stream,
        };

        if tracing::enabled!(tracing::Level::DEBUG) {
            if let Ok(pretty) = serde_json::to_string_pretty(&body) {
                debug!("Sending chat completion request: {}", pretty);
            }
        }

        let response = self
            .client
            .post(self.endpoint("chat/completions"))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        check_status(response).await
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    error!("Provider request failed with status {}: {}", status, body);
    Err(ProviderError::from_status(status.as_u16(), body))
}

#[async_trait]
impl CompletionProvider for OpenAiClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError> {
        let response = self.post_completion(request, false).await?;
        completion_content(&response.text().await?)
    }

    async fn stream(&self, request: &CompletionRequest) -> Result<FragmentStream, ProviderError> {
        let response = self.post_completion(request, true).await?;
        let bytes = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| io::Error::new(io::ErrorKind::Other, e)));
        Ok(Box::pin(fragments(Box::pin(bytes))))
    }

    async fn list_models(&self) -> Result<Vec<String>, ProviderError> {
        let response = self
            .client
            .get(self.endpoint("models"))
            .bearer_auth(&self.api_key)
            .send()
            .await?;
        let models: ModelList = check_status(response).await?.json().await?;

        info!("Provider lists {} models", models.data.len());
        Ok(models.data.into_iter().map(|m| m.id).collect())
    }
}

struct FragmentState<L> {
    lines: L,
    decoder: SseDecoder,
    pending: VecDeque<Result<String, ProviderError>>,
    exhausted: bool,
}

impl<L> FragmentState<L> {
    fn queue(&mut self, event: SseEvent) {
        match event {
            SseEvent::Done => self.exhausted = true,
            SseEvent::Data(data) => match serde_json::from_str::<StreamChunk>(&data) {
                Ok(chunk) => {
                    let text = chunk
                        .choices
                        .into_iter()
                        .filter_map(|choice| choice.delta.content)
                        .filter(|content| !content.is_empty());
                    self.pending.extend(text.map(Ok));
                }
                Err(e) => {
                    self.pending
                        .push_back(Err(ProviderError::MalformedResponse(format!("{e}: {data}"))));
                    self.exhausted = true;
                }
            },
        }
    }
}

/// Pulls the assistant text out of a non-streamed completion body.
fn completion_content(body: &str) -> Result<String, ProviderError> {
    let parsed: ChatCompletionResponse =
        serde_json::from_str(body).map_err(|e| ProviderError::MalformedResponse(e.to_string()))?;

    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| ProviderError::MalformedResponse("response contained no message content".to_string()))
}

/// Recovers the transport error behind a failed body read.
fn read_error(e: io::Error) -> ProviderError {
    if e.kind() == io::ErrorKind::InvalidData {
        return ProviderError::MalformedResponse(e.to_string());
    }
    match e.into_inner().map(|inner| inner.downcast::<reqwest::Error>()) {
        Some(Ok(reqwest_error)) => (*reqwest_error).into(),
        Some(Err(other)) => ProviderError::Network(other.to_string()),
        None => ProviderError::Network("stream read failed".to_string()),
    }
}

/// Turns a chat-completions SSE body into text fragments. The stream ends at
/// `[DONE]`, at end of body, or after the first error.
fn fragments<S, B>(bytes: S) -> impl Stream<Item = Result<String, ProviderError>> + Send
where
    S: Stream<Item = io::Result<B>> + Unpin + Send + 'static,
    B: Buf + Send + 'static,
{
    let state = FragmentState {
        lines: BufReader::new(StreamReader::new(bytes)).lines(),
        decoder: SseDecoder::new(),
        pending: VecDeque::new(),
        exhausted: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.pending.pop_front() {
                return Some((item, state));
            }
            if state.exhausted {
                return None;
            }

            match state.lines.next_line().await {
                Ok(Some(line)) => {
                    if let Some(event) = state.decoder.push_line(&line) {
                        state.queue(event);
                    }
                }
                Ok(None) => {
                    if let Some(event) = state.decoder.finish() {
                        state.queue(event);
                    }
                    state.exhausted = true;
                }
                Err(e) => {
                    state.pending.push_back(Err(read_error(e)));
                    state.exhausted = true;
                }
            }
        }
    })
}
