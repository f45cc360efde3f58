//! OpenAI-compatible chat completions provider
//!
//! Posts the conversation to `{api_base}/chat/completions` with
//! `stream: true` and decodes the event-stream body on a spawned task.

use crate::config::OpenAiConfig;
use crate::error::{CirError, Result};
use crate::providers::base::{ChatProvider, ServiceMessage, StreamEvent};
use crate::providers::sse::CompletionStreamDecoder;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, RequestBuilder};
use serde::Serialize;
use std::time::Duration;
use tokio::sync::mpsc;

/// Buffered events between the HTTP task and the consumer
const EVENT_BUFFER: usize = 64;

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ServiceMessage],
    stream: bool,
}

/// Streaming provider for OpenAI-compatible endpoints
#[derive(Debug, Clone)]
pub struct OpenAiProvider {
    client: Client,
    config: OpenAiConfig,
}

impl OpenAiProvider {
    /// Create a new provider
    ///
    /// The API key is not read here; it is looked up in the environment
    /// variable named by `config.api_key_env` for every request.
    ///
    /// # Errors
    ///
    /// Returns error if HTTP client initialization fails
    ///
    /// # Examples
    ///
    /// ```
    /// use cir::config::OpenAiConfig;
    /// use cir::providers::OpenAiProvider;
    ///
    /// let provider = OpenAiProvider::new(OpenAiConfig::default());
    /// assert!(provider.is_ok());
    /// ```
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .user_agent(concat!("cir/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| CirError::Config(format!("Failed to create HTTP client: {}", e)))?;

        tracing::info!(
            "Initialized OpenAI provider: model={}, api_base={}",
            config.model,
            config.api_base
        );

        Ok(Self { client, config })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.api_base.trim_end_matches('/')
        )
    }

    fn api_key(&self) -> Result<String> {
        match std::env::var(&self.config.api_key_env) {
            Ok(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(CirError::MissingCredentials(format!(
                "{} is not set",
                self.config.api_key_env
            ))
            .into()),
        }
    }
}

#[async_trait]
impl ChatProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn stream_chat(
        &self,
        messages: &[ServiceMessage],
    ) -> Result<mpsc::Receiver<StreamEvent>> {
        let api_key = self.api_key()?;
        let body = ChatCompletionRequest {
            model: &self.config.model,
            messages,
            stream: true,
        };

        tracing::debug!(
            "Sending chat completion request: {} messages, model={}",
            messages.len(),
            self.config.model
        );

        let request = self
            .client
            .post(self.endpoint())
            .bearer_auth(api_key)
            .header("Accept", "text/event-stream")
            .json(&body);

        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        tokio::spawn(pump_events(request, tx));
        Ok(rx)
    }
}

/// Send the request and forward decoded events until the first terminal one
async fn pump_events(request: RequestBuilder, tx: mpsc::Sender<StreamEvent>) {
    let response = match request.send().await {
        Ok(response) => response,
        Err(e) => {
            tracing::error!("Chat completion request failed: {}", e);
            let _ = tx
                .send(StreamEvent::Error(CirError::Network(format!(
                    "request failed: {}",
                    e
                ))))
                .await;
            return;
        }
    };

    let status = response.status();
    if !status.is_success() {
        let error_text = response.text().await.unwrap_or_default();
        tracing::error!("Service returned error {}: {}", status, error_text);
        let _ = tx
            .send(StreamEvent::Error(CirError::Network(format!(
                "service returned {}: {}",
                status, error_text
            ))))
            .await;
        return;
    }

    let mut decoder = CompletionStreamDecoder::new();
    let mut body = response.bytes_stream();

    while let Some(piece) = body.next().await {
        let events = match piece {
            Ok(bytes) => decoder.feed(&bytes),
            Err(e) => {
                tracing::error!("Response stream interrupted: {}", e);
                vec![StreamEvent::Error(CirError::Network(format!(
                    "stream interrupted: {}",
                    e
                )))]
            }
        };
        if !forward(&tx, events).await {
            return;
        }
    }

    forward(&tx, decoder.finish()).await;
}

/// Forward events in order; false once a terminal event was sent or the
/// receiver is gone.
async fn forward(tx: &mpsc::Sender<StreamEvent>, events: Vec<StreamEvent>) -> bool {
    for event in events {
        let terminal = event.is_terminal();
        if tx.send(event).await.is_err() {
            tracing::debug!("Stream consumer dropped, stopping producer");
            return false;
        }
        if terminal {
            return false;
        }
    }
    true
}
