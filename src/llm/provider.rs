//! Chat-completion transport

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::error::{CouncilError, Result};
use crate::llm::message::{Message, QueryResult};

/// Anything that can turn a model name plus messages into one completion
#[async_trait::async_trait]
pub trait ChatTransport: Send + Sync {
    async fn complete(
        &self,
        model: &str,
        messages: &[Message],
        timeout: Duration,
    ) -> Result<QueryResult>;

    fn name(&self) -> &str;
}

/// Where chat-completion requests are sent
#[derive(Debug, Clone, PartialEq)]
pub struct Endpoint {
    /// Full URL of the chat completions route
    pub url: String,

    /// Bearer credential, if the endpoint wants one
    pub api_key: Option<String>,
}

/// OpenAI-compatible chat completions provider (LiteLLM proxy, OpenRouter)
pub struct ChatCompletionsProvider {
    client: Client,
    name: String,
    endpoint: Option<Endpoint>,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Deserialize)]
struct ChatMessageResponse {
    content: Option<String>,
    #[serde(default)]
    reasoning_details: Option<Value>,
}

impl ChatCompletionsProvider {
    /// A provider without an endpoint is still constructible; every request
    /// it makes fails with [`CouncilError::MissingEndpoint`].
    pub fn new(name: impl Into<String>, endpoint: Option<Endpoint>) -> Self {
        Self {
            client: Client::new(),
            name: name.into(),
            endpoint,
        }
    }
}

#[async_trait::async_trait]
impl ChatTransport for ChatCompletionsProvider {
    async fn complete(
        &self,
        model: &str,
        messages: &[Message],
        timeout: Duration,
    ) -> Result<QueryResult> {
        let endpoint = self
            .endpoint
            .as_ref()
            .ok_or_else(|| CouncilError::MissingEndpoint(self.name.clone()))?;

        let request = ChatRequest { model, messages };

        debug!(model, url = %endpoint.url, messages = messages.len(), "Sending chat completion");

        let mut builder = self
            .client
            .post(&endpoint.url)
            .timeout(timeout)
            .header("Content-Type", "application/json")
            .json(&request);
        if let Some(key) = &endpoint.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CouncilError::Provider {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        let parsed: ChatResponse = serde_json::from_str(&body)
            .map_err(|e| CouncilError::MalformedResponse(e.to_string()))?;

        let message = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message)
            .ok_or_else(|| CouncilError::MalformedResponse("response has no choices".to_string()))?;

        Ok(QueryResult {
            content: message.content,
            reasoning_details: message.reasoning_details,
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}
