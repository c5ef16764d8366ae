//! Chat-Completion Client
//!
//! The conversation engine and the provisioners only ever need one capability:
//! send an ordered list of role-tagged messages plus sampling parameters,
//! receive one generated text back. The [`CompletionClient`] trait captures
//! exactly that shape, and [`OpenAICompatibleClient`] implements it for any
//! OpenAI-compatible API.

use async_openai::{
    Client,
    config::OpenAIConfig,
    error::OpenAIError,
    types::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
};
use async_trait::async_trait;
use tracing::debug;

/// The role a message plays in a completion request payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    /// A context-setting instruction (persona embodiment, provisioning task).
    System,
    /// Conversational context: the topic seed or a prior reply.
    User,
}

/// One role-tagged content unit of a completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

/// Declared failure modes of the remote completion capability.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CompletionError {
    #[error("completion request timed out")]
    Timeout,
    #[error("completion service error: {0}")]
    Service(String),
    #[error("unexpected completion failure: {0}")]
    Other(String),
}

/// A generic client for a remote text-completion service.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Makes a single, non-streaming completion call and returns the
    /// generated text. `max_tokens` is an advisory ceiling passed through to
    /// the service, not enforced locally.
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String, CompletionError>;
}

/// An implementation of `CompletionClient` for any OpenAI-compatible API.
pub struct OpenAICompatibleClient {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAICompatibleClient {
    /// Creates a new client for an OpenAI-compatible service.
    ///
    /// # Arguments
    ///
    /// * `config` - The configuration for the OpenAI client, including API key and base URL.
    /// * `model` - The specific model identifier to use for chat completions (e.g., "gpt-4o").
    pub fn new(config: OpenAIConfig, model: String) -> Self {
        Self {
            client: Client::with_config(config),
            model,
        }
    }
}

#[async_trait]
impl CompletionClient for OpenAICompatibleClient {
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String, CompletionError> {
        debug!(
            model = %self.model,
            payload = messages.len(),
            temperature,
            max_tokens,
            "sending completion request"
        );

        let messages: Vec<ChatCompletionRequestMessage> = messages
            .into_iter()
            .map(to_request_message)
            .collect::<Result<_, _>>()
            .map_err(classify)?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .temperature(temperature)
            .max_completion_tokens(max_tokens)
            .build()
            .map_err(classify)?;

        let response = self.client.chat().create(request).await.map_err(classify)?;

        response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| {
                CompletionError::Other("completion response contained no message content".into())
            })
    }
}

fn to_request_message(message: ChatMessage) -> Result<ChatCompletionRequestMessage, OpenAIError> {
    Ok(match message.role {
        ChatRole::System => ChatCompletionRequestSystemMessageArgs::default()
            .content(message.content)
            .build()?
            .into(),
        ChatRole::User => ChatCompletionRequestUserMessageArgs::default()
            .content(message.content)
            .build()?
            .into(),
    })
}

/// Collapses the transport-level error surface into the three declared
/// failure modes of the completion capability.
fn classify(err: OpenAIError) -> CompletionError {
    match err {
        OpenAIError::Reqwest(e) if e.is_timeout() => CompletionError::Timeout,
        OpenAIError::Reqwest(e) => CompletionError::Service(e.to_string()),
        OpenAIError::ApiError(e) => CompletionError::Service(e.message),
        other => CompletionError::Other(other.to_string()),
    }
}
