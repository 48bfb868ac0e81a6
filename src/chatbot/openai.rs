//! Chat-completions client for OpenAI-compatible APIs.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Model used for every completion.
pub const MODEL: &str = "gpt-4o";

/// Upper bound on the length of a reply.
pub const MAX_TOKENS: u32 = 3000;

/// High temperature keeps replies playful.
pub const TEMPERATURE: f32 = 0.9;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// A remote chat-completion endpoint.
///
/// Failures are returned to the caller untouched; nothing here retries.
#[async_trait]
pub trait Completions: Send + Sync {
    async fn complete(&self, messages: &[Message]) -> Result<String, Error>;
}

pub struct Client {
    api_key: String,
    endpoint: String,
    http: reqwest::Client,
}

#[derive(Serialize)]
struct ApiRequest<'a> {
    model: &'static str,
    messages: Vec<ApiMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ApiMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ApiResponse {
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

impl Client {
    pub fn new(api_key: String, base_url: &str) -> Self {
        Self {
            api_key,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            http: reqwest::Client::new(),
        }
    }
}

fn build_request(messages: &[Message]) -> ApiRequest<'_> {
    ApiRequest {
        model: MODEL,
        messages: messages
            .iter()
            .map(|m| ApiMessage {
                role: m.role.as_str(),
                content: &m.content,
            })
            .collect(),
        max_tokens: MAX_TOKENS,
        temperature: TEMPERATURE,
    }
}

fn parse_response(body: &str) -> Result<String, Error> {
    let api_response: ApiResponse =
        serde_json::from_str(body).map_err(|e| Error::Parse(e.to_string()))?;

    api_response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or(Error::Empty)
}

#[async_trait]
impl Completions for Client {
    async fn complete(&self, messages: &[Message]) -> Result<String, Error> {
        let request = build_request(messages);
        debug!("Completion request with {} message(s)", messages.len());

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api(format!("{status}: {body}")));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        parse_response(&body)
    }
}

#[derive(Debug)]
pub enum Error {
    Http(String),
    Api(String),
    Parse(String),
    Empty,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Http(e) => write!(f, "HTTP error: {e}"),
            Error::Api(e) => write!(f, "API error: {e}"),
            Error::Parse(e) => write!(f, "Parse error: {e}"),
            Error::Empty => write!(f, "Empty response"),
        }
    }
}

impl std::error::Error for Error {}
