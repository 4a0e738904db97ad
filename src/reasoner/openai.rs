use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{Reasoner, ReasonerError};

pub(super) fn default_base_url() -> String {
    "https://api.openai.com/v1".into()
}

pub(super) fn default_model() -> String {
    "gpt-4o".into()
}

pub(super) fn default_max_tokens() -> u32 {
    2000
}

pub(super) fn default_api_key_env() -> Option<String> {
    Some("OPENAI_API_KEY".into())
}

pub(super) fn default_timeout_secs() -> u64 {
    120
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// OpenAI-compatible chat completions client
#[derive(Debug, Clone)]
pub struct OpenAiReasoner {
    client: Client,
    base_url: String,
    model: String,
    max_tokens: u32,
    api_key: Option<String>,
}

impl OpenAiReasoner {
    pub fn new(
        base_url: &str,
        model: &str,
        max_tokens: u32,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ReasonerError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            max_tokens,
            api_key,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

/// First choice's content, trimmed
fn first_content(response: ChatResponse) -> Result<String, ReasonerError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
        .ok_or(ReasonerError::EmptyResponse)
}

#[async_trait]
impl Reasoner for OpenAiReasoner {
    async fn complete(&self, prompt: &str) -> Result<String, ReasonerError> {
        let request = ChatRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        let mut builder = self.client.post(self.endpoint()).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        tracing::debug!(model = %self.model, "sending chat completion");
        let response = builder.send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ReasonerError::Api { status, body });
        }

        first_content(response.json::<ChatResponse>().await?)
    }
}
