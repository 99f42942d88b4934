//! LLM chat completions
//!
//! Single client for the `OpenAI` chat completions API, behind the
//! [`ChatModel`] seam so the pipeline can be tested without network access.

use async_trait::async_trait;

use crate::{Error, Result};

/// Produces a chat completion for a system/user prompt pair
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Complete a single turn
    ///
    /// # Errors
    ///
    /// Returns error if the completion fails
    async fn complete(&self, system: &str, user: &str) -> Result<String>;
}

/// Chat completions client using `OpenAI`'s API
#[derive(Debug, Clone)]
pub struct ChatClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    temperature: f32,
}

impl ChatClient {
    /// Create a new chat client
    ///
    /// # Errors
    ///
    /// Returns error if API key is empty
    pub fn new(api_key: String, model: String, temperature: f32) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::Config(
                "OpenAI API key required for chat completions".to_string(),
            ));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            model,
            temperature,
        })
    }
}

#[async_trait]
impl ChatModel for ChatClient {
    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        #[derive(serde::Serialize)]
        struct ChatMessage<'a> {
            role: &'a str,
            content: &'a str,
        }

        #[derive(serde::Serialize)]
        struct ChatRequest<'a> {
            model: &'a str,
            temperature: f32,
            messages: Vec<ChatMessage<'a>>,
        }

        #[derive(serde::Deserialize)]
        struct ChatResponse {
            choices: Vec<ChatChoice>,
        }

        #[derive(serde::Deserialize)]
        struct ChatChoice {
            message: ChatChoiceMessage,
        }

        #[derive(serde::Deserialize)]
        struct ChatChoiceMessage {
            content: String,
        }

        let request = ChatRequest {
            model: &self.model,
            temperature: self.temperature,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
        };

        tracing::debug!(model = %self.model, "requesting chat completion");

        let response = self
            .client
            .post("https://api.openai.com/v1/chat/completions")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "chat completion request failed");
                Error::Llm(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "chat completion API error");
            return Err(Error::Llm(format!("chat API error {status}: {body}")));
        }

        let result: ChatResponse = response.json().await.map_err(|e| {
            tracing::error!(error = %e, "failed to parse chat response");
            Error::Llm(e.to_string())
        })?;

        result
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| Error::Llm("empty completion response".to_string()))
    }
}
