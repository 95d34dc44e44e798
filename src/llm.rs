use crate::config::LlmConfig;
use crate::error::{ServiceError, ServiceResult, check_status};
use async_trait::async_trait;
use log::{debug, info};
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Takes a fully rendered prompt and returns the model's raw text.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(&self, prompt: &str) -> ServiceResult<String>;
}

#[derive(Serialize, Deserialize, Debug, Clone)]
struct WireMessage {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: WireMessage,
}

/// OpenAI-compatible chat completions client (Groq by default).
pub struct ChatCompletions {
    client: Client,
    api_key: String,
    config: LlmConfig,
}

impl ChatCompletions {
    pub fn new(config: &LlmConfig) -> ServiceResult<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| ServiceError::Config("GROQ_API_KEY is not set".to_string()))?;
        Ok(Self {
            client: Client::new(),
            api_key,
            config: config.clone(),
        })
    }
}

#[async_trait]
impl LanguageModel for ChatCompletions {
    async fn complete(&self, prompt: &str) -> ServiceResult<String> {
        info!("Calling {} ({} prompt chars)", self.config.model, prompt.len());
        let request = CompletionRequest {
            model: &self.config.model,
            messages: vec![WireMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };
        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;
        let parsed: CompletionResponse =
            check_status("language model", response).await?.json().await?;
        let text = first_choice(parsed)?;
        debug!("Model returned {} chars", text.len());
        Ok(text)
    }
}

fn first_choice(response: CompletionResponse) -> ServiceResult<String> {
    response
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message.content)
        .ok_or_else(|| ServiceError::LanguageModel("response contained no choices".to_string()))
}
