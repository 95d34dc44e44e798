use crate::config::EmbeddingConfig;
use crate::error::{ServiceError, ServiceResult, check_status};
use async_trait::async_trait;
use log::warn;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sha2::{Digest, Sha256};

pub const FALLBACK_DIMENSION: usize = 768;

#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> ServiceResult<Vec<f32>>;

    fn model_name(&self) -> &str;
}

/// Google Generative Language `embedContent` client.
pub struct GeminiEmbedder {
    client: Client,
    api_key: String,
    model: String,
    endpoint: String,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    content: serde_json::Value,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: EmbeddingValues,
}

#[derive(Deserialize)]
struct EmbeddingValues {
    values: Vec<f32>,
}

impl GeminiEmbedder {
    pub fn new(config: &EmbeddingConfig) -> ServiceResult<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| ServiceError::Config("GOOGLE_API_KEY is not set".to_string()))?;
        Ok(Self {
            client: Client::new(),
            api_key,
            model: config.model.clone(),
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl Embedder for GeminiEmbedder {
    async fn embed(&self, text: &str) -> ServiceResult<Vec<f32>> {
        let url = format!("{}/{}:embedContent", self.endpoint, self.model);
        let request = EmbedRequest {
            model: &self.model,
            content: json!({ "parts": [{ "text": text }] }),
        };
        let response = self
            .client
            .post(url)
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await?;
        let parsed: EmbedResponse = check_status("embedding", response).await?.json().await?;
        if parsed.embedding.values.is_empty() {
            return Err(ServiceError::Embedding("empty embedding returned".to_string()));
        }
        Ok(parsed.embedding.values)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Offline stand-in: every component is the same hash-derived value.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dimension: usize,
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(FALLBACK_DIMENSION)
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed(&self, text: &str) -> ServiceResult<Vec<f32>> {
        let digest = Sha256::digest(text.as_bytes());
        let bucket = u16::from_be_bytes([digest[0], digest[1]]) % 1024;
        let value = f32::from(bucket) / 1024.0;
        Ok(vec![value; self.dimension])
    }

    fn model_name(&self) -> &str {
        "hash"
    }
}

/// Remote embedder when configured, otherwise the hash stand-in.
pub fn init_embedder(config: &EmbeddingConfig) -> Box<dyn Embedder> {
    match GeminiEmbedder::new(config) {
        Ok(embedder) => Box::new(embedder),
        Err(e) => {
            warn!("Error initializing embeddings: {}. Using hash embeddings.", e);
            Box::new(HashEmbedder::default())
        }
    }
}
