use crate::error::{ServiceError, ServiceResult};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

pub const DEFAULT_CONTEXT_PATH: &str = "user_context.json";
pub const DEFAULT_HISTORY_WINDOW: usize = 5;

#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub api_key: Option<String>,
    pub endpoint: String,
    pub engine: String,
}

#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub endpoint: String,
}

#[derive(Debug, Clone)]
pub struct VectorDbConfig {
    pub url: Option<String>,
    pub service_key: Option<String>,
    pub table: String,
    pub query_name: String,
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub endpoint: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub search: SearchConfig,
    pub embedding: EmbeddingConfig,
    pub vector_db: VectorDbConfig,
    pub llm: LlmConfig,
    pub context_path: PathBuf,
    /// Chat turns rendered into the prompt; 0 keeps the full history.
    pub history_window: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            search: SearchConfig {
                api_key: None,
                endpoint: "https://serpapi.com/search".to_string(),
                engine: "google".to_string(),
            },
            embedding: EmbeddingConfig {
                api_key: None,
                model: "models/embedding-001".to_string(),
                endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            },
            vector_db: VectorDbConfig {
                url: None,
                service_key: None,
                table: "product_info".to_string(),
                query_name: "match_documents".to_string(),
            },
            llm: LlmConfig {
                api_key: None,
                model: "llama-3.3-70b-versatile".to_string(),
                temperature: 0.7,
                max_tokens: 1024,
                endpoint: "https://api.groq.com/openai/v1/chat/completions".to_string(),
            },
            context_path: PathBuf::from(DEFAULT_CONTEXT_PATH),
            history_window: DEFAULT_HISTORY_WINDOW,
        }
    }
}

impl Config {
    /// Reads the process environment, after loading `.env` if one exists.
    pub fn from_env() -> ServiceResult<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> ServiceResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Config::default();

        config.search.api_key = get("SERPAPI_API_KEY");
        if let Some(endpoint) = get("SERPAPI_ENDPOINT") {
            config.search.endpoint = endpoint;
        }

        config.embedding.api_key = get("GOOGLE_API_KEY");
        if let Some(model) = get("EMBEDDING_MODEL") {
            config.embedding.model = model;
        }

        config.vector_db.url = get("SUPABASE_URL");
        config.vector_db.service_key = get("SUPABASE_KEY");
        if let Some(table) = get("VECTOR_TABLE") {
            config.vector_db.table = table;
        }

        config.llm.api_key = get("GROQ_API_KEY");
        if let Some(model) = get("LLM_MODEL") {
            config.llm.model = model;
        }
        if let Some(raw) = get("LLM_TEMPERATURE") {
            config.llm.temperature = parse_value("LLM_TEMPERATURE", &raw)?;
        }
        if let Some(raw) = get("LLM_MAX_TOKENS") {
            config.llm.max_tokens = parse_value("LLM_MAX_TOKENS", &raw)?;
        }

        if let Some(path) = get("USER_CONTEXT_PATH") {
            config.context_path = PathBuf::from(path);
        }
        if let Some(raw) = get("HISTORY_WINDOW") {
            config.history_window = parse_value("HISTORY_WINDOW", &raw)?;
        }

        Ok(config)
    }
}

fn parse_value<T: FromStr>(key: &str, raw: &str) -> ServiceResult<T> {
    raw.trim()
        .parse()
        .map_err(|_| ServiceError::Config(format!("{key} has an invalid value: {raw}")))
}
