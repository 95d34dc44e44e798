use crate::config::SearchConfig;
use crate::error::{ServiceError, ServiceResult, check_status};
use async_trait::async_trait;
use log::{debug, info};
use reqwest::Client;
use serde_json::{Map, Value};

pub const NO_RESULTS: &str = "No good search result found";
const SHOPPING_RESULTS: usize = 3;
// First field present wins for each organic result.
const ORGANIC_FIELDS: [&str; 5] = [
    "snippet",
    "snippet_highlighted_words",
    "rich_snippet",
    "rich_snippet_table",
    "link",
];

/// Web search collaborator; failures propagate to the caller untouched.
#[async_trait]
pub trait SearchClient: Send + Sync {
    async fn run(&self, query: &str) -> ServiceResult<String>;
}

pub struct SerpApiSearch {
    client: Client,
    api_key: String,
    endpoint: String,
    engine: String,
}

impl SerpApiSearch {
    pub fn new(config: &SearchConfig) -> ServiceResult<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| ServiceError::Config("SERPAPI_API_KEY is not set".to_string()))?;
        Ok(Self {
            client: Client::new(),
            api_key,
            endpoint: config.endpoint.clone(),
            engine: config.engine.clone(),
        })
    }
}

#[async_trait]
impl SearchClient for SerpApiSearch {
    async fn run(&self, query: &str) -> ServiceResult<String> {
        info!("Searching the web for '{}'", query);
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("q", query),
                ("engine", self.engine.as_str()),
                ("api_key", self.api_key.as_str()),
            ])
            .send()
            .await?;
        let body: Value = check_status("search", response).await?.json().await?;
        let text = summarize_results(&body)?;
        debug!("Search returned {} bytes of text", text.len());
        Ok(text)
    }
}

/// Flattens a SerpApi response into the most useful block of text it carries.
///
/// A direct answer wins (answer box, sports spotlight, shopping hits); otherwise
/// knowledge-graph facts and organic snippets are collected in page order.
pub fn summarize_results(body: &Value) -> ServiceResult<String> {
    if let Some(error) = body.get("error") {
        return Err(ServiceError::Search(value_text(error)));
    }

    let answer_box = body
        .get("answer_box_list")
        .or_else(|| body.get("answer_box"))
        .map(|b| match b {
            Value::Array(items) => items.first().cloned().unwrap_or(Value::Null),
            other => other.clone(),
        });
    if let Some(Value::Object(answer_box)) = answer_box {
        for field in ["result", "answer", "snippet", "snippet_highlighted_words"] {
            if let Some(text) = answer_box.get(field) {
                return Ok(value_text(text));
            }
        }
        let scalars: Map<String, Value> = answer_box
            .into_iter()
            .filter(|(_, v)| !v.is_array() && !v.is_object())
            .filter(|(_, v)| !v.as_str().is_some_and(|s| s.starts_with("http")))
            .collect();
        return Ok(Value::Object(scalars).to_string());
    }

    if let Some(spotlight) = body
        .get("sports_results")
        .and_then(|s| s.get("game_spotlight"))
    {
        return Ok(value_text(spotlight));
    }

    if let Some(shopping) = body.get("shopping_results").and_then(Value::as_array) {
        if shopping.first().is_some_and(|r| r.get("title").is_some()) {
            return Ok(shopping
                .iter()
                .take(SHOPPING_RESULTS)
                .map(value_text)
                .collect::<Vec<_>>()
                .join("\n"));
        }
    }

    let mut snippets = Vec::new();
    if let Some(Value::Object(graph)) = body.get("knowledge_graph") {
        let title = graph.get("title").and_then(Value::as_str).unwrap_or_default();
        if let Some(description) = graph.get("description") {
            snippets.push(value_text(description));
        }
        for (key, value) in graph {
            let Some(value) = value.as_str() else {
                continue;
            };
            if key == "title"
                || key == "description"
                || key.ends_with("_stick")
                || key.ends_with("_link")
                || value.starts_with("http")
            {
                continue;
            }
            snippets.push(format!("{title} {key}: {value}."));
        }
    }
    if let Some(results) = body.get("organic_results").and_then(Value::as_array) {
        snippets.extend(results.iter().filter_map(|r| {
            ORGANIC_FIELDS
                .iter()
                .find_map(|field| r.get(*field))
                .map(value_text)
        }));
    }
    if let Some(guide) = body.get("buying_guide") {
        snippets.push(value_text(guide));
    }
    if let Some(local) = body.get("local_results").filter(|l| l.is_array()) {
        snippets.push(value_text(local));
    }

    if snippets.is_empty() {
        Ok(NO_RESULTS.to_string())
    } else {
        Ok(snippets.join("\n"))
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
