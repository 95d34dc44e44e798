use crate::config::VectorDbConfig;
use crate::document::{ProductDocument, ProductMetadata};
use crate::embedding::Embedder;
use crate::error::{ServiceError, ServiceResult, check_status};
use log::{debug, info, warn};
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Row shape written to the documents table.
#[derive(Serialize, Debug)]
struct DocumentRow<'a> {
    id: i64,
    content: &'a str,
    metadata: &'a ProductMetadata,
    embedding: Vec<f32>,
}

/// Row shape returned by the similarity RPC.
#[derive(Deserialize, Debug, Clone)]
pub struct MatchRow {
    pub content: String,
    #[serde(default)]
    pub metadata: ProductMetadata,
    #[serde(default)]
    pub similarity: f32,
}

/// Supabase (PostgREST + pgvector) document table.
pub struct SupabaseStore {
    client: Client,
    base_url: Url,
    service_key: String,
    table: String,
    query_name: String,
    embedder: Box<dyn Embedder>,
}

impl SupabaseStore {
    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
    }

    fn rest_url(&self, path: &str) -> ServiceResult<Url> {
        self.base_url
            .join(&format!("rest/v1/{path}"))
            .map_err(|e| ServiceError::VectorStore(format!("invalid REST path {path}: {e}")))
    }

    async fn probe(&self) -> ServiceResult<()> {
        let mut url = self.rest_url(&self.table)?;
        url.query_pairs_mut()
            .append_pair("select", "id")
            .append_pair("limit", "1");
        let response = self.authorized(self.client.get(url)).send().await?;
        check_status("vector store", response).await?;
        Ok(())
    }

    pub async fn add(&self, doc: &ProductDocument, id: u64) -> ServiceResult<()> {
        let id = i64::try_from(id)
            .map_err(|_| ServiceError::VectorStore(format!("id {id} exceeds int8 range")))?;
        let embedding = self.embedder.embed(&doc.content).await?;
        let row = DocumentRow {
            id,
            content: &doc.content,
            metadata: &doc.metadata,
            embedding,
        };

        let url = self.rest_url(&self.table)?;
        let response = self
            .authorized(self.client.post(url))
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(&[row])
            .send()
            .await?;
        check_status("vector store", response).await?;
        debug!("Upserted document {} into {}", id, self.table);
        Ok(())
    }

    pub async fn search(&self, query: &str, k: usize) -> ServiceResult<Vec<ProductDocument>> {
        let query_embedding = self.embedder.embed(query).await?;
        // match_documents(query_embedding, filter) takes no count; PostgREST caps rows via `limit`.
        let mut url = self.rest_url(&format!("rpc/{}", self.query_name))?;
        url.query_pairs_mut().append_pair("limit", &k.to_string());
        let response = self
            .authorized(self.client.post(url))
            .json(&json!({ "query_embedding": query_embedding }))
            .send()
            .await?;
        let rows: Vec<MatchRow> = check_status("vector store", response).await?.json().await?;
        Ok(rank(rows, k))
    }
}

/// Highest similarity first, at most `limit` documents.
pub fn rank(mut rows: Vec<MatchRow>, limit: usize) -> Vec<ProductDocument> {
    rows.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    rows.truncate(limit);
    rows.into_iter()
        .map(|row| ProductDocument {
            content: row.content,
            metadata: row.metadata,
        })
        .collect()
}

/// Either a reachable store or the reason we are running without one.
pub enum VectorBackend {
    Live(SupabaseStore),
    Degraded { reason: String },
}

impl VectorBackend {
    pub async fn connect(config: &VectorDbConfig, embedder: Box<dyn Embedder>) -> Self {
        let store = match Self::open(config, embedder) {
            Ok(store) => store,
            Err(reason) => return Self::degraded(reason),
        };
        match store.probe().await {
            Ok(()) => {
                info!(
                    "Connected to vector store table '{}' ({} embeddings)",
                    store.table,
                    store.embedder.model_name()
                );
                VectorBackend::Live(store)
            }
            Err(e) => Self::degraded(format!("vector store unreachable: {e}")),
        }
    }

    fn open(config: &VectorDbConfig, embedder: Box<dyn Embedder>) -> Result<SupabaseStore, String> {
        let raw_url = config.url.as_deref().ok_or("SUPABASE_URL is not set")?;
        let service_key = config
            .service_key
            .clone()
            .ok_or("SUPABASE_KEY is not set")?;
        // Url::join drops the last segment unless the base ends with '/'.
        let base_url = Url::parse(&format!("{}/", raw_url.trim_end_matches('/')))
            .map_err(|e| format!("invalid SUPABASE_URL: {e}"))?;
        Ok(SupabaseStore {
            client: Client::new(),
            base_url,
            service_key,
            table: config.table.clone(),
            query_name: config.query_name.clone(),
            embedder,
        })
    }

    pub fn degraded(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        warn!("Using stub vector store: {}", reason);
        VectorBackend::Degraded { reason }
    }

    pub fn is_live(&self) -> bool {
        matches!(self, VectorBackend::Live(_))
    }

    pub fn describe(&self) -> String {
        match self {
            VectorBackend::Live(store) => format!("live ({})", store.table),
            VectorBackend::Degraded { reason } => format!("degraded ({reason})"),
        }
    }

    pub async fn add(&self, doc: &ProductDocument, id: u64) -> ServiceResult<()> {
        match self {
            VectorBackend::Live(store) => store.add(doc, id).await,
            VectorBackend::Degraded { .. } => {
                info!("Added 1 document to stub store");
                Ok(())
            }
        }
    }

    /// The stub always answers with one document echoing the query.
    pub async fn search(&self, query: &str, k: usize) -> ServiceResult<Vec<ProductDocument>> {
        match self {
            VectorBackend::Live(store) => store.search(query, k).await,
            VectorBackend::Degraded { .. } => {
                info!("Searching stub store for: {}", query);
                Ok(vec![ProductDocument {
                    content: format!("Mock result for {query}"),
                    metadata: ProductMetadata {
                        product_name: query.to_string(),
                        source: Some("mock".to_string()),
                        ..Default::default()
                    },
                }])
            }
        }
    }
}
