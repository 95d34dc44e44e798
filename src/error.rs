use reqwest::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("missing or invalid configuration: {0}")]
    Config(String),
    #[error("search provider failed: {0}")]
    Search(String),
    #[error("embedding provider failed: {0}")]
    Embedding(String),
    #[error("vector store failed: {0}")]
    VectorStore(String),
    #[error("language model failed: {0}")]
    LanguageModel(String),
    #[error("{service} returned {status}: {body}")]
    Http {
        service: &'static str,
        status: StatusCode,
        body: String,
    },
    #[error(transparent)]
    Request(#[from] reqwest::Error),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Turns a non-success response into `ServiceError::Http`, keeping the body for the report.
pub(crate) async fn check_status(
    service: &'static str,
    response: reqwest::Response,
) -> ServiceResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ServiceError::Http {
        service,
        status,
        body,
    })
}
