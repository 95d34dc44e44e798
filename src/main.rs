use eyre::{Result, WrapErr};
use log::info;
use prodscout::{
    chat::{ChatMessage, MessageBuffer},
    config::Config,
    context::ContextStore,
    embedding,
    llm::ChatCompletions,
    pipeline::Researcher,
    search::SerpApiSearch,
    vector_store::VectorBackend,
};
use serde::Deserialize;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

#[derive(Deserialize, Debug)]
struct Request {
    product: String,
    #[serde(default)]
    chat_history: Vec<ChatMessage>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let mut input = String::new();
    tokio::io::stdin()
        .read_to_string(&mut input)
        .await
        .wrap_err("Failed to read request from stdin")?;
    let request: Request = serde_json::from_str(&input).wrap_err("Invalid request JSON")?;

    let config = Config::from_env()?;
    let search = SerpApiSearch::new(&config.search)?;
    let llm = ChatCompletions::new(&config.llm)?;
    let embedder = embedding::init_embedder(&config.embedding);
    let vectors = VectorBackend::connect(&config.vector_db, embedder).await;
    info!("Vector store mode: {}", vectors.describe());

    let researcher = Researcher::new(
        Box::new(search),
        Box::new(llm),
        vectors,
        ContextStore::new(&config.context_path),
    )
    .with_history_window(config.history_window);

    let mut buffer = MessageBuffer::seeded(request.chat_history);
    let response = researcher.research(&mut buffer, &request.product).await?;

    let mut stdout = tokio::io::stdout();
    stdout.write_all(response.as_bytes()).await?;
    stdout.flush().await?;
    Ok(())
}
