use crate::chat::{ChatMessage, MessageBuffer, Role};
use crate::config::DEFAULT_HISTORY_WINDOW;
use crate::context::ContextStore;
use crate::document::{ProductDocument, numeric_id};
use crate::llm::LanguageModel;
use crate::preferences;
use crate::prompt::PromptInputs;
use crate::search::SearchClient;
use crate::vector_store::VectorBackend;
use eyre::{Result, WrapErr};
use log::info;

pub const SIMILAR_DOCUMENTS: usize = 3;

/// Runs one research request end to end against injected services.
///
/// The prompt carries the last `history_window` turns rather than the whole
/// transcript, which keeps it bounded for long sessions; a window of 0 sends
/// every turn. Preference extraction always reads the full buffer.
pub struct Researcher {
    search: Box<dyn SearchClient>,
    llm: Box<dyn LanguageModel>,
    vectors: VectorBackend,
    contexts: ContextStore,
    history_window: usize,
}

impl Researcher {
    pub fn new(
        search: Box<dyn SearchClient>,
        llm: Box<dyn LanguageModel>,
        vectors: VectorBackend,
        contexts: ContextStore,
    ) -> Self {
        Self {
            search,
            llm,
            vectors,
            contexts,
            history_window: DEFAULT_HISTORY_WINDOW,
        }
    }

    /// 0 means no limit.
    pub fn with_history_window(mut self, window: usize) -> Self {
        self.history_window = window;
        self
    }

    pub fn vectors(&self) -> &VectorBackend {
        &self.vectors
    }

    fn prompt_history<'b>(&self, buffer: &'b MessageBuffer) -> &'b [ChatMessage] {
        match self.history_window {
            0 => buffer.all(),
            n => buffer.recent(n),
        }
    }

    /// Returns the model's text as-is; its table format is not checked.
    pub async fn research(&self, buffer: &mut MessageBuffer, query: &str) -> Result<String> {
        info!(
            "Researching '{}' with vector store {}",
            query,
            self.vectors.describe()
        );

        let context = self.contexts.load().await;

        let search_results = self
            .search
            .run(query)
            .await
            .wrap_err("Web search failed")?;

        let document = ProductDocument::build(query, &search_results);
        let id = numeric_id(query);
        self.vectors
            .add(&document, id)
            .await
            .wrap_err("Failed to store product document")?;

        let similar = self
            .vectors
            .search(query, SIMILAR_DOCUMENTS)
            .await
            .wrap_err("Vector search failed")?;
        let vector_db_results = similar
            .iter()
            .map(|doc| doc.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        buffer.add(Role::User, query);
        let context = preferences::update_context(query, buffer, context);
        self.contexts.save(&context).await?;

        // Fetched again for the prompt; the first result is not reused.
        let fresh_results = self
            .search
            .run(query)
            .await
            .wrap_err("Web search failed")?;

        let prompt = PromptInputs {
            product: query,
            search_results: &fresh_results,
            chat_history: self.prompt_history(buffer),
            previous_products: &context.previous_products,
            user_preferences: &context.user_preferences,
            vector_db_results: &vector_db_results,
        }
        .render();

        let response = self
            .llm
            .complete(&prompt)
            .await
            .wrap_err("Language model call failed")?;
        info!("Research for '{}' complete", query);
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ServiceError, ServiceResult};
    use crate::preferences::PREFERENCE_KEY;
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct CountingSearch {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl SearchClient for CountingSearch {
        async fn run(&self, query: &str) -> ServiceResult<String> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(format!("results #{n} for {query}"))
        }
    }

    struct FailingSearch;

    #[async_trait]
    impl SearchClient for FailingSearch {
        async fn run(&self, _query: &str) -> ServiceResult<String> {
            Err(ServiceError::Search("provider down".to_string()))
        }
    }

    /// Answers with the product line of the prompt and keeps the full prompt.
    struct EchoModel {
        prompts: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl LanguageModel for EchoModel {
        async fn complete(&self, prompt: &str) -> ServiceResult<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            let product = prompt
                .lines()
                .find_map(|l| l.strip_prefix("Product being researched: "))
                .unwrap_or_default();
            Ok(format!("Aspect | {product} | ?\nSUMMARY:\n{product}\n"))
        }
    }

    struct Harness {
        researcher: Researcher,
        searches: Arc<AtomicUsize>,
        prompts: Arc<Mutex<Vec<String>>>,
        contexts: ContextStore,
        _dir: tempfile::TempDir,
    }

    fn harness() -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let contexts = ContextStore::new(dir.path().join("user_context.json"));
        let searches = Arc::new(AtomicUsize::new(0));
        let prompts = Arc::new(Mutex::new(Vec::new()));
        let researcher = Researcher::new(
            Box::new(CountingSearch {
                calls: searches.clone(),
            }),
            Box::new(EchoModel {
                prompts: prompts.clone(),
            }),
            VectorBackend::degraded("test"),
            contexts.clone(),
        );
        Harness {
            researcher,
            searches,
            prompts,
            contexts,
            _dir: dir,
        }
    }

    #[tokio::test]
    async fn end_to_end_with_stubs_mentions_product() {
        let h = harness();
        let mut buffer = MessageBuffer::new();

        let output = h.researcher.research(&mut buffer, "iPhone 12").await.unwrap();

        assert!(output.contains("iPhone 12"));
        assert_eq!(h.searches.load(Ordering::SeqCst), 2);
        assert_eq!(buffer.len(), 1);

        let prompts = h.prompts.lock().unwrap();
        assert!(prompts[0].contains("results #2 for iPhone 12"));
        assert!(prompts[0].contains("(if applicable): Mock result for iPhone 12"));
    }

    #[tokio::test]
    async fn persists_products_and_preferences() {
        let h = harness();
        let mut buffer = MessageBuffer::seeded(vec![ChatMessage::new(
            Role::User,
            "I prefer long battery life.",
        )]);

        h.researcher.research(&mut buffer, "Pixel 8").await.unwrap();
        h.researcher.research(&mut buffer, "Pixel 8").await.unwrap();

        let saved = h.contexts.load().await;
        assert_eq!(saved.previous_products, vec!["Pixel 8"]);
        assert_eq!(
            saved.user_preferences[PREFERENCE_KEY],
            vec!["i prefer long battery life"]
        );
    }

    #[tokio::test]
    async fn prompt_sees_only_recent_turns() {
        let h = harness();
        let researcher = h.researcher.with_history_window(2);
        let mut buffer = MessageBuffer::new();
        buffer.add(Role::User, "oldest turn");
        buffer.add(Role::Assistant, "middle turn");

        researcher.research(&mut buffer, "Galaxy S24").await.unwrap();

        let prompts = h.prompts.lock().unwrap();
        assert!(!prompts[0].contains("oldest turn"));
        assert!(prompts[0].contains("middle turn"));
        assert!(prompts[0].contains(r#""content":"Galaxy S24""#));
    }

    #[tokio::test]
    async fn zero_window_sends_whole_history() {
        let h = harness();
        let researcher = h.researcher.with_history_window(0);
        let mut buffer = MessageBuffer::new();
        for i in 0..7 {
            buffer.add(Role::User, format!("turn {i}"));
        }

        researcher.research(&mut buffer, "Galaxy S24").await.unwrap();

        let prompts = h.prompts.lock().unwrap();
        assert!(prompts[0].contains(r#""content":"turn 0""#));
        assert!(prompts[0].contains(r#""content":"Galaxy S24""#));
    }

    #[tokio::test]
    async fn search_failure_aborts_without_saving() {
        let dir = tempfile::tempdir().unwrap();
        let contexts = ContextStore::new(dir.path().join("user_context.json"));
        let researcher = Researcher::new(
            Box::new(FailingSearch),
            Box::new(EchoModel {
                prompts: Arc::new(Mutex::new(Vec::new())),
            }),
            VectorBackend::degraded("test"),
            contexts.clone(),
        );
        let mut buffer = MessageBuffer::new();

        let err = researcher.research(&mut buffer, "iPhone 12").await.unwrap_err();
        assert!(format!("{err:?}").contains("provider down"));
        assert!(!contexts.path().exists());
    }
}
