use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use serde::Serialize;
use tracing::{error, info, instrument};

use crate::application::RagService;
use crate::domain::{
    ports::LlmService, render_turns, ConversationHistory, ConversationTurn, DomainError,
};

pub const DEFAULT_MAX_TURNS: usize = 5;
pub const DEFAULT_PROMPT_TURNS: usize = 3;

/// Result of one question. Failures are answers too: `success` is false and
/// `answer` carries the error text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Answer {
    pub success: bool,
    pub answer: String,
    pub sources_count: usize,
}

impl Answer {
    pub fn success(answer: impl Into<String>, sources_count: usize) -> Self {
        Self {
            success: true,
            answer: answer.into(),
            sources_count,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            answer: message.into(),
            sources_count: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AskOptions {
    /// Render recent turns into the prompt.
    pub use_history: bool,
    /// Append the exchange to history once it succeeds.
    pub record_turn: bool,
}

impl AskOptions {
    /// History is read and written together unless told otherwise.
    pub fn with_history(use_history: bool) -> Self {
        Self {
            use_history,
            record_turn: use_history,
        }
    }
}

impl Default for AskOptions {
    fn default() -> Self {
        Self::with_history(true)
    }
}

/// Prompt text with `{context}`, `{history}` and `{question}` slots.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    system: Option<String>,
    template: String,
    history_header: String,
}

impl PromptTemplate {
    pub fn new(
        system: Option<String>,
        template: impl Into<String>,
        history_header: impl Into<String>,
    ) -> Self {
        Self {
            system,
            template: template.into(),
            history_header: history_header.into(),
        }
    }

    pub fn system(&self) -> Option<&str> {
        self.system.as_deref()
    }

    pub fn render(&self, context: &str, history: &[ConversationTurn], question: &str) -> String {
        let history = if history.is_empty() {
            String::new()
        } else {
            format!("\n{}\n{}", self.history_header, render_turns(history))
        };
        fill(
            &self.template,
            &[
                ("context", context),
                ("history", &history),
                ("question", question),
            ],
        )
    }
}

/// Single pass, so placeholder-like text inside values is left alone.
fn fill(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start + 1..];
        let hit = vars.iter().find_map(|(name, value)| {
            tail.strip_prefix(name)?
                .strip_prefix('}')
                .map(|after| (*value, after))
        });
        match hit {
            Some((value, after)) => {
                out.push_str(value);
                rest = after;
            }
            None => {
                out.push('{');
                rest = tail;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Answers questions from retrieved context and keeps a short history of
/// the exchanges it produced.
pub struct ChatResponder {
    rag: Arc<RagService>,
    llm: Arc<dyn LlmService>,
    prompt: PromptTemplate,
    history: Mutex<ConversationHistory>,
    prompt_turns: usize,
}

impl ChatResponder {
    pub fn new(rag: Arc<RagService>, llm: Arc<dyn LlmService>, prompt: PromptTemplate) -> Self {
        Self {
            rag,
            llm,
            prompt,
            history: Mutex::new(ConversationHistory::new(DEFAULT_MAX_TURNS)),
            prompt_turns: DEFAULT_PROMPT_TURNS,
        }
    }

    pub fn with_history_limits(mut self, max_turns: usize, prompt_turns: usize) -> Self {
        self.history = Mutex::new(ConversationHistory::new(max_turns));
        self.prompt_turns = prompt_turns;
        self
    }

    /// Never fails; errors come back as an unsuccessful [`Answer`].
    #[instrument(skip(self, question), fields(use_history = options.use_history))]
    pub async fn ask(&self, question: &str, options: AskOptions) -> Answer {
        match self.try_ask(question, options).await {
            Ok(answer) => answer,
            Err(e) => {
                error!(error = %e, "failed to answer question");
                Answer::failure(format!("Error: {e}"))
            }
        }
    }

    async fn try_ask(&self, question: &str, options: AskOptions) -> Result<Answer, DomainError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(DomainError::validation("question is empty"));
        }

        let results = self.rag.retrieve(question).await?;
        let context = results
            .iter()
            .map(|r| r.document.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        let history = if options.use_history {
            self.recent_turns()?
        } else {
            Vec::new()
        };
        let prompt = self.prompt.render(&context, &history, question);

        let answer = match self.prompt.system() {
            Some(system) => self.llm.complete_with_system(system, &prompt).await?,
            None => self.llm.complete(&prompt).await?,
        };

        if options.record_turn {
            self.record(ConversationTurn::new(question, answer.clone()))?;
        }

        info!(sources = results.len(), "question answered");
        Ok(Answer::success(answer, results.len()))
    }

    /// Oldest first.
    pub fn history(&self) -> Result<Vec<ConversationTurn>, DomainError> {
        Ok(self.lock_history()?.turns().cloned().collect())
    }

    pub fn clear_history(&self) -> Result<(), DomainError> {
        self.lock_history()?.clear();
        info!("conversation history cleared");
        Ok(())
    }

    fn recent_turns(&self) -> Result<Vec<ConversationTurn>, DomainError> {
        Ok(self.lock_history()?.recent(self.prompt_turns))
    }

    fn record(&self, turn: ConversationTurn) -> Result<(), DomainError> {
        self.lock_history()?.push(turn);
        Ok(())
    }

    fn lock_history(&self) -> Result<MutexGuard<'_, ConversationHistory>, DomainError> {
        self.history
            .lock()
            .map_err(|_| DomainError::internal("conversation history lock poisoned"))
    }
}

/// Builds the responder on first use.
#[async_trait]
pub trait ResponderFactory: Send + Sync {
    async fn build(&self) -> Result<ChatResponder, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        ports::{EmbeddingService, VectorStore},
        Document, Embedding,
    };
    use crate::infrastructure::{FlatIndex, HashingEmbedding};
    use std::sync::Mutex as StdMutex;

    /// Records prompts and answers with a fixed reply, or fails.
    struct StubLlm {
        pub reply: Result<String, String>,
        pub prompts: StdMutex<Vec<String>>,
    }

    impl StubLlm {
        pub fn replying(reply: &str) -> Self {
            Self {
                reply: Ok(reply.to_string()),
                prompts: StdMutex::new(Vec::new()),
            }
        }

        pub fn failing(message: &str) -> Self {
            Self {
                reply: Err(message.to_string()),
                prompts: StdMutex::new(Vec::new()),
            }
        }

        pub fn last_prompt(&self) -> String {
            self.prompts.lock().unwrap().last().cloned().unwrap_or_default()
        }
    }

    #[async_trait]
    impl LlmService for StubLlm {
        async fn complete(&self, prompt: &str) -> Result<String, DomainError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.reply.clone().map_err(DomainError::external)
        }

        async fn complete_with_system(
            &self,
            _system: &str,
            prompt: &str,
        ) -> Result<String, DomainError> {
            self.complete(prompt).await
        }
    }

    struct FailingEmbedding;

    #[async_trait]
    impl EmbeddingService for FailingEmbedding {
        async fn embed(&self, _text: &str) -> Result<Embedding, DomainError> {
            Err(DomainError::external("embedding service unreachable"))
        }

        async fn embed_batch(&self, _texts: &[&str]) -> Result<Vec<Embedding>, DomainError> {
            Err(DomainError::external("embedding service unreachable"))
        }

        fn dimension(&self) -> usize {
            64
        }

        fn model_name(&self) -> &str {
            "failing"
        }
    }

    async fn rag_over(texts: &[&str]) -> Arc<RagService> {
        let embedding = Arc::new(HashingEmbedding::new(64));
        let index = Arc::new(FlatIndex::new("hashing-64"));
        let vectors = embedding.embed_batch(texts).await.unwrap();
        let entries: Vec<(Document, Embedding)> =
            texts.iter().map(|t| Document::new(*t)).zip(vectors).collect();
        index.upsert(&entries).await.unwrap();
        Arc::new(RagService::new(embedding, index, 3))
    }

    fn template() -> PromptTemplate {
        PromptTemplate::new(
            None,
            "Context: {context}\n{history}\nQuestion: {question}",
            "Previous conversation:",
        )
    }

    async fn responder(llm: Arc<StubLlm>) -> ChatResponder {
        let rag = rag_over(&[
            "Question: what is rust\nAnswer: a language",
            "Question: what is tokio\nAnswer: a runtime",
        ])
        .await;
        ChatResponder::new(rag, llm, template())
    }

    #[test]
    fn test_render_without_history() {
        let prompt = template().render("ctx", &[], "why?");
        assert_eq!(prompt, "Context: ctx\n\nQuestion: why?");
    }

    #[test]
    fn test_render_with_history() {
        let turns = vec![ConversationTurn::new("hi", "hello")];
        let prompt = template().render("ctx", &turns, "why?");
        assert_eq!(
            prompt,
            "Context: ctx\n\nPrevious conversation:\nUser: hi\nAssistant: hello\n\nQuestion: why?"
        );
    }

    #[test]
    fn test_fill_leaves_values_untouched() {
        let out = fill("{a} {b} {c", &[("a", "{b}"), ("b", "x")]);
        assert_eq!(out, "{b} x {c");
    }

    #[tokio::test]
    async fn test_ask_success_records_turn() {
        let llm = Arc::new(StubLlm::replying("It is a language."));
        let responder = responder(llm.clone()).await;

        let answer = responder.ask("what is rust", AskOptions::default()).await;
        assert_eq!(answer, Answer::success("It is a language.", 2));
        assert!(llm.last_prompt().contains("Answer: a language"));

        let history = responder.history().unwrap();
        assert_eq!(history, vec![ConversationTurn::new("what is rust", "It is a language.")]);
    }

    #[tokio::test]
    async fn test_history_rendered_into_next_prompt() {
        let llm = Arc::new(StubLlm::replying("ok"));
        let responder = responder(llm.clone()).await;

        responder.ask("first question", AskOptions::default()).await;
        responder.ask("second question", AskOptions::default()).await;

        let prompt = llm.last_prompt();
        assert!(prompt.contains("Previous conversation:\nUser: first question\nAssistant: ok\n"));
    }

    #[tokio::test]
    async fn test_without_history_nothing_read_or_written() {
        let llm = Arc::new(StubLlm::replying("ok"));
        let responder = responder(llm.clone()).await;

        responder.ask("first", AskOptions::default()).await;
        responder.ask("second", AskOptions::with_history(false)).await;

        assert!(!llm.last_prompt().contains("Previous conversation"));
        assert_eq!(responder.history().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_record_without_reading() {
        let llm = Arc::new(StubLlm::replying("ok"));
        let responder = responder(llm.clone()).await;
        let options = AskOptions {
            use_history: false,
            record_turn: true,
        };

        responder.ask("one", options).await;
        responder.ask("two", options).await;

        assert!(!llm.last_prompt().contains("Previous conversation"));
        assert_eq!(responder.history().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_history_bounded_and_prompt_uses_recent_three() {
        let llm = Arc::new(StubLlm::replying("ok"));
        let responder = responder(llm.clone()).await;

        for i in 0..7 {
            responder.ask(&format!("q{i}"), AskOptions::default()).await;
        }
        let history = responder.history().unwrap();
        assert_eq!(history.len(), 5);
        assert_eq!(history[0].question, "q2");

        responder.ask("last", AskOptions::default()).await;
        let prompt = llm.last_prompt();
        assert!(prompt.contains("User: q4") && prompt.contains("User: q6"));
        assert!(!prompt.contains("User: q3"));
    }

    #[tokio::test]
    async fn test_llm_failure_is_an_error_answer() {
        let llm = Arc::new(StubLlm::failing("quota exceeded"));
        let responder = responder(llm).await;

        let answer = responder.ask("what is rust", AskOptions::default()).await;
        assert!(!answer.success);
        assert_eq!(answer.sources_count, 0);
        assert!(answer.answer.starts_with("Error: "));
        assert!(answer.answer.contains("quota exceeded"));
        assert!(responder.history().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_retrieval_failure_is_an_error_answer() {
        let llm = Arc::new(StubLlm::replying("ok"));
        let rag = Arc::new(RagService::new(
            Arc::new(FailingEmbedding),
            Arc::new(FlatIndex::new("failing")),
            3,
        ));
        let responder = ChatResponder::new(rag, llm.clone(), template());

        let answer = responder.ask("what is rust", AskOptions::default()).await;
        assert!(!answer.success);
        assert_eq!(answer.sources_count, 0);
        assert!(answer.answer.starts_with("Error: "));
        assert!(answer.answer.contains("embedding service unreachable"));
        assert!(responder.history().unwrap().is_empty());
        assert!(llm.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_blank_question_rejected() {
        let llm = Arc::new(StubLlm::replying("ok"));
        let responder = responder(llm.clone()).await;

        let answer = responder.ask("   ", AskOptions::default()).await;
        assert!(!answer.success);
        assert!(llm.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_clear_history() {
        let llm = Arc::new(StubLlm::replying("ok"));
        let responder = responder(llm.clone()).await;

        responder.ask("remember me", AskOptions::default()).await;
        responder.clear_history().unwrap();
        assert!(responder.history().unwrap().is_empty());

        responder.ask("next", AskOptions::default()).await;
        assert!(!llm.last_prompt().contains("remember me"));
    }
}
