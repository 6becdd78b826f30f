use std::sync::Arc;

use futures::stream::{self, StreamExt, TryStreamExt};
use tracing::{info, instrument};

use crate::domain::{
    chunk_documents,
    ports::{EmbeddingService, VectorStore},
    ConversationPair, Document, DomainError, Embedding, TextSplitter,
};

pub const CONVERSATION_SOURCE: &str = "conversation_data";

/// Placeholder knowledge used when no real index exists: `(content, category)`.
pub const FALLBACK_DOCUMENTS: &[(&str, &str)] = &[
    (
        "Artificial intelligence (AI) creates machines that simulate human intelligence and learning.",
        "AI",
    ),
    (
        "Machine learning (ML) enables computers to learn patterns from data without explicit programming.",
        "ML",
    ),
    (
        "Deep learning uses multi-layer neural networks to analyze complex data patterns and features.",
        "DL",
    ),
    (
        "Natural language processing (NLP) allows computers to understand, interpret and generate human language.",
        "NLP",
    ),
    (
        "Computer vision enables machines to identify, process and analyze visual information from the world.",
        "CV",
    ),
    (
        "Neural networks are computing systems inspired by biological neural networks in human brains.",
        "NN",
    ),
    (
        "Transformers are deep learning models that process sequential data using self-attention mechanisms.",
        "Transformers",
    ),
    (
        "Reinforcement learning trains AI agents through reward-based learning and decision making.",
        "RL",
    ),
    (
        "Supervised learning uses labeled datasets to train algorithms for classification and prediction.",
        "SL",
    ),
    (
        "Unsupervised learning finds hidden patterns in unlabeled data without human supervision.",
        "UL",
    ),
];

pub fn fallback_documents() -> Vec<Document> {
    FALLBACK_DOCUMENTS
        .iter()
        .map(|(content, category)| Document::new(*content).with_metadata("category", *category))
        .collect()
}

/// Wraps each pair as a `Question/Answer` document tagged with its source.
pub fn documents_from_pairs(pairs: &[ConversationPair]) -> Vec<Document> {
    pairs
        .iter()
        .map(|pair| {
            Document::new(pair.to_document_text()).with_metadata("source", CONVERSATION_SOURCE)
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexStats {
    pub documents: usize,
    pub chunks: usize,
}

/// Chunks, embeds and stores documents.
pub struct IndexingService {
    embedding: Arc<dyn EmbeddingService>,
    store: Arc<dyn VectorStore>,
    splitter: TextSplitter,
    batch_size: usize,
    concurrency: usize,
}

impl IndexingService {
    pub fn new(embedding: Arc<dyn EmbeddingService>, store: Arc<dyn VectorStore>) -> Self {
        Self {
            embedding,
            store,
            splitter: TextSplitter::default(),
            batch_size: 64,
            concurrency: 4,
        }
    }

    pub fn with_splitter(mut self, splitter: TextSplitter) -> Self {
        self.splitter = splitter;
        self
    }

    pub fn with_batching(mut self, batch_size: usize, concurrency: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self.concurrency = concurrency.max(1);
        self
    }

    #[instrument(skip(self, pairs), fields(pairs = pairs.len()))]
    pub async fn index_pairs(&self, pairs: &[ConversationPair]) -> Result<IndexStats, DomainError> {
        self.index_documents(documents_from_pairs(pairs)).await
    }

    #[instrument(skip(self, documents), fields(documents = documents.len()))]
    pub async fn index_documents(
        &self,
        documents: Vec<Document>,
    ) -> Result<IndexStats, DomainError> {
        let chunks = chunk_documents(&documents, &self.splitter);
        let embedded = self.embed_chunks(chunks).await?;
        self.store.upsert(&embedded).await?;

        let stats = IndexStats {
            documents: documents.len(),
            chunks: embedded.len(),
        };
        info!(
            documents = stats.documents,
            chunks = stats.chunks,
            model = self.embedding.model_name(),
            "documents indexed"
        );
        Ok(stats)
    }

    /// Batches run concurrently; results keep chunk order.
    async fn embed_chunks(
        &self,
        chunks: Vec<Document>,
    ) -> Result<Vec<(Document, Embedding)>, DomainError> {
        let batches: Vec<Vec<Document>> = chunks
            .chunks(self.batch_size)
            .map(<[Document]>::to_vec)
            .collect();
        let total = batches.len();

        let embedded: Vec<Vec<(Document, Embedding)>> =
            stream::iter(batches.into_iter().enumerate())
                .map(|(i, batch)| async move {
                    let vectors = {
                        let texts: Vec<&str> = batch.iter().map(|d| d.content.as_str()).collect();
                        self.embedding.embed_batch(&texts).await?
                    };
                    if vectors.len() != batch.len() {
                        return Err(DomainError::external(format!(
                            "embedding batch returned {} vectors for {} chunks",
                            vectors.len(),
                            batch.len()
                        )));
                    }
                    tracing::debug!(batch = i + 1, total, "batch embedded");
                    let pairs: Vec<(Document, Embedding)> =
                        batch.into_iter().zip(vectors).collect();
                    Ok::<_, DomainError>(pairs)
                })
                .buffered(self.concurrency)
                .try_collect()
                .await?;

        Ok(embedded.into_iter().flatten().collect())
    }
}
