use std::sync::Arc;
use tracing::instrument;

use crate::domain::{
    ports::{EmbeddingService, VectorStore},
    DomainError, SearchResult,
};

pub struct RagService {
    embedding: Arc<dyn EmbeddingService>,
    vector_store: Arc<dyn VectorStore>,
    default_top_k: usize,
}

impl RagService {
    pub fn new(
        embedding: Arc<dyn EmbeddingService>,
        vector_store: Arc<dyn VectorStore>,
        default_top_k: usize,
    ) -> Self {
        Self {
            embedding,
            vector_store,
            default_top_k,
        }
    }

    pub fn top_k(&self) -> usize {
        self.default_top_k
    }

    #[instrument(skip(self, query), fields(top_k = self.default_top_k))]
    pub async fn retrieve(&self, query: &str) -> Result<Vec<SearchResult>, DomainError> {
        self.retrieve_top_k(query, self.default_top_k).await
    }

    #[instrument(skip(self, query))]
    pub async fn retrieve_top_k(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<SearchResult>, DomainError> {
        let embedding = self.embedding.embed(query).await?;
        let mut results = self.vector_store.search(&embedding, top_k).await?;
        results.truncate(top_k);
        tracing::debug!(found = results.len(), "documents retrieved");
        Ok(results)
    }

    pub async fn document_count(&self) -> Result<usize, DomainError> {
        self.vector_store.count().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Document, Embedding};
    use crate::infrastructure::{FlatIndex, HashingEmbedding};

    async fn service(top_k: usize) -> RagService {
        let embedding = Arc::new(HashingEmbedding::new(128));
        let index = Arc::new(FlatIndex::new("hashing-128"));
        let texts = [
            "neural networks learn representations",
            "reinforcement learning uses rewards",
            "computer vision analyzes images",
            "transformers rely on self attention",
        ];
        let vectors = embedding.embed_batch(&texts).await.unwrap();
        let entries: Vec<(Document, Embedding)> =
            texts.iter().map(|t| Document::new(*t)).zip(vectors).collect();
        index.upsert(&entries).await.unwrap();

        RagService::new(embedding, index, top_k)
    }

    #[tokio::test]
    async fn test_retrieve_returns_at_most_top_k() {
        let rag = service(3).await;
        let results = rag.retrieve("what are neural networks").await.unwrap();

        assert_eq!(results.len(), 3);
        assert_eq!(
            results[0].document.content,
            "neural networks learn representations"
        );
    }

    #[tokio::test]
    async fn test_retrieve_top_k_override() {
        let rag = service(3).await;
        assert_eq!(rag.retrieve_top_k("images", 1).await.unwrap().len(), 1);
        assert_eq!(rag.retrieve_top_k("images", 10).await.unwrap().len(), 4);
        assert_eq!(rag.document_count().await.unwrap(), 4);
    }
}
