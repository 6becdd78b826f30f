use crate::domain::{errors::DomainError, Document, Embedding, SearchResult};
use async_trait::async_trait;

#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn upsert(&self, entries: &[(Document, Embedding)]) -> Result<(), DomainError>;
    /// Returns at most `top_k` results, best match first.
    async fn search(
        &self,
        query: &Embedding,
        top_k: usize,
    ) -> Result<Vec<SearchResult>, DomainError>;
    async fn count(&self) -> Result<usize, DomainError>;
}
