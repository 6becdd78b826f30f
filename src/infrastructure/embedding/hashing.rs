use async_trait::async_trait;

use crate::domain::{ports::EmbeddingService, DomainError, Embedding};

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0100_0000_01b3;

/// Deterministic bag-of-words embedder using signed feature hashing.
///
/// Needs no network or API key, so it serves offline builds and tests.
/// Texts sharing words land close together; it has no notion of synonyms.
pub struct HashingEmbedding {
    dimension: usize,
    model: String,
}

impl HashingEmbedding {
    pub fn new(dimension: usize) -> Self {
        let dimension = dimension.max(1);
        Self {
            dimension,
            model: format!("hashing-{dimension}"),
        }
    }

    fn vectorize(&self, text: &str) -> Embedding {
        let mut vec = vec![0.0f32; self.dimension];
        let lowered = text.to_lowercase();
        let tokens = lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty());

        for token in tokens {
            let hash = fnv1a(token.as_bytes());
            let slot = (hash % self.dimension as u64) as usize;
            let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
            vec[slot] += sign;
        }

        Embedding::new(vec).normalized()
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(FNV_OFFSET, |hash, b| {
        (hash ^ u64::from(*b)).wrapping_mul(FNV_PRIME)
    })
}

#[async_trait]
impl EmbeddingService for HashingEmbedding {
    async fn embed(&self, text: &str) -> Result<Embedding, DomainError> {
        Ok(self.vectorize(text))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>, DomainError> {
        Ok(texts.iter().map(|t| self.vectorize(t)).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_same_text_same_vector() {
        let embedder = HashingEmbedding::new(64);
        let a = embedder.embed("Machine learning").await.unwrap();
        let b = embedder.embed("machine  LEARNING!").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.dimension(), 64);
        assert_eq!(embedder.dimension(), 64);
    }

    #[tokio::test]
    async fn test_shared_words_score_higher() {
        let embedder = HashingEmbedding::new(256);
        let query = embedder.embed("neural networks").await.unwrap();
        let close = embedder
            .embed("neural networks are inspired by brains")
            .await
            .unwrap();
        let far = embedder.embed("reward based decisions").await.unwrap();

        assert!(query.cosine_similarity(&close) > query.cosine_similarity(&far));
    }

    #[tokio::test]
    async fn test_batch_matches_single() {
        let embedder = HashingEmbedding::new(32);
        let batch = embedder.embed_batch(&["one", "two"]).await.unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[1], embedder.embed("two").await.unwrap());
    }
}
