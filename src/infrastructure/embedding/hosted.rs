use async_trait::async_trait;
use rig::client::{EmbeddingsClient, ProviderClient};
use rig::embeddings::EmbeddingsBuilder;
use rig::providers::{gemini, openai};

use crate::domain::{ports::EmbeddingService, DomainError, Embedding};
use crate::infrastructure::config::{EmbeddingConfig, EmbeddingProvider};
use crate::infrastructure::require_env;

enum Client {
    Gemini(gemini::Client),
    OpenAi(openai::Client),
}

/// Embeds text through a hosted provider.
pub struct RigEmbedding {
    client: Client,
    model: String,
    dimension: usize,
}

/// Runs one `EmbeddingsBuilder` pass; results keep the input order.
macro_rules! embed_all {
    ($client:expr, $model:expr, $texts:expr) => {{
        let model = $client.embedding_model($model);
        let mut builder = EmbeddingsBuilder::new(model);
        for text in $texts {
            builder = builder
                .document(text.to_string())
                .map_err(|e| DomainError::external(e.to_string()))?;
        }
        builder
            .build()
            .await
            .map_err(|e| DomainError::external(e.to_string()))?
            .into_iter()
            .map(|(_doc, emb)| Embedding::from(emb.first().vec))
            .collect::<Vec<_>>()
    }};
}

impl RigEmbedding {
    pub fn from_config(config: &EmbeddingConfig) -> Result<Self, DomainError> {
        let client = match config.provider {
            EmbeddingProvider::Gemini => {
                require_env("GEMINI_API_KEY")?;
                Client::Gemini(gemini::Client::from_env())
            }
            EmbeddingProvider::OpenAi => {
                require_env("OPENAI_API_KEY")?;
                Client::OpenAi(openai::Client::from_env())
            }
            EmbeddingProvider::Hashing => {
                return Err(DomainError::config(
                    "the hashing embedder is local, not a hosted provider",
                ))
            }
        };

        Ok(Self {
            client,
            model: config.model.clone(),
            dimension: config.dimension,
        })
    }
}

#[async_trait]
impl EmbeddingService for RigEmbedding {
    async fn embed(&self, text: &str) -> Result<Embedding, DomainError> {
        self.embed_batch(&[text])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| DomainError::internal("No embedding returned"))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>, DomainError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let embeddings = match &self.client {
            Client::Gemini(client) => embed_all!(client, &self.model, texts),
            Client::OpenAi(client) => embed_all!(client, &self.model, texts),
        };

        if embeddings.len() != texts.len() {
            return Err(DomainError::external(format!(
                "expected {} embeddings, provider returned {}",
                texts.len(),
                embeddings.len()
            )));
        }
        Ok(embeddings)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
