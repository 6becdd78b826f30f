//! Wires configured adapters into application services.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, instrument, warn};

use crate::application::{
    fallback_documents, ChatResponder, IndexStats, IndexingService, PromptTemplate, RagService,
    ResponderFactory,
};
use crate::domain::{
    ports::{EmbeddingService, VectorStore},
    Document, DomainError, Result, TextSplitter,
};
use crate::infrastructure::config::{
    AppConfig, IndexBackend, IndexingConfig, MonitoringConfig, RagPrompts,
};
use crate::infrastructure::{
    embedding, FlatIndex, IndexLocator, InteractionLog, QdrantVectorStore, RigLlm,
};

/// Builds the responder from configuration when the server first needs it.
pub struct ConfiguredResponderFactory {
    config: Arc<AppConfig>,
}

impl ConfiguredResponderFactory {
    pub fn new(config: Arc<AppConfig>) -> Self {
        Self { config }
    }
}

#[async_trait]
impl ResponderFactory for ConfiguredResponderFactory {
    async fn build(&self) -> Result<ChatResponder> {
        build_responder(&self.config).await
    }
}

#[instrument(skip(config))]
pub async fn build_responder(config: &AppConfig) -> Result<ChatResponder> {
    let c = &config.config;
    let embedding = embedding::from_config(&c.embedding)?;
    let store = open_vector_store(config, &embedding).await?;
    let rag = Arc::new(RagService::new(embedding, store, c.rag.top_k));
    let llm = Arc::new(RigLlm::from_config(&c.llm)?);

    let documents = rag.document_count().await?;
    info!(
        model = %c.llm.model,
        top_k = rag.top_k(),
        documents = documents,
        "chat responder ready"
    );
    Ok(
        ChatResponder::new(rag, llm, prompt_template(&config.prompts.rag))
            .with_history_limits(c.history.max_turns, c.history.prompt_turns),
    )
}

pub fn prompt_template(prompts: &RagPrompts) -> PromptTemplate {
    PromptTemplate::new(
        prompts.system.clone(),
        prompts.template.clone(),
        prompts.history_header.clone(),
    )
}

pub async fn open_vector_store(
    config: &AppConfig,
    embedding: &Arc<dyn EmbeddingService>,
) -> Result<Arc<dyn VectorStore>> {
    let index = &config.config.index;
    match index.backend {
        IndexBackend::Local => {
            let dir = resolve_local_index(config, embedding).await?;
            let flat = FlatIndex::load(&dir).await?;
            let dimension = flat.manifest()?.dimension;
            if dimension != 0 && dimension != embedding.dimension() {
                return Err(DomainError::index(format!(
                    "{} holds vectors of dimension {dimension}, but {} produces {}",
                    dir.display(),
                    embedding.model_name(),
                    embedding.dimension()
                )));
            }
            if flat.embedding_model() != embedding.model_name() {
                warn!(
                    index_model = flat.embedding_model(),
                    query_model = embedding.model_name(),
                    "index was built with a different embedding model"
                );
            }
            Ok(Arc::new(flat))
        }
        IndexBackend::Qdrant => Ok(Arc::new(
            QdrantVectorStore::new(
                &index.qdrant_url,
                &index.collection,
                embedding.dimension(),
            )
            .await?,
        )),
    }
}

/// First existing candidate, or a freshly seeded fallback index when allowed.
pub async fn resolve_local_index(
    config: &AppConfig,
    embedding: &Arc<dyn EmbeddingService>,
) -> Result<PathBuf> {
    let index = &config.config.index;
    let locator = IndexLocator::from_config(index);

    match locator.resolve() {
        Ok(dir) => Ok(dir),
        Err(e) if index.seed_fallback => {
            let Some(dir) = locator.primary() else {
                return Err(e);
            };
            warn!(dir = %dir.display(), "no index found, seeding fallback knowledge base");
            seed_fallback(dir, embedding.clone(), &config.config.indexing).await?;
            Ok(dir.to_path_buf())
        }
        Err(e) => Err(e),
    }
}

pub async fn seed_fallback(
    dir: &Path,
    embedding: Arc<dyn EmbeddingService>,
    settings: &IndexingConfig,
) -> Result<IndexStats> {
    write_local_index(fallback_documents(), dir, embedding, settings).await
}

/// Chunks, embeds and saves `documents` as a new flat index in `dir`.
#[instrument(skip(documents, embedding, settings), fields(dir = %dir.display()))]
pub async fn write_local_index(
    documents: Vec<Document>,
    dir: &Path,
    embedding: Arc<dyn EmbeddingService>,
    settings: &IndexingConfig,
) -> Result<IndexStats> {
    let index = Arc::new(FlatIndex::new(embedding.model_name()));
    let stats = indexing_service(embedding, index.clone(), settings)
        .index_documents(documents)
        .await?;
    index.save(dir).await?;
    Ok(stats)
}

pub fn indexing_service(
    embedding: Arc<dyn EmbeddingService>,
    store: Arc<dyn VectorStore>,
    settings: &IndexingConfig,
) -> IndexingService {
    IndexingService::new(embedding, store)
        .with_splitter(TextSplitter::new(settings.chunk_size, settings.chunk_overlap))
        .with_batching(settings.batch_size, settings.concurrency)
}

pub fn interaction_log(config: &MonitoringConfig) -> Option<Arc<InteractionLog>> {
    config.enabled.then(|| {
        let log = InteractionLog::new(config.log_path.clone());
        Arc::new(match &config.reports_dir {
            Some(dir) => log.with_reports_dir(dir.clone()),
            None => log,
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::config::EmbeddingProvider;
    use crate::infrastructure::HashingEmbedding;

    fn hashing_config(root: &Path) -> AppConfig {
        let mut config = AppConfig::default();
        config.config.embedding.provider = EmbeddingProvider::Hashing;
        config.config.embedding.dimension = 64;
        config.config.index.roots = vec![root.join("local"), root.join("app")];
        config
    }

    #[tokio::test]
    async fn test_missing_index_without_seeding_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let config = hashing_config(tmp.path());
        let embedding: Arc<dyn EmbeddingService> = Arc::new(HashingEmbedding::new(64));

        let err = open_vector_store(&config, &embedding).await.err().unwrap();
        assert!(matches!(err, DomainError::IndexMissing(_)));
    }

    #[tokio::test]
    async fn test_seed_fallback_writes_primary_candidate() {
        let tmp = tempfile::tempdir().unwrap();
        let mut config = hashing_config(tmp.path());
        config.config.index.seed_fallback = true;
        let embedding: Arc<dyn EmbeddingService> = Arc::new(HashingEmbedding::new(64));

        let dir = resolve_local_index(&config, &embedding).await.unwrap();
        assert_eq!(dir, tmp.path().join("local/rag-index-small"));
        assert!(FlatIndex::exists_in(&dir));

        let store = open_vector_store(&config, &embedding).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 10);
    }

    #[tokio::test]
    async fn test_existing_second_candidate_loaded() {
        let tmp = tempfile::tempdir().unwrap();
        let config = hashing_config(tmp.path());
        let embedding: Arc<dyn EmbeddingService> = Arc::new(HashingEmbedding::new(64));
        let second = tmp.path().join("app/rag-index-small");

        write_local_index(
            vec![Document::new("only document")],
            &second,
            embedding.clone(),
            &config.config.indexing,
        )
        .await
        .unwrap();

        assert_eq!(resolve_local_index(&config, &embedding).await.unwrap(), second);
        let store = open_vector_store(&config, &embedding).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_index_dimension_must_match_embedder() {
        let tmp = tempfile::tempdir().unwrap();
        let mut config = hashing_config(tmp.path());
        config.config.index.seed_fallback = true;
        let seeded_with: Arc<dyn EmbeddingService> = Arc::new(HashingEmbedding::new(64));
        resolve_local_index(&config, &seeded_with).await.unwrap();

        let wider: Arc<dyn EmbeddingService> = Arc::new(HashingEmbedding::new(128));
        let err = open_vector_store(&config, &wider).await.err().unwrap();
        match err {
            DomainError::Index(msg) => assert!(msg.contains("dimension 64")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_interaction_log_follows_enabled_flag() {
        let mut config = MonitoringConfig::default();
        assert!(interaction_log(&config).is_some());
        config.enabled = false;
        assert!(interaction_log(&config).is_none());
    }
}
