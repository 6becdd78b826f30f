use std::collections::HashSet;
use std::path::Path;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::domain::{ports::VectorStore, Document, DomainError, Embedding, SearchResult};

/// Vectors, one row per document in `INDEX_META_FILE` order.
pub const INDEX_DATA_FILE: &str = "index.data.json";
/// Manifest plus documents.
pub const INDEX_META_FILE: &str = "index.meta.json";

const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexManifest {
    pub version: u32,
    pub embedding_model: String,
    pub dimension: usize,
    pub documents: usize,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize)]
struct IndexData {
    vectors: Vec<Embedding>,
}

#[derive(Serialize, Deserialize)]
struct IndexMeta {
    manifest: IndexManifest,
    documents: Vec<Document>,
}

/// Exact cosine search over every stored vector, persisted as two JSON
/// artifacts in one directory.
pub struct FlatIndex {
    embedding_model: String,
    entries: RwLock<Vec<(Document, Embedding)>>,
}

impl FlatIndex {
    pub fn new(embedding_model: impl Into<String>) -> Self {
        Self {
            embedding_model: embedding_model.into(),
            entries: RwLock::new(Vec::new()),
        }
    }

    pub fn embedding_model(&self) -> &str {
        &self.embedding_model
    }

    /// True when both artifacts are present in `dir`.
    pub fn exists_in(dir: &Path) -> bool {
        dir.join(INDEX_DATA_FILE).is_file() && dir.join(INDEX_META_FILE).is_file()
    }

    pub fn manifest(&self) -> Result<IndexManifest, DomainError> {
        let entries = self
            .entries
            .read()
            .map_err(|e| DomainError::internal(e.to_string()))?;
        Ok(IndexManifest {
            version: FORMAT_VERSION,
            embedding_model: self.embedding_model.clone(),
            dimension: entries.first().map(|(_, e)| e.dimension()).unwrap_or(0),
            documents: entries.len(),
            created_at: Utc::now(),
        })
    }

    #[instrument(skip(self), fields(dir = %dir.display()))]
    pub async fn save(&self, dir: &Path) -> Result<(), DomainError> {
        let manifest = self.manifest()?;
        let (documents, vectors): (Vec<Document>, Vec<Embedding>) = {
            let entries = self
                .entries
                .read()
                .map_err(|e| DomainError::internal(e.to_string()))?;
            entries.iter().cloned().unzip()
        };

        let data = serde_json::to_vec(&IndexData { vectors })
            .map_err(|e| DomainError::internal(e.to_string()))?;
        let meta = serde_json::to_vec_pretty(&IndexMeta {
            manifest: manifest.clone(),
            documents,
        })
        .map_err(|e| DomainError::internal(e.to_string()))?;

        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| DomainError::io(dir, e))?;
        write(&dir.join(INDEX_DATA_FILE), &data).await?;
        write(&dir.join(INDEX_META_FILE), &meta).await?;

        info!(documents = manifest.documents, "vector database saved");
        Ok(())
    }

    #[instrument(fields(dir = %dir.display()))]
    pub async fn load(dir: &Path) -> Result<Self, DomainError> {
        if !dir.is_dir() {
            return Err(DomainError::index_missing(dir.display().to_string()));
        }

        let missing: Vec<&str> = [INDEX_DATA_FILE, INDEX_META_FILE]
            .into_iter()
            .filter(|f| !dir.join(f).is_file())
            .collect();
        if !missing.is_empty() {
            return Err(DomainError::index_missing(format!(
                "{} is missing {}",
                dir.display(),
                missing.join(", ")
            )));
        }

        let data: IndexData = read_json(&dir.join(INDEX_DATA_FILE)).await?;
        let meta: IndexMeta = read_json(&dir.join(INDEX_META_FILE)).await?;

        if data.vectors.len() != meta.documents.len() {
            return Err(DomainError::index(format!(
                "{} vectors for {} documents",
                data.vectors.len(),
                meta.documents.len()
            )));
        }
        if let Some(bad) = data
            .vectors
            .iter()
            .find(|v| v.dimension() != meta.manifest.dimension)
        {
            return Err(DomainError::index(format!(
                "vector of dimension {} in an index of dimension {}",
                bad.dimension(),
                meta.manifest.dimension
            )));
        }

        info!(
            documents = meta.documents.len(),
            model = %meta.manifest.embedding_model,
            "vector database loaded"
        );

        Ok(Self {
            embedding_model: meta.manifest.embedding_model,
            entries: RwLock::new(meta.documents.into_iter().zip(data.vectors).collect()),
        })
    }
}

async fn write(path: &Path, bytes: &[u8]) -> Result<(), DomainError> {
    tokio::fs::write(path, bytes)
        .await
        .map_err(|e| DomainError::io(path, e))
}

async fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T, DomainError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| DomainError::io(path, e))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| DomainError::index(format!("{}: {e}", path.display())))
}

#[async_trait]
impl VectorStore for FlatIndex {
    async fn upsert(&self, entries: &[(Document, Embedding)]) -> Result<(), DomainError> {
        let mut store = self
            .entries
            .write()
            .map_err(|e| DomainError::internal(e.to_string()))?;

        if let (Some((_, existing)), Some((_, incoming))) = (store.first(), entries.first()) {
            if existing.dimension() != incoming.dimension() {
                return Err(DomainError::validation(format!(
                    "embedding dimension {} does not match index dimension {}",
                    incoming.dimension(),
                    existing.dimension()
                )));
            }
        }

        let incoming: HashSet<Uuid> = entries.iter().map(|(doc, _)| doc.id).collect();
        store.retain(|(d, _)| !incoming.contains(&d.id));
        store.extend(entries.iter().cloned());
        Ok(())
    }

    async fn search(
        &self,
        query: &Embedding,
        top_k: usize,
    ) -> Result<Vec<SearchResult>, DomainError> {
        let store = self
            .entries
            .read()
            .map_err(|e| DomainError::internal(e.to_string()))?;

        let mut scored: Vec<(usize, f32)> = store
            .iter()
            .enumerate()
            .map(|(i, (_, embedding))| (i, query.cosine_similarity(embedding)))
            .collect();

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        Ok(scored
            .into_iter()
            .take(top_k)
            .map(|(i, score)| SearchResult {
                document: store[i].0.clone(),
                score,
            })
            .collect())
    }

    async fn count(&self) -> Result<usize, DomainError> {
        self.entries
            .read()
            .map(|entries| entries.len())
            .map_err(|e| DomainError::internal(e.to_string()))
    }
}
