use async_trait::async_trait;
use qdrant_client::qdrant::{
    CountPointsBuilder, CreateCollectionBuilder, Distance, PointStruct, SearchPointsBuilder,
    UpsertPointsBuilder, VectorParamsBuilder,
};
use qdrant_client::{Payload, Qdrant};
use uuid::Uuid;

use crate::domain::{
    ports::VectorStore, Document, DomainError, Embedding, Metadata, SearchResult,
};

const UPSERT_BATCH: usize = 256;

/// Collection-backed store for deployments that serve the full index from
/// a Qdrant instance instead of a local directory.
pub struct QdrantVectorStore {
    client: Qdrant,
    collection: String,
    dimension: usize,
}

impl QdrantVectorStore {
    pub async fn new(url: &str, collection: &str, dimension: usize) -> Result<Self, DomainError> {
        let client = Qdrant::from_url(url)
            .build()
            .map_err(|e| DomainError::external(e.to_string()))?;

        let store = Self {
            client,
            collection: collection.to_string(),
            dimension,
        };

        store.ensure_collection().await?;

        Ok(store)
    }

    async fn ensure_collection(&self) -> Result<(), DomainError> {
        let exists = self
            .client
            .collection_exists(&self.collection)
            .await
            .map_err(|e| DomainError::external(e.to_string()))?;

        if !exists {
            self.client
                .create_collection(
                    CreateCollectionBuilder::new(&self.collection).vectors_config(
                        VectorParamsBuilder::new(self.dimension as u64, Distance::Cosine),
                    ),
                )
                .await
                .map_err(|e| DomainError::external(e.to_string()))?;
            tracing::info!(collection = %self.collection, "collection created");
        }

        Ok(())
    }

    fn uuid_to_point_id(id: Uuid) -> u64 {
        let bytes = id.as_bytes();
        u64::from_le_bytes([
            bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
        ])
    }

    fn to_point(doc: &Document, embedding: &Embedding) -> Result<PointStruct, DomainError> {
        let metadata = serde_json::to_string(&doc.metadata)
            .map_err(|e| DomainError::internal(e.to_string()))?;
        let payload: Payload = serde_json::json!({
            "document_id": doc.id.to_string(),
            "content": doc.content,
            "metadata": metadata,
        })
        .try_into()
        .map_err(|_| DomainError::internal("Failed to create payload"))?;

        Ok(PointStruct::new(
            Self::uuid_to_point_id(doc.id),
            embedding.as_slice().to_vec(),
            payload,
        ))
    }
}

#[async_trait]
impl VectorStore for QdrantVectorStore {
    async fn upsert(&self, entries: &[(Document, Embedding)]) -> Result<(), DomainError> {
        for batch in entries.chunks(UPSERT_BATCH) {
            let points = batch
                .iter()
                .map(|(doc, embedding)| Self::to_point(doc, embedding))
                .collect::<Result<Vec<_>, _>>()?;

            self.client
                .upsert_points(UpsertPointsBuilder::new(&self.collection, points).wait(true))
                .await
                .map_err(|e| DomainError::external(e.to_string()))?;
        }

        Ok(())
    }

    async fn search(
        &self,
        query: &Embedding,
        top_k: usize,
    ) -> Result<Vec<SearchResult>, DomainError> {
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let results = self
            .client
            .search_points(
                SearchPointsBuilder::new(&self.collection, query.as_slice().to_vec(), top_k as u64)
                    .with_payload(true),
            )
            .await
            .map_err(|e| DomainError::external(e.to_string()))?;

        let search_results: Vec<SearchResult> = results
            .result
            .into_iter()
            .filter_map(|point| {
                let payload = point.payload;

                let id: Uuid = payload.get("document_id")?.as_str()?.parse().ok()?;
                let content = payload.get("content")?.as_str()?.to_string();
                let metadata: Metadata = payload
                    .get("metadata")
                    .and_then(|m| m.as_str())
                    .and_then(|m| serde_json::from_str(m).ok())
                    .unwrap_or_default();

                Some(SearchResult {
                    document: Document {
                        id,
                        content,
                        metadata,
                    },
                    score: point.score,
                })
            })
            .take(top_k)
            .collect();

        Ok(search_results)
    }

    async fn count(&self) -> Result<usize, DomainError> {
        let response = self
            .client
            .count(CountPointsBuilder::new(&self.collection).exact(true))
            .await
            .map_err(|e| DomainError::external(e.to_string()))?;

        Ok(response.result.map(|r| r.count as usize).unwrap_or(0))
    }
}
